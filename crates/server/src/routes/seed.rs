use axum::{
    Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::post,
};
use deployment::Deployment;
use services::services::workflow::SeedSummary;

use super::ActorBody;
use crate::{
    DeploymentImpl,
    error::{ApiError, OptionalJson},
};

pub async fn seed_demo(
    State(deployment): State<DeploymentImpl>,
    OptionalJson(body): OptionalJson<ActorBody>,
) -> Result<(StatusCode, ResponseJson<SeedSummary>), ApiError> {
    let summary = deployment.workflow().seed_demo(body.actor).await?;
    Ok((StatusCode::CREATED, ResponseJson(summary)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/seed/demo", post(seed_demo))
}
