use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::artifact::{Artifact, CreateArtifact};
use deployment::Deployment;

use crate::{
    DeploymentImpl,
    error::{ApiError, AppJson},
};

pub async fn get_mission_artifacts(
    State(deployment): State<DeploymentImpl>,
    Path(mission_id): Path<String>,
) -> Result<ResponseJson<Vec<Artifact>>, ApiError> {
    let artifacts = deployment.workflow().list_artifacts(&mission_id).await?;
    Ok(ResponseJson(artifacts))
}

pub async fn create_artifact(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateArtifact>,
) -> Result<(StatusCode, ResponseJson<Artifact>), ApiError> {
    let artifact = deployment.workflow().create_artifact(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(artifact)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/missions/{id}/artifacts", get(get_mission_artifacts))
        .route("/artifacts", post(create_artifact))
}
