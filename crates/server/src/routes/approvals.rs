use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::approval::{Approval, CreateApproval, ResolveApproval};
use deployment::Deployment;
use services::services::workflow::OkExecuteOutcome;

use super::ActorBody;
use crate::{
    DeploymentImpl,
    error::{ApiError, AppJson, OptionalJson},
};

pub async fn get_mission_approvals(
    State(deployment): State<DeploymentImpl>,
    Path(mission_id): Path<String>,
) -> Result<ResponseJson<Vec<Approval>>, ApiError> {
    let approvals = deployment.workflow().list_approvals(&mission_id).await?;
    Ok(ResponseJson(approvals))
}

pub async fn request_approval(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateApproval>,
) -> Result<(StatusCode, ResponseJson<Approval>), ApiError> {
    let approval = deployment.workflow().request_approval(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(approval)))
}

pub async fn approve_approval(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<ResolveApproval>,
) -> Result<ResponseJson<Approval>, ApiError> {
    let approval = deployment.workflow().approve_approval(&id, payload).await?;
    Ok(ResponseJson(approval))
}

pub async fn reject_approval(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<ResolveApproval>,
) -> Result<ResponseJson<Approval>, ApiError> {
    let approval = deployment.workflow().reject_approval(&id, payload).await?;
    Ok(ResponseJson(approval))
}

/// OK EXECUTAR. Answers 200 with `result: "noop"` when nothing is pending.
pub async fn ok_execute(
    State(deployment): State<DeploymentImpl>,
    Path(mission_id): Path<String>,
    OptionalJson(body): OptionalJson<ActorBody>,
) -> Result<ResponseJson<OkExecuteOutcome>, ApiError> {
    let outcome = deployment
        .workflow()
        .ok_execute(&mission_id, body.actor)
        .await?;
    Ok(ResponseJson(outcome))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/missions/{id}/approvals", get(get_mission_approvals))
        .route("/missions/{id}/ok-execute", post(ok_execute))
        .route("/approvals", post(request_approval))
        .route("/approvals/{id}/approve", post(approve_approval))
        .route("/approvals/{id}/reject", post(reject_approval))
}
