use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::project::{CreateProject, Project};
use deployment::Deployment;
use utils::response::Ack;

use super::ActorBody;
use crate::{
    DeploymentImpl,
    error::{ApiError, AppJson, OptionalJson},
};

pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<Vec<Project>>, ApiError> {
    let projects = deployment.workflow().list_projects().await?;
    Ok(ResponseJson(projects))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateProject>,
) -> Result<(StatusCode, ResponseJson<Project>), ApiError> {
    let project = deployment.workflow().create_project(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(project)))
}

/// Missions and tasks are removed with the project. Approvals, artifacts and
/// events keep their rows.
pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<ActorBody>,
) -> Result<ResponseJson<Ack>, ApiError> {
    deployment.workflow().delete_project(&id, body.actor).await?;
    Ok(ResponseJson(Ack::ok()))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .route("/projects/{id}", delete(delete_project))
}
