use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::models::task::{CreateTask, Task, UpdateTask};
use deployment::Deployment;

use crate::{
    DeploymentImpl,
    error::{ApiError, AppJson},
};

pub async fn get_mission_tasks(
    State(deployment): State<DeploymentImpl>,
    Path(mission_id): Path<String>,
) -> Result<ResponseJson<Vec<Task>>, ApiError> {
    let tasks = deployment.workflow().list_tasks(&mission_id).await?;
    Ok(ResponseJson(tasks))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Path(mission_id): Path<String>,
    AppJson(payload): AppJson<CreateTask>,
) -> Result<(StatusCode, ResponseJson<Task>), ApiError> {
    let task = deployment.workflow().create_task(&mission_id, payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(task)))
}

pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateTask>,
) -> Result<ResponseJson<Task>, ApiError> {
    let task = deployment.workflow().update_task(&id, payload).await?;
    Ok(ResponseJson(task))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/missions/{id}/tasks",
            get(get_mission_tasks).post(create_task),
        )
        .route("/tasks/{id}", patch(update_task))
}
