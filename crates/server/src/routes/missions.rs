use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::mission::{CreateMission, Mission, UpdateMission};
use deployment::Deployment;
use serde::Deserialize;

use crate::{
    DeploymentImpl,
    error::{ApiError, AppJson, AppQuery},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionQuery {
    pub project_id: Option<String>,
}

pub async fn get_missions(
    State(deployment): State<DeploymentImpl>,
    AppQuery(query): AppQuery<MissionQuery>,
) -> Result<ResponseJson<Vec<Mission>>, ApiError> {
    let missions = deployment.workflow().list_missions(query.project_id).await?;
    Ok(ResponseJson(missions))
}

pub async fn get_mission(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
) -> Result<ResponseJson<Mission>, ApiError> {
    let mission = deployment.workflow().get_mission(&id).await?;
    Ok(ResponseJson(mission))
}

pub async fn create_mission(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateMission>,
) -> Result<(StatusCode, ResponseJson<Mission>), ApiError> {
    let mission = deployment.workflow().create_mission(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(mission)))
}

pub async fn update_mission(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateMission>,
) -> Result<ResponseJson<Mission>, ApiError> {
    let mission = deployment.workflow().update_mission(&id, payload).await?;
    Ok(ResponseJson(mission))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/missions", get(get_missions).post(create_mission))
        .route("/missions/{id}", get(get_mission).patch(update_mission))
}
