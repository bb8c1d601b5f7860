use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    middleware::from_fn_with_state,
    routing::{IntoMakeService, get},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::config::Config;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{DeploymentImpl, middleware::require_bearer};

pub mod approvals;
pub mod artifacts;
pub mod events;
pub mod health;
pub mod missions;
pub mod projects;
pub mod seed;
pub mod tasks;


/// Body of actions whose only input is who performed them.
#[derive(Debug, Default, Deserialize)]
pub struct ActorBody {
    pub actor: Option<String>,
}

/// The full application: `/health` is public, everything under `/api` needs
/// the bearer token.
pub fn app(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(events::router())
        .merge(projects::router())
        .merge(missions::router())
        .merge(tasks::router())
        .merge(approvals::router())
        .merge(artifacts::router())
        .merge(seed::router())
        .layer(from_fn_with_state(deployment.clone(), require_bearer));

    let cors = cors_layer(deployment.config());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .with_state(deployment)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors)
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(deployment).into_make_service()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }
    match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(
                origin = %config.allowed_origin,
                "MC_ALLOWED_ORIGIN is not a valid header value; cross-origin requests will be refused"
            );
            cors
        }
    }
}
