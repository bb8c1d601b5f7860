use axum::{
    extract::{Request, State},
    http::{Method, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use deployment::Deployment;
use sha2::{Digest, Sha256};

use crate::{DeploymentImpl, error::ApiError};

/// Reject any request whose `Authorization` header is not exactly
/// `Bearer <MC_AUTH_TOKEN>`. CORS preflights pass through untouched.
pub async fn require_bearer(
    State(deployment): State<DeploymentImpl>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if !credential_matches(presented, &deployment.config().auth_token) {
        tracing::debug!(path = %req.uri().path(), "Rejected request without valid bearer token");
        return Err(ApiError::Unauthorized(
            "missing or invalid bearer token".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Compare fixed-size digests so the check does not short-circuit on the
/// first differing byte of the token itself.
fn credential_matches(presented: &[u8], token: &str) -> bool {
    let expected = Sha256::digest(format!("Bearer {token}").as_bytes());
    let actual = Sha256::digest(presented);
    expected == actual
}
