use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `not_found`.
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// `{ "ok": true }`, returned by liveness and delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
