use uuid::Uuid;

pub const PROJECT: &str = "proj";
pub const MISSION: &str = "msn";
pub const TASK: &str = "tsk";
pub const APPROVAL: &str = "apv";
pub const ARTIFACT: &str = "art";
pub const EVENT: &str = "evt";

/// Opaque text id of the form `<prefix>_<32 hex chars>`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
