//! Who an action is attributed to when the caller does not say.

/// The human operator who signs off on work.
pub const HUMAN: &str = "FILIPE";

/// The agent that proposes, updates and requests approvals.
pub const SYSTEM_AGENT: &str = "ALFRED";

/// Caller-supplied actor, or `default` when absent or blank.
pub fn actor_or(actor: Option<String>, default: &str) -> String {
    match actor {
        Some(actor) if !actor.trim().is_empty() => actor,
        _ => default.to_string(),
    }
}
