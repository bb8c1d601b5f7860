pub mod approval;
pub mod artifact;
pub mod event_log;
pub mod mission;
pub mod patch;
pub mod project;
pub mod status;
pub mod task;
