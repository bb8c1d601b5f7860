pub mod actors;
pub mod config;
pub mod events;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod workflow_tests;
