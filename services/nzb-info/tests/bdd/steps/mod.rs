//! BDD step definitions for the nzb-info service

pub mod backend_steps;
pub mod lifecycle_steps;
pub mod polling_steps;
pub mod remote_steps;
pub mod selection_steps;
