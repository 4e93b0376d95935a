pub mod backlog;
pub mod config;
pub mod feedback;
pub mod sprint;
pub mod stakeholder;
pub mod story;
