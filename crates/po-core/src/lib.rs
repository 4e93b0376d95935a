pub mod analysis;
pub mod config;
pub mod entity;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod repository;
pub mod training;
pub mod types;

pub use error::{ErrorKind, PoError, Result};
pub use orchestrator::ProductOwner;
