//! Core handler infrastructure.
//!
//! This module contains the fundamental types of the command handler
//! system: the runner and checker traits, the context they receive, and the
//! registry binding them to declared commands.

pub mod context;
pub mod registry;
pub mod traits;

// Re-export commonly used types
pub use context::RunContext;
pub use registry::{Binding, Registry, RegistryBuilder};
pub use traits::{Checker, FnChecker, FnRunner, RunOutput, Runner};
