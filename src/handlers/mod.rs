//! Command handlers.
//!
//! This module contains the runner/checker traits, the registry binding them
//! to declared commands, the built-in value checker and the built-in
//! commands.

pub mod builtin;
mod checker;
pub mod core;

pub use self::checker::{ValueChecker, matches_type};
pub use self::core::{
    Binding, Checker, FnChecker, FnRunner, Registry, RegistryBuilder, RunContext, RunOutput,
    Runner,
};
