//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, HttpConfig, ConsoleConfig)
//! - [`listen`]: Network listener configuration (ListenConfig, TlsConfig)
//! - [`pipeline`]: Framing, parser and router tuning (FramingSection, ParserSection, RouterConfig)
//! - [`license`]: License source configuration (LicenseConfig)
//! - [`validation`]: Startup validation collecting every problem at once

mod defaults;
mod license;
mod listen;
mod pipeline;
mod types;
pub mod validation;

pub use license::{LicenseConfig, LicenseSource};
pub use listen::{ListenConfig, TlsConfig};
pub use pipeline::{FramingSection, ParserSection, RouterConfig};
pub use types::{Config, ConfigError, ConsoleConfig, HttpConfig, LogFormat, ServerConfig};
pub use validation::{ValidationError, validate};
