//! Command declarations.
//!
//! Commands are declared once at startup with an explicit builder
//! ([`CommandDescriptor::root`] and friends) and frozen into a
//! [`CommandStore`]. Nothing in this module changes after the store is built.

mod descriptor;
mod store;

pub use descriptor::{
    ArgumentDescriptor, ArgumentFlag, CommandDescriptor, CommandFlag, CommandType, DataType,
    OptionDescriptor, OptionFlag,
};
pub use store::CommandStore;
