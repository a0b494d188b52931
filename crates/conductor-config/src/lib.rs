//! Conductor Config
//!
//! Serializable flow and global configuration types for Conductor. These
//! types represent configuration as authored by an operator, before
//! `conductor-workflow` validates and locks a [`FlowDef`] into a `Flow`.
//!
//! Configuration can be loaded from JSON (mandatory), YAML, or TOML files;
//! [`load`] dispatches on file extension and all three dialects produce the
//! same logical structure.

mod error;
mod flow;
mod global;
mod loader;
mod node;

pub use error::ConfigError;
pub use flow::FlowDef;
pub use global::{GlobalConfig, RemoteLoggingConfig};
pub use loader::load;
pub use node::{DEFAULT_TRANSITION, ExecutorKind, NodeDef};
