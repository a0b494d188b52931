//! Conductor Workflow
//!
//! This crate provides [`Flow`], the locked/validated form of a
//! `conductor_config::FlowDef` that the engine executes against.

mod error;
mod flow;

pub use error::FlowError;
pub use flow::Flow;
