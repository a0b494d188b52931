//! Conductor Remote Log
//!
//! Fire-and-forget shipping of structured log entries to an external
//! collector. Interface-only: no batching, retry, or buffering, matching
//! the teacher's treatment of ancillary collaborators as thin,
//! directly-await HTTP clients.

mod client;
mod error;

pub use client::RemoteLogger;
pub use error::RemoteLogError;
