//! Conductor Engine
//!
//! The flow scheduling dispatcher: maintains the frontier of pending node
//! invocations, launches them through [`conductor_executor::Executors`]
//! honouring a global concurrency cap and per-node timeout, applies
//! transition rules to compute each invocation's successors, and gathers
//! terminal outputs, a full [`conductor_trace::TraceEntry`] log, and a
//! shared-state snapshot into one [`RunResult`].

mod engine;
mod error;

pub use engine::{EngineConfig, FlowEngine, RunResult};
pub use error::EngineError;
