//! Workflow execution engine for Verbena.
//!
//! The [`WorkflowEngine`] drives a single run over a workflow graph: it finds
//! the entry nodes, walks the DAG depth-first, dispatches each node by type,
//! binds variables in and out of function nodes through the loader, and
//! records every step in the run's [`ExecutionContext`]. Runs are tracked in
//! an engine-owned registry while in flight, queryable and cancellable by
//! run id.

mod context;
mod engine;
mod error;

pub use context::{ExecutionContext, ExecutionLogEntry, LogLevel, NodeExecutionState};
pub use engine::{EngineConfig, WorkflowEngine};
pub use error::EngineError;
