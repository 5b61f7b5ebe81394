use thiserror::Error;
use verbena_runtime::RuntimeError;
use verbena_workflow::NodeType;

/// Errors that abort a workflow run.
///
/// Any node-level failure aborts the remainder of the run; there is no
/// catch-and-continue. Cancellation is its own variant so the engine can
/// record it as a distinct outcome rather than a failure.
#[derive(Debug, Error)]
pub enum EngineError {
  /// Every node has an incoming edge; there is nowhere to start.
  #[error("workflow has no entry nodes")]
  NoEntryNodes,

  /// A function node cannot execute without a function reference.
  #[error("function node '{node_id}' has no function id")]
  MissingFunctionId { node_id: String },

  /// Loading or invoking the bound function failed.
  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  /// The node type has no execution behavior yet.
  #[error("node type {node_type:?} not implemented")]
  NotImplemented { node_type: NodeType },

  /// The run was cancelled cooperatively.
  #[error("execution cancelled")]
  Cancelled,
}
