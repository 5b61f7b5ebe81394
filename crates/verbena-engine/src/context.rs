//! Per-run execution state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution state of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionState {
  Pending,
  Running,
  Completed,
  Failed,
  /// Reserved for conditional routing; never assigned by the engine today.
  Skipped,
}

/// Severity of an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Info,
  Warning,
  Error,
}

/// One record in a run's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: LogLevel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
  pub message: String,
  /// Free-form payload, e.g. the string form of a function result.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<String>,
}

/// The state of one workflow run.
///
/// Created when the run starts and mutated by the engine until `is_running`
/// turns false. While in flight it is queryable through the engine by
/// `run_id`; the finished value returned from `execute` is the caller's copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
  pub run_id: Uuid,
  pub workflow_id: String,
  /// Workflow variables, keyed by name.
  pub variables: HashMap<String, serde_json::Value>,
  /// Per-node execution state, pre-populated to `Pending` for every node.
  pub node_states: HashMap<String, NodeExecutionState>,
  pub logs: Vec<ExecutionLogEntry>,
  pub is_running: bool,
  pub is_cancelled: bool,
  pub started_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  /// Top-level failure message. Stays empty for cancelled runs.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
}

impl ExecutionContext {
  pub(crate) fn new(workflow_id: String, variables: HashMap<String, serde_json::Value>) -> Self {
    Self {
      run_id: Uuid::new_v4(),
      workflow_id,
      variables,
      node_states: HashMap::new(),
      logs: Vec::new(),
      is_running: true,
      is_cancelled: false,
      started_at: Utc::now(),
      completed_at: None,
      error_message: None,
    }
  }

  /// Append a log entry stamped with the current time.
  pub(crate) fn log(
    &mut self,
    level: LogLevel,
    node_id: Option<&str>,
    message: impl Into<String>,
    data: Option<String>,
  ) {
    self.logs.push(ExecutionLogEntry {
      timestamp: Utc::now(),
      level,
      node_id: node_id.map(str::to_string),
      message: message.into(),
      data,
    });
  }

  /// State of a node, `Pending` when unknown.
  pub fn node_state(&self, node_id: &str) -> NodeExecutionState {
    self
      .node_states
      .get(node_id)
      .copied()
      .unwrap_or(NodeExecutionState::Pending)
  }
}
