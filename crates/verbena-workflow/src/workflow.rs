use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::node::{WorkflowEdge, WorkflowNode};

/// A workflow graph of nodes and edges.
///
/// `nodes` is ordered: entry nodes start executing in declaration order, and
/// edges fan out in their declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub nodes: Vec<WorkflowNode>,
  #[serde(default)]
  pub edges: Vec<WorkflowEdge>,
  /// Execution timeout. Carried for schedulers; not enforced by the engine.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Retry budget for failed nodes. Carried; not enforced by the engine.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retry_attempts: Option<u32>,
}

impl Workflow {
  /// Build the derived traversal structure.
  pub fn graph(&self) -> Graph {
    Graph::new(self)
  }

  /// Look up a node by id.
  pub fn get_node(&self, node_id: &str) -> Option<&WorkflowNode> {
    self.nodes.iter().find(|n| n.id == node_id)
  }
}
