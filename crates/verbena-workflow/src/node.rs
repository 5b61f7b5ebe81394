use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
  /// Pass-through node accepting external input.
  Input,
  /// Pass-through node marking workflow output.
  Output,
  /// Executes a compiled function.
  Function,
  /// Invokes an agent. Reserved; currently a logging placeholder.
  Agent,
  /// Conditional branching. Reserved; currently a logging placeholder.
  Decision,
  /// Parallel fan-out of child branches. Not yet implemented.
  Parallel,
  /// Invokes a nested workflow. Not yet implemented.
  SubWorkflow,
  /// Multi-way branching. Not yet implemented.
  Switch,
}

/// A node in a workflow graph.
///
/// Canvas geometry, prompts and other editor-only fields live outside this
/// model; the engine only sees what execution needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
  pub id: String,
  pub name: String,
  pub node_type: NodeType,
  /// Function reference, required for `Function` nodes.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub function_id: Option<Uuid>,
  /// Parameter-name to variable-name pairs. Declaration order establishes
  /// the positional argument order of the invocation.
  #[serde(default)]
  pub parameter_mapping: Vec<(String, String)>,
  /// Return-name to variable-name pairs. Every target receives the result.
  #[serde(default)]
  pub return_mapping: Vec<(String, String)>,
}

impl WorkflowNode {
  /// Create a node with no function binding.
  pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      node_type,
      function_id: None,
      parameter_mapping: Vec::new(),
      return_mapping: Vec::new(),
    }
  }
}

/// An edge connecting two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
  pub source: String,
  pub target: String,
  /// Disambiguates multi-output node types such as `Decision`/`Switch`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  /// Routing condition. Carried for editors, not evaluated by the engine.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
}

impl WorkflowEdge {
  /// Create an unlabeled edge.
  pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      label: None,
      condition: None,
    }
  }
}
