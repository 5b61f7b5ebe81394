use std::collections::{HashMap, HashSet};

use crate::workflow::Workflow;

/// Traversal structure derived from a workflow's nodes and edges.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Nodes with no incoming edges, in workflow node order.
  entry_nodes: Vec<String>,
  /// node_id -> downstream target ids, in edge order. Targets are kept as
  /// declared; a target that names no existing node resolves to nothing at
  /// traversal time.
  downstream: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from a workflow.
  pub fn new(workflow: &Workflow) -> Self {
    let targets: HashSet<&str> = workflow.edges.iter().map(|e| e.target.as_str()).collect();

    let entry_nodes: Vec<String> = workflow
      .nodes
      .iter()
      .filter(|n| !targets.contains(n.id.as_str()))
      .map(|n| n.id.clone())
      .collect();

    let mut downstream: HashMap<String, Vec<String>> = HashMap::new();
    for node in &workflow.nodes {
      downstream.entry(node.id.clone()).or_default();
    }
    for edge in &workflow.edges {
      downstream
        .entry(edge.source.clone())
        .or_default()
        .push(edge.target.clone());
    }

    Self {
      entry_nodes,
      downstream,
    }
  }

  /// Entry nodes (no incoming edges), in workflow node order.
  pub fn entry_nodes(&self) -> &[String] {
    &self.entry_nodes
  }

  /// Downstream target ids for a node, in edge order.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .downstream
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
