//! Project file format for the CLI.
//!
//! A project bundles function definitions with the workflows that call them.
//! Nodes reference functions by name; resolution assigns identities and
//! produces the executable model types.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use uuid::Uuid;
use verbena_function::Function;
use verbena_workflow::{NodeType, Workflow, WorkflowEdge, WorkflowNode};

/// A project file: named functions plus workflows.
#[derive(Debug, Deserialize)]
pub struct ProjectDef {
  pub name: String,
  #[serde(default)]
  pub functions: Vec<FunctionDef>,
  pub workflows: Vec<WorkflowDef>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionDef {
  pub name: String,
  pub source: String,
  pub entry_point: String,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowDef {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
  pub timeout_ms: Option<u64>,
  pub max_retry_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDef {
  pub id: String,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub node_type: NodeType,
  /// Function name, resolved against the project's functions.
  pub function: Option<String>,
  #[serde(default)]
  pub parameter_mapping: Vec<(String, String)>,
  #[serde(default)]
  pub return_mapping: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
pub struct EdgeDef {
  pub source: String,
  pub target: String,
  pub label: Option<String>,
  pub condition: Option<String>,
}

impl ProjectDef {
  /// Materialize function entities. Identities are assigned here.
  pub fn build_functions(&self) -> Vec<Function> {
    self
      .functions
      .iter()
      .map(|def| Function::new(&def.name, &def.source, &def.entry_point))
      .collect()
  }

  /// Resolve a workflow definition into the executable model, mapping
  /// function names to the identities in `functions`.
  pub fn resolve_workflow(
    &self,
    workflow_id: Option<&str>,
    functions: &[Function],
  ) -> Result<Workflow> {
    let def = match workflow_id {
      Some(id) => self
        .workflows
        .iter()
        .find(|w| w.id == id)
        .with_context(|| format!("workflow '{id}' not found in project"))?,
      None => self
        .workflows
        .first()
        .context("project contains no workflows")?,
    };

    let by_name: HashMap<&str, Uuid> = functions.iter().map(|f| (f.name.as_str(), f.id)).collect();

    let mut nodes = Vec::with_capacity(def.nodes.len());
    for node_def in &def.nodes {
      let function_id = match &node_def.function {
        Some(name) => Some(
          by_name
            .get(name.as_str())
            .copied()
            .with_context(|| format!("node '{}' references unknown function '{name}'", node_def.id))?,
        ),
        None => {
          if node_def.node_type == NodeType::Function {
            bail!("function node '{}' names no function", node_def.id);
          }
          None
        }
      };

      let mut node = WorkflowNode::new(
        &node_def.id,
        node_def.name.clone().unwrap_or_else(|| node_def.id.clone()),
        node_def.node_type,
      );
      node.function_id = function_id;
      node.parameter_mapping = node_def.parameter_mapping.clone();
      node.return_mapping = node_def.return_mapping.clone();
      nodes.push(node);
    }

    let edges = def
      .edges
      .iter()
      .map(|edge| WorkflowEdge {
        source: edge.source.clone(),
        target: edge.target.clone(),
        label: edge.label.clone(),
        condition: edge.condition.clone(),
      })
      .collect();

    Ok(Workflow {
      id: def.id.clone(),
      name: def.name.clone(),
      description: def.description.clone(),
      nodes,
      edges,
      timeout_ms: def.timeout_ms,
      max_retry_attempts: def.max_retry_attempts,
    })
  }
}
