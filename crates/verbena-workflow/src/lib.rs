//! Workflow graph model for Verbena.
//!
//! A [`Workflow`] is a directed graph of [`WorkflowNode`]s connected by
//! [`WorkflowEdge`]s. The model is authored by external editors and only read
//! by the execution engine; [`Graph`] is the derived traversal structure.

mod graph;
mod node;
mod workflow;

pub use graph::Graph;
pub use node::{NodeType, WorkflowEdge, WorkflowNode};
pub use workflow::Workflow;
