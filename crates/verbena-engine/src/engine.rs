//! Workflow graph execution.
//!
//! A run walks the graph depth-first from its entry nodes, executing each
//! node's outgoing branches one at a time in edge order. A node reached
//! again through a converging path has already completed and is skipped, so
//! each node executes at most once per run. Cancellation is cooperative and
//! checked at every node entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use verbena_runtime::FunctionLoader;
use verbena_workflow::{Graph, NodeType, Workflow, WorkflowNode};

use crate::context::{ExecutionContext, LogLevel, NodeExecutionState};
use crate::error::EngineError;

/// Tuning for the engine's traversal behavior.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
  /// Run a node's outgoing branches as concurrent tasks joined before
  /// returning, instead of the default depth-first sequential walk. Log
  /// ordering across sibling branches is unspecified in this mode.
  pub concurrent_branches: bool,
}

/// One registered, in-flight run.
struct ActiveRun {
  context: Arc<Mutex<ExecutionContext>>,
  cancel: CancellationToken,
}

/// Shared state threaded through one run's traversal.
struct RunState {
  context: Arc<Mutex<ExecutionContext>>,
  cancel: CancellationToken,
}

/// Executes workflows against functions held by a [`FunctionLoader`].
///
/// Multiple runs may be in flight concurrently; each has its own context and
/// cancellation token, tracked in the engine's active-runs registry until the
/// run finishes.
pub struct WorkflowEngine {
  loader: Arc<FunctionLoader>,
  config: EngineConfig,
  active: Mutex<HashMap<Uuid, ActiveRun>>,
}

impl WorkflowEngine {
  /// Create an engine with the default sequential traversal.
  pub fn new(loader: Arc<FunctionLoader>) -> Self {
    Self::with_config(loader, EngineConfig::default())
  }

  /// Create an engine with explicit traversal configuration.
  pub fn with_config(loader: Arc<FunctionLoader>, config: EngineConfig) -> Self {
    Self {
      loader,
      config,
      active: Mutex::new(HashMap::new()),
    }
  }

  /// Execute a workflow to completion and return the finished context.
  ///
  /// Every terminal state is reported through the context's flags, error
  /// message and log; this method itself never fails. While the run is in
  /// flight it is queryable via [`WorkflowEngine::execution_context`] and
  /// cancellable via [`WorkflowEngine::cancel`] or the passed token.
  #[instrument(skip_all, fields(workflow_id = %workflow.id))]
  pub async fn execute(
    &self,
    workflow: &Workflow,
    initial_variables: Option<HashMap<String, serde_json::Value>>,
    cancel: CancellationToken,
  ) -> ExecutionContext {
    let context = Arc::new(Mutex::new(ExecutionContext::new(
      workflow.id.clone(),
      initial_variables.unwrap_or_default(),
    )));
    let run_id = lock(&context).run_id;

    lock(&self.active).insert(
      run_id,
      ActiveRun {
        context: context.clone(),
        cancel: cancel.clone(),
      },
    );

    let run = RunState {
      context: context.clone(),
      cancel,
    };
    let result = self.run(workflow, &run).await;

    {
      let mut ctx = lock(&context);
      let completed_at = Utc::now();
      ctx.is_running = false;
      ctx.completed_at = Some(completed_at);
      match result {
        Ok(()) => {
          let elapsed = (completed_at - ctx.started_at).num_milliseconds() as f64 / 1000.0;
          ctx.log(
            LogLevel::Info,
            None,
            format!("Workflow execution completed in {elapsed:.2}s"),
            None,
          );
          info!(%run_id, "workflow_completed");
        }
        Err(EngineError::Cancelled) => {
          ctx.is_cancelled = true;
          ctx.log(LogLevel::Warning, None, "Workflow execution cancelled", None);
          warn!(%run_id, "workflow_cancelled");
        }
        Err(e) => {
          ctx.error_message = Some(e.to_string());
          ctx.log(
            LogLevel::Error,
            None,
            format!("Workflow execution failed: {e}"),
            None,
          );
          error!(%run_id, error = %e, "workflow_failed");
        }
      }
    }

    lock(&self.active).remove(&run_id);

    let finished = lock(&context).clone();
    finished
  }

  /// Snapshot of an in-flight run. `None` once the run has finished; callers
  /// needing history keep the context returned by `execute`.
  pub fn execution_context(&self, run_id: Uuid) -> Option<ExecutionContext> {
    lock(&self.active)
      .get(&run_id)
      .map(|run| lock(&run.context).clone())
  }

  /// Signal cancellation for an in-flight run. Unknown or already finished
  /// run ids are ignored.
  pub fn cancel(&self, run_id: Uuid) {
    if let Some(run) = lock(&self.active).get(&run_id) {
      run.cancel.cancel();
    }
  }

  async fn run(&self, workflow: &Workflow, run: &RunState) -> Result<(), EngineError> {
    {
      let mut ctx = lock(&run.context);
      for node in &workflow.nodes {
        ctx
          .node_states
          .insert(node.id.clone(), NodeExecutionState::Pending);
      }
      ctx.log(
        LogLevel::Info,
        None,
        format!("Starting workflow execution: {}", workflow.name),
        None,
      );
    }
    info!("workflow_started");

    let graph = workflow.graph();
    if graph.entry_nodes().is_empty() {
      return Err(EngineError::NoEntryNodes);
    }

    // Entry subtrees run one after another, in workflow node order.
    for entry_id in graph.entry_nodes() {
      if let Some(node) = workflow.get_node(entry_id) {
        self.execute_node(workflow, &graph, node, run).await?;
      }
    }
    Ok(())
  }

  /// Execute a node and then its downstream subtree.
  fn execute_node<'a>(
    &'a self,
    workflow: &'a Workflow,
    graph: &'a Graph,
    node: &'a WorkflowNode,
    run: &'a RunState,
  ) -> BoxFuture<'a, Result<(), EngineError>> {
    async move {
      if run.cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
      }

      // First arrival wins: a node reached again through a converging path
      // has already run and is skipped.
      {
        let mut ctx = lock(&run.context);
        match ctx.node_state(&node.id) {
          NodeExecutionState::Pending => {
            ctx
              .node_states
              .insert(node.id.clone(), NodeExecutionState::Running);
          }
          _ => return Ok(()),
        }
        ctx.log(
          LogLevel::Info,
          Some(&node.id),
          format!("Executing node: {} ({:?})", node.name, node.node_type),
          None,
        );
      }
      info!(node_id = %node.id, node_type = ?node.node_type, "node_started");

      match self.dispatch(node, run).await {
        Ok(()) => {
          lock(&run.context)
            .node_states
            .insert(node.id.clone(), NodeExecutionState::Completed);
          info!(node_id = %node.id, "node_completed");
        }
        Err(e) => {
          let mut ctx = lock(&run.context);
          ctx
            .node_states
            .insert(node.id.clone(), NodeExecutionState::Failed);
          ctx.log(
            LogLevel::Error,
            Some(&node.id),
            format!("Node execution failed: {e}"),
            None,
          );
          error!(node_id = %node.id, error = %e, "node_failed");
          return Err(e);
        }
      }

      // Downstream edges in declaration order. A target id that names no
      // existing node is skipped without error.
      if self.config.concurrent_branches {
        let branches: Vec<_> = graph
          .downstream(&node.id)
          .iter()
          .filter_map(|target_id| workflow.get_node(target_id))
          .map(|target| self.execute_node(workflow, graph, target, run))
          .collect();
        for result in futures::future::join_all(branches).await {
          result?;
        }
      } else {
        for target_id in graph.downstream(&node.id) {
          if let Some(target) = workflow.get_node(target_id) {
            self.execute_node(workflow, graph, target, run).await?;
          }
        }
      }

      Ok(())
    }
    .boxed()
  }

  /// Dispatch a node by type.
  async fn dispatch(&self, node: &WorkflowNode, run: &RunState) -> Result<(), EngineError> {
    match node.node_type {
      NodeType::Input => {
        // Pure passthrough: input values arrive as initial variables.
        lock(&run.context).log(LogLevel::Info, Some(&node.id), "Input node executed", None);
        Ok(())
      }
      NodeType::Output => {
        // Output is read by the caller from the finished context.
        lock(&run.context).log(LogLevel::Info, Some(&node.id), "Output node executed", None);
        Ok(())
      }
      NodeType::Function => self.execute_function_node(node, run).await,
      NodeType::Agent => {
        lock(&run.context).log(
          LogLevel::Info,
          Some(&node.id),
          "Agent node executed (placeholder)",
          None,
        );
        Ok(())
      }
      NodeType::Decision => {
        lock(&run.context).log(
          LogLevel::Info,
          Some(&node.id),
          "Decision node executed (placeholder)",
          None,
        );
        Ok(())
      }
      NodeType::Parallel | NodeType::SubWorkflow | NodeType::Switch => {
        Err(EngineError::NotImplemented {
          node_type: node.node_type,
        })
      }
    }
  }

  /// Bind variables into a function invocation and its result back out.
  async fn execute_function_node(
    &self,
    node: &WorkflowNode,
    run: &RunState,
  ) -> Result<(), EngineError> {
    let function_id = node
      .function_id
      .ok_or_else(|| EngineError::MissingFunctionId {
        node_id: node.id.clone(),
      })?;

    // Positional arguments follow the declared parameter order; a mapping
    // whose variable does not exist is omitted, not defaulted.
    let args: Vec<serde_json::Value> = {
      let ctx = lock(&run.context);
      node
        .parameter_mapping
        .iter()
        .filter_map(|(_, variable)| ctx.variables.get(variable).cloned())
        .collect()
    };

    let result = self.loader.invoke(function_id, &args).await?;

    let mut ctx = lock(&run.context);
    if !result.is_null() {
      // A single result value fans out to every mapped variable.
      for (_, variable) in &node.return_mapping {
        ctx.variables.insert(variable.clone(), result.clone());
      }
    }
    let data = (!result.is_null()).then(|| result.to_string());
    ctx.log(
      LogLevel::Info,
      Some(&node.id),
      "Function executed successfully",
      data,
    );
    Ok(())
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}
