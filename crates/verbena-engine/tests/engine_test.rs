//! Integration tests for the workflow execution engine.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use verbena_compiler::ScriptCompiler;
use verbena_engine::{EngineConfig, LogLevel, NodeExecutionState, WorkflowEngine};
use verbena_function::Function;
use verbena_runtime::FunctionLoader;
use verbena_workflow::{NodeType, Workflow, WorkflowEdge, WorkflowNode};

struct Fixture {
  compiler: ScriptCompiler,
  loader: Arc<FunctionLoader>,
  _dir: tempfile::TempDir,
}

impl Fixture {
  fn new() -> Self {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let compiler =
      ScriptCompiler::new(dir.path().join("artifacts")).expect("failed to create compiler");
    Self {
      compiler,
      loader: Arc::new(FunctionLoader::new()),
      _dir: dir,
    }
  }

  fn engine(&self) -> WorkflowEngine {
    WorkflowEngine::new(self.loader.clone())
  }

  /// Compile and load a Lua function, returning its identity.
  fn function(&self, source: &str, entry_point: &str) -> Uuid {
    let mut function = Function::new("test", source, entry_point);
    let outcome = self.compiler.compile(&mut function);
    assert!(outcome.success, "fixture source must compile: {outcome:?}");
    self.loader.load_function(&function).unwrap();
    function.id
  }
}

fn workflow(nodes: Vec<WorkflowNode>, edges: Vec<(&str, &str)>) -> Workflow {
  Workflow {
    id: "wf-test".to_string(),
    name: "Test Workflow".to_string(),
    description: String::new(),
    nodes,
    edges: edges
      .into_iter()
      .map(|(from, to)| WorkflowEdge::new(from, to))
      .collect(),
    timeout_ms: None,
    max_retry_attempts: None,
  }
}

fn node(id: &str, node_type: NodeType) -> WorkflowNode {
  WorkflowNode::new(id, id, node_type)
}

fn function_node(id: &str, function_id: Uuid) -> WorkflowNode {
  let mut node = node(id, NodeType::Function);
  node.function_id = Some(function_id);
  node
}

fn vars(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.clone()))
    .collect()
}

fn executing_logs<'a>(
  context: &'a verbena_engine::ExecutionContext,
  node_id: &str,
) -> Vec<&'a verbena_engine::ExecutionLogEntry> {
  context
    .logs
    .iter()
    .filter(|entry| {
      entry.node_id.as_deref() == Some(node_id) && entry.message.starts_with("Executing node")
    })
    .collect()
}

#[tokio::test]
async fn run_without_entry_nodes_fails_cleanly() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("a", NodeType::Agent), node("b", NodeType::Agent)],
    vec![("a", "b"), ("b", "a")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(!context.is_running);
  assert_eq!(
    context.error_message.as_deref(),
    Some("workflow has no entry nodes")
  );
  assert_eq!(context.node_state("a"), NodeExecutionState::Pending);
  assert_eq!(context.node_state("b"), NodeExecutionState::Pending);
}

#[tokio::test]
async fn linear_run_completes_every_reachable_node() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![
      node("in", NodeType::Input),
      node("work", NodeType::Agent),
      node("out", NodeType::Output),
    ],
    vec![("in", "work"), ("work", "out")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(!context.is_running);
  assert!(context.error_message.is_none());
  assert!(context.completed_at.is_some());
  for id in ["in", "work", "out"] {
    assert_eq!(context.node_state(id), NodeExecutionState::Completed);
  }
  assert!(
    context.logs.first().unwrap().message.starts_with("Starting workflow execution"),
    "run starts with a start entry"
  );
  assert!(
    context.logs.last().unwrap().message.starts_with("Workflow execution completed in"),
    "run ends with a timing summary"
  );
}

#[tokio::test]
async fn unreachable_nodes_stay_pending() {
  let fixture = Fixture::new();
  // "orphaned" hangs off a dangling source id, so it has an incoming edge
  // but can never be reached.
  let wf = workflow(
    vec![node("in", NodeType::Input), node("orphaned", NodeType::Agent)],
    vec![("ghost", "orphaned")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert_eq!(context.node_state("in"), NodeExecutionState::Completed);
  assert_eq!(context.node_state("orphaned"), NodeExecutionState::Pending);
}

#[tokio::test]
async fn converging_paths_execute_a_node_once() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![
      node("in", NodeType::Input),
      node("left", NodeType::Agent),
      node("right", NodeType::Agent),
      node("join", NodeType::Agent),
    ],
    vec![("in", "left"), ("in", "right"), ("left", "join"), ("right", "join")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert_eq!(context.node_state("join"), NodeExecutionState::Completed);
  assert_eq!(executing_logs(&context, "join").len(), 1);
}

#[tokio::test]
async fn function_node_binds_parameters_and_returns() {
  let fixture = Fixture::new();
  let function_id = fixture.function(
    "Math = {}\nfunction Math.Times6(x)\n  return x * 6\nend\n",
    "Math.Times6",
  );

  let mut work = function_node("work", function_id);
  work.parameter_mapping = vec![("x".to_string(), "input1".to_string())];
  work.return_mapping = vec![("result".to_string(), "output1".to_string())];
  let wf = workflow(
    vec![node("in", NodeType::Input), work, node("out", NodeType::Output)],
    vec![("in", "work"), ("work", "out")],
  );

  let context = fixture
    .engine()
    .execute(&wf, Some(vars(&[("input1", json!(7))])), CancellationToken::new())
    .await;

  assert!(context.error_message.is_none(), "{:?}", context.error_message);
  assert_eq!(context.variables.get("output1"), Some(&json!(42)));
  // The initial variable is untouched.
  assert_eq!(context.variables.get("input1"), Some(&json!(7)));

  let entry = context
    .logs
    .iter()
    .find(|e| e.message == "Function executed successfully")
    .expect("function log entry");
  assert_eq!(entry.data.as_deref(), Some("42"));
}

#[tokio::test]
async fn return_value_fans_out_to_every_mapped_variable() {
  let fixture = Fixture::new();
  let function_id = fixture.function(
    "Fn = {}\nfunction Fn.Answer()\n  return 41 + 1\nend\n",
    "Fn.Answer",
  );

  let mut work = function_node("work", function_id);
  work.return_mapping = vec![
    ("result".to_string(), "first".to_string()),
    ("also".to_string(), "second".to_string()),
  ];
  let wf = workflow(vec![work], vec![]);

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert_eq!(context.variables.get("first"), Some(&json!(42)));
  assert_eq!(context.variables.get("second"), Some(&json!(42)));
}

#[tokio::test]
async fn missing_parameter_variables_are_omitted() {
  let fixture = Fixture::new();
  let function_id = fixture.function(
    "Fn = {}\nfunction Fn.Maybe(a)\n  if a == nil then\n    return \"none\"\n  end\n  return a\nend\n",
    "Fn.Maybe",
  );

  let mut work = function_node("work", function_id);
  work.parameter_mapping = vec![("a".to_string(), "never_set".to_string())];
  work.return_mapping = vec![("result".to_string(), "out".to_string())];
  let wf = workflow(vec![work], vec![]);

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert_eq!(context.variables.get("out"), Some(&json!("none")));
}

#[tokio::test]
async fn nil_result_writes_no_variables() {
  let fixture = Fixture::new();
  let function_id = fixture.function(
    "Fn = {}\nfunction Fn.Quiet()\nend\n",
    "Fn.Quiet",
  );

  let mut work = function_node("work", function_id);
  work.return_mapping = vec![("result".to_string(), "out".to_string())];
  let wf = workflow(vec![work], vec![]);

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert!(!context.variables.contains_key("out"));
}

#[tokio::test]
async fn function_node_without_function_id_fails_the_run() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("work", NodeType::Function), node("after", NodeType::Output)],
    vec![("work", "after")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert_eq!(context.node_state("work"), NodeExecutionState::Failed);
  assert_eq!(context.node_state("after"), NodeExecutionState::Pending);
  assert!(
    context.error_message.as_deref().unwrap().contains("has no function id"),
    "{:?}",
    context.error_message
  );
}

#[tokio::test]
async fn script_failure_aborts_the_run() {
  let fixture = Fixture::new();
  let function_id = fixture.function(
    "Fn = {}\nfunction Fn.Boom()\n  error(\"kaboom\")\nend\n",
    "Fn.Boom",
  );

  let wf = workflow(
    vec![
      function_node("work", function_id),
      node("after", NodeType::Output),
    ],
    vec![("work", "after")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert_eq!(context.node_state("work"), NodeExecutionState::Failed);
  assert_eq!(context.node_state("after"), NodeExecutionState::Pending);
  assert!(context.error_message.as_deref().unwrap().contains("kaboom"));
  assert!(
    context
      .logs
      .iter()
      .any(|e| e.level == LogLevel::Error && e.message.starts_with("Node execution failed")),
    "node failure is logged"
  );
}

#[tokio::test]
async fn placeholder_nodes_complete_without_touching_variables() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("agent", NodeType::Agent), node("decide", NodeType::Decision)],
    vec![("agent", "decide")],
  );

  let initial = vars(&[("untouched", json!("value"))]);
  let context = fixture
    .engine()
    .execute(&wf, Some(initial.clone()), CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert_eq!(context.node_state("agent"), NodeExecutionState::Completed);
  assert_eq!(context.node_state("decide"), NodeExecutionState::Completed);
  assert_eq!(context.variables, initial);
}

#[tokio::test]
async fn unimplemented_node_types_fail_the_run() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("par", NodeType::Parallel), node("after", NodeType::Output)],
    vec![("par", "after")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert_eq!(context.node_state("par"), NodeExecutionState::Failed);
  assert_eq!(context.node_state("after"), NodeExecutionState::Pending);
  assert!(context.error_message.as_deref().unwrap().contains("not implemented"));
}

#[tokio::test]
async fn dangling_edge_targets_are_skipped() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("in", NodeType::Input), node("out", NodeType::Output)],
    vec![("in", "ghost"), ("in", "out")],
  );

  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  assert!(context.error_message.is_none());
  assert_eq!(context.node_state("out"), NodeExecutionState::Completed);
}

#[tokio::test]
async fn cancelled_token_stops_the_run_before_any_node() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![node("in", NodeType::Input), node("out", NodeType::Output)],
    vec![("in", "out")],
  );

  let cancel = CancellationToken::new();
  cancel.cancel();
  let context = fixture.engine().execute(&wf, None, cancel).await;

  assert!(context.is_cancelled);
  assert!(!context.is_running);
  assert!(context.error_message.is_none(), "cancellation is not an error");
  assert_eq!(context.node_state("in"), NodeExecutionState::Pending);
  assert_eq!(context.node_state("out"), NodeExecutionState::Pending);
  assert!(
    context
      .logs
      .iter()
      .any(|e| e.level == LogLevel::Warning && e.message == "Workflow execution cancelled"),
    "cancellation is logged as a warning"
  );
}

#[tokio::test]
async fn finished_runs_are_no_longer_queryable() {
  let fixture = Fixture::new();
  let engine = fixture.engine();
  let wf = workflow(vec![node("in", NodeType::Input)], vec![]);

  let context = engine.execute(&wf, None, CancellationToken::new()).await;

  assert!(engine.execution_context(context.run_id).is_none());
}

#[tokio::test]
async fn cancel_of_unknown_run_is_a_no_op() {
  let fixture = Fixture::new();
  fixture.engine().cancel(Uuid::new_v4());
}

#[tokio::test]
async fn concurrent_branches_still_execute_join_nodes_once() {
  let fixture = Fixture::new();
  let engine = WorkflowEngine::with_config(
    fixture.loader.clone(),
    EngineConfig {
      concurrent_branches: true,
    },
  );
  let wf = workflow(
    vec![
      node("in", NodeType::Input),
      node("left", NodeType::Agent),
      node("right", NodeType::Agent),
      node("join", NodeType::Output),
    ],
    vec![("in", "left"), ("in", "right"), ("left", "join"), ("right", "join")],
  );

  let context = engine.execute(&wf, None, CancellationToken::new()).await;

  assert!(context.error_message.is_none());
  for id in ["in", "left", "right", "join"] {
    assert_eq!(context.node_state(id), NodeExecutionState::Completed);
  }
  assert_eq!(executing_logs(&context, "join").len(), 1);
}

#[tokio::test]
async fn multiple_entry_nodes_run_in_node_order() {
  let fixture = Fixture::new();
  let wf = workflow(
    vec![
      node("second", NodeType::Agent),
      node("first", NodeType::Agent),
    ],
    vec![],
  );
  // Both have no incoming edges; "second" is declared first and runs first.
  let context = fixture
    .engine()
    .execute(&wf, None, CancellationToken::new())
    .await;

  let order: Vec<&str> = context
    .logs
    .iter()
    .filter(|e| e.message.starts_with("Executing node"))
    .filter_map(|e| e.node_id.as_deref())
    .collect();
  assert_eq!(order, ["second", "first"]);
}
