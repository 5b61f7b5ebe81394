//! Integration tests for the script compiler.

use std::fs;

use verbena_compiler::ScriptCompiler;
use verbena_function::{CompileStatus, DiagnosticSeverity, Function};

const ADD_SOURCE: &str = "\
Math = {}
function Math.Add(a, b)
  return a + b
end
";

const BROKEN_SOURCE: &str = "\
Math = {}
function Math.Add(a, b)
  return a +
";

fn compiler() -> (ScriptCompiler, tempfile::TempDir) {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let compiler = ScriptCompiler::new(dir.path().join("artifacts")).expect("failed to create compiler");
  (compiler, dir)
}

fn artifact_count(compiler: &ScriptCompiler) -> usize {
  fs::read_dir(compiler.output_dir()).unwrap().count()
}

#[test]
fn compile_success_updates_entity() {
  let (compiler, _dir) = compiler();
  let mut function = Function::new("add", ADD_SOURCE, "Math.Add");

  let outcome = compiler.compile(&mut function);

  assert!(outcome.success);
  assert!(outcome.diagnostics.is_empty());
  let artifact = outcome.artifact_path.expect("artifact path missing");
  assert!(artifact.exists());
  assert_eq!(function.compile_status, CompileStatus::Compiled);
  assert_eq!(function.artifact_path.as_deref(), Some(artifact.as_path()));
  assert!(function.last_compiled_at.is_some());
  assert!(function.diagnostics.is_empty());
}

#[test]
fn syntax_error_fails_and_leaves_no_artifact() {
  let (compiler, _dir) = compiler();
  let mut function = Function::new("add", BROKEN_SOURCE, "Math.Add");

  let outcome = compiler.compile(&mut function);

  assert!(!outcome.success);
  assert!(outcome.artifact_path.is_none());
  assert_eq!(outcome.diagnostics.len(), 1);
  let diagnostic = &outcome.diagnostics[0];
  assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
  assert_eq!(diagnostic.code, "SYNTAX_ERROR");
  assert!(diagnostic.line >= 1, "line should be reported: {diagnostic:?}");

  assert_eq!(function.compile_status, CompileStatus::Failed);
  assert!(function.artifact_path.is_none());
  assert_eq!(artifact_count(&compiler), 0, "no artifact file may remain");
}

#[test]
fn diagnostics_are_replaced_wholesale() {
  let (compiler, _dir) = compiler();
  let mut function = Function::new("add", BROKEN_SOURCE, "Math.Add");

  compiler.compile(&mut function);
  assert_eq!(function.diagnostics.len(), 1);

  function.source = ADD_SOURCE.to_string();
  let outcome = compiler.compile(&mut function);

  assert!(outcome.success);
  assert!(function.diagnostics.is_empty());
  assert_eq!(function.compile_status, CompileStatus::Compiled);
}

#[test]
fn recompile_emits_a_fresh_artifact() {
  let (compiler, _dir) = compiler();
  let mut function = Function::new("add", ADD_SOURCE, "Math.Add");

  compiler.compile(&mut function);
  let first = function.artifact_path.clone().unwrap();
  compiler.compile(&mut function);
  let second = function.artifact_path.clone().unwrap();

  assert!(second.exists());
  // Names embed the compile timestamp; a same-second recompile may reuse one.
  if first != second {
    assert_eq!(artifact_count(&compiler), 2);
  }
}

#[test]
fn validate_reports_without_emitting() {
  let (compiler, _dir) = compiler();

  let diagnostics = compiler.validate(BROKEN_SOURCE);
  assert_eq!(diagnostics.len(), 1);
  assert_eq!(diagnostics[0].code, "SYNTAX_ERROR");

  assert!(compiler.validate(ADD_SOURCE).is_empty());
  assert_eq!(artifact_count(&compiler), 0);
}
