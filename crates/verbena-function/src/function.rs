use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diagnostic::CompileDiagnostic;

/// Compilation status of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStatus {
  /// Never compiled, or edited since the last attempt was recorded.
  NotCompiled,
  /// The last compile produced a loadable artifact.
  Compiled,
  /// The last compile failed; see the diagnostics.
  Failed,
}

/// A user-authored function that can be compiled and executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
  pub id: Uuid,
  pub name: String,
  #[serde(default)]
  pub description: String,
  /// Lua source text.
  pub source: String,
  /// Dot-delimited entry point, e.g. `"Text.Reverse"`. The final segment
  /// names a function; every preceding segment names a nested global table.
  pub entry_point: String,
  /// Path to the compiled bytecode artifact, set on successful compile.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifact_path: Option<PathBuf>,
  pub compile_status: CompileStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_compiled_at: Option<DateTime<Utc>>,
  /// Diagnostics from the most recent compile attempt.
  #[serde(default)]
  pub diagnostics: Vec<CompileDiagnostic>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Function {
  /// Create a new, not yet compiled function.
  pub fn new(
    name: impl Into<String>,
    source: impl Into<String>,
    entry_point: impl Into<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      description: String::new(),
      source: source.into(),
      entry_point: entry_point.into(),
      artifact_path: None,
      compile_status: CompileStatus::NotCompiled,
      last_compiled_at: None,
      diagnostics: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }
}
