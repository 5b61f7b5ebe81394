use serde::{Deserialize, Serialize};

/// Severity of a compile diagnostic.
///
/// Ordered so that `severity >= Warning` selects the reportable levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
  Info,
  Warning,
  Error,
}

/// A structured compiler message.
///
/// Produced only by the compiler and immutable once created. A function's
/// diagnostics are replaced wholesale on every compile attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileDiagnostic {
  pub severity: DiagnosticSeverity,
  /// Stable diagnostic code, e.g. `SYNTAX_ERROR`.
  pub code: String,
  pub message: String,
  /// 1-based line, 0 when unknown.
  pub line: u32,
  /// 1-based column, 0 when unknown.
  pub column: u32,
}

impl CompileDiagnostic {
  /// Create an error-severity diagnostic.
  pub fn error(code: impl Into<String>, message: impl Into<String>, line: u32, column: u32) -> Self {
    Self {
      severity: DiagnosticSeverity::Error,
      code: code.into(),
      message: message.into(),
      line,
      column,
    }
  }

  /// Whether this diagnostic is an error.
  pub fn is_error(&self) -> bool {
    self.severity == DiagnosticSeverity::Error
  }
}
