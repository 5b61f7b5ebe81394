//! Translation of Lua compile errors into structured diagnostics.

use verbena_function::CompileDiagnostic;

/// Stable code for Lua syntax errors.
pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";

/// Stable code for unexpected compiler failures.
pub const COMPILE_ERROR: &str = "COMPILE_ERROR";

/// Build a diagnostic from an `mlua` compile error.
///
/// Lua reports positions as `chunkname:line: message`; the 1-based line is
/// pulled out where present. Column information is not available and stays 0.
pub fn diagnostic_from_lua(err: mlua::Error) -> CompileDiagnostic {
  match err {
    mlua::Error::SyntaxError { message, .. } => {
      let (line, message) = split_position(&message);
      CompileDiagnostic::error(SYNTAX_ERROR, message, line, 0)
    }
    other => synthetic(format!("compilation failed: {other}")),
  }
}

/// The catch-all diagnostic for failures that are not syntax errors.
pub fn synthetic(message: impl Into<String>) -> CompileDiagnostic {
  CompileDiagnostic::error(COMPILE_ERROR, message, 0, 0)
}

/// Split `[string "name"]:LINE: message` into `(LINE, message)`.
fn split_position(raw: &str) -> (u32, String) {
  let tail_start = raw.rfind("]:").map(|i| i + 2).unwrap_or(0);
  let tail = &raw[tail_start..];
  if let Some(colon) = tail.find(':') {
    if let Ok(line) = tail[..colon].trim().parse::<u32>() {
      return (line, tail[colon + 1..].trim().to_string());
    }
  }
  (0, raw.trim().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_line_from_lua_message() {
    let (line, message) = split_position("[string \"add\"]:3: '=' expected near 'x'");
    assert_eq!(line, 3);
    assert_eq!(message, "'=' expected near 'x'");
  }

  #[test]
  fn keeps_message_without_position() {
    let (line, message) = split_position("something went sideways");
    assert_eq!(line, 0);
    assert_eq!(message, "something went sideways");
  }
}
