use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors from loading or invoking functions.
#[derive(Debug, Error)]
pub enum RuntimeError {
  /// The function has no usable artifact: never compiled successfully, or
  /// the artifact file is gone.
  #[error("function '{function_id}' has not been compiled or artifact not found")]
  NotCompiled { function_id: Uuid },

  /// The entry point string has no `Table.Function` separator.
  #[error("invalid entry point format: '{entry_point}', expected 'Table.Function'")]
  InvalidEntryPoint { entry_point: String },

  /// A table named in the entry point does not exist in the artifact.
  #[error("table '{table}' not found for entry point '{entry_point}'")]
  TableNotFound { entry_point: String, table: String },

  /// The final entry point segment is missing or not a function.
  #[error("function '{name}' not found in table '{table}'")]
  FunctionNotFound { table: String, name: String },

  /// Reading the artifact from disk failed.
  #[error("failed to read artifact {path}: {source}")]
  ArtifactRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The artifact chunk failed to load or execute.
  #[error("failed to load artifact {path}: {source}")]
  ArtifactLoad {
    path: PathBuf,
    #[source]
    source: mlua::Error,
  },

  /// Invoke was called for an identity with no loaded handle.
  #[error("function '{function_id}' is not loaded")]
  NotLoaded { function_id: Uuid },

  /// The invoked function raised an error; the script's own message is kept.
  #[error("function invocation failed: {message}")]
  Invocation { message: String },

  /// A value could not cross the JSON/Lua boundary.
  #[error(transparent)]
  Script(#[from] verbena_script::ScriptError),
}
