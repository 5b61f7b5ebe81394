use thiserror::Error;

/// Errors from the shared script infrastructure.
#[derive(Debug, Error)]
pub enum ScriptError {
  /// The VM could not be created or configured.
  #[error("failed to create script VM: {0}")]
  Vm(#[source] mlua::Error),

  /// A value could not cross the JSON/Lua boundary.
  #[error("value conversion failed: {0}")]
  Conversion(#[source] mlua::Error),
}
