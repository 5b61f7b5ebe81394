//! Function invocation.

use mlua::{MultiValue, Thread, ThreadStatus, Value as LuaValue};
use tracing::debug;
use uuid::Uuid;
use verbena_script::{json_to_lua, lua_to_json};

use crate::error::RuntimeError;
use crate::loader::FunctionLoader;

impl FunctionLoader {
  /// Invoke a loaded function with positional JSON arguments.
  ///
  /// A returned coroutine is resumed to completion and its final value
  /// unwrapped; a coroutine that finishes without producing a value yields
  /// `null`. Errors raised by the function propagate with the script's own
  /// message.
  ///
  /// # Errors
  /// Fails when no handle is loaded for `function_id`, when an argument or
  /// result cannot cross the JSON/Lua boundary, or when the function raises.
  pub async fn invoke(
    &self,
    function_id: Uuid,
    args: &[serde_json::Value],
  ) -> Result<serde_json::Value, RuntimeError> {
    // Clone the handles out so the registry lock is not held across the
    // call. Unloading mid-invocation invalidates the VM and the call fails
    // with a script error instead of blocking the unload.
    let (lua, entry) = {
      let handles = self.handles();
      let handle = handles
        .get(&function_id)
        .ok_or(RuntimeError::NotLoaded { function_id })?;
      (handle.lua.clone(), handle.entry.clone())
    };

    let lua_args = args
      .iter()
      .map(|arg| json_to_lua(&lua, arg))
      .collect::<Result<MultiValue, _>>()?;

    debug!(%function_id, argc = args.len(), "function_invoke");

    let result = entry
      .call_async::<LuaValue>(lua_args)
      .await
      .map_err(invocation_error)?;

    let settled = match result {
      LuaValue::Thread(thread) => settle_thread(thread)?,
      value => value,
    };

    Ok(lua_to_json(&lua, settled)?)
  }
}

/// Resume a returned coroutine until it finishes and unwrap its final value.
fn settle_thread(thread: Thread) -> Result<LuaValue, RuntimeError> {
  let mut last = MultiValue::new();
  while thread.status() == ThreadStatus::Resumable {
    last = thread.resume::<MultiValue>(()).map_err(invocation_error)?;
  }
  Ok(last.into_iter().next().unwrap_or(LuaValue::Nil))
}

/// Extract the script's own message from an invocation failure.
fn invocation_error(err: mlua::Error) -> RuntimeError {
  let message = match err {
    mlua::Error::RuntimeError(message) => message,
    mlua::Error::CallbackError { cause, .. } => cause.to_string(),
    other => other.to_string(),
  };
  RuntimeError::Invocation { message }
}
