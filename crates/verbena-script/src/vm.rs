use mlua::{Lua, LuaOptions, StdLib};

use crate::error::ScriptError;

/// Create a fresh, isolated VM with the pinned standard-library set.
///
/// Functions get the base library plus `table`, `string`, `math` and
/// `coroutine`. `io`, `os`, `debug` and `package` are excluded: user
/// functions compute over their arguments, they do not touch the process.
pub fn function_vm() -> Result<Lua, ScriptError> {
  let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE;
  Lua::new_with(libs, LuaOptions::default()).map_err(ScriptError::Vm)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vm_exposes_pinned_libraries() {
    let lua = function_vm().unwrap();
    let globals = lua.globals();
    assert!(globals.contains_key("table").unwrap());
    assert!(globals.contains_key("string").unwrap());
    assert!(globals.contains_key("math").unwrap());
    assert!(globals.contains_key("coroutine").unwrap());
  }

  #[test]
  fn vm_closes_process_libraries() {
    let lua = function_vm().unwrap();
    let globals = lua.globals();
    assert!(!globals.contains_key("io").unwrap());
    assert!(!globals.contains_key("os").unwrap());
    assert!(!globals.contains_key("debug").unwrap());
  }
}
