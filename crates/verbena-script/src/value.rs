use mlua::{Lua, LuaSerdeExt, SerializeOptions, Value as LuaValue};

use crate::error::ScriptError;

/// Convert a JSON value into a Lua value owned by `lua`.
///
/// `null` becomes `nil` so script code can use plain `== nil` checks.
pub fn json_to_lua(lua: &Lua, value: &serde_json::Value) -> Result<LuaValue, ScriptError> {
  let options = SerializeOptions::new()
    .serialize_none_to_null(false)
    .serialize_unit_to_null(false);
  lua.to_value_with(value, options).map_err(ScriptError::Conversion)
}

/// Convert a Lua value back into JSON. `nil` maps to `null`.
pub fn lua_to_json(lua: &Lua, value: LuaValue) -> Result<serde_json::Value, ScriptError> {
  lua.from_value(value).map_err(ScriptError::Conversion)
}
