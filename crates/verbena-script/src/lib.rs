//! Shared Lua infrastructure for Verbena.
//!
//! Every compile and every loaded function runs in its own VM created by
//! [`function_vm`], so tearing one down can never affect another. The VM
//! exposes a fixed standard-library surface; process, filesystem and debug
//! facilities stay closed to user functions.

mod error;
mod value;
mod vm;

pub use error::ScriptError;
pub use value::{json_to_lua, lua_to_json};
pub use vm::function_vm;
