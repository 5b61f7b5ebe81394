//! Source compilation for Verbena functions.
//!
//! [`ScriptCompiler`] turns a function's Lua source into a bytecode artifact
//! in a private output directory and records the outcome on the entity.
//! Failures never cross this boundary as errors; they become diagnostics
//! plus a `Failed` status, so callers always get a [`CompileOutcome`].

mod compiler;
mod diagnostics;

pub use compiler::{CompileOutcome, ScriptCompiler};
pub use diagnostics::{COMPILE_ERROR, SYNTAX_ERROR};
