//! Function entity types for Verbena.
//!
//! A [`Function`] is a unit of user-authored Lua source with a declared entry
//! point. The compiler turns it into a bytecode artifact and records the
//! outcome on the entity itself: artifact path, [`CompileStatus`], timestamp
//! and [`CompileDiagnostic`]s. The loader only ever reads these fields.

mod diagnostic;
mod function;

pub use diagnostic::{CompileDiagnostic, DiagnosticSeverity};
pub use function::{CompileStatus, Function};
