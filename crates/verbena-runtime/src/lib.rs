//! Isolated loading and invocation of compiled functions.
//!
//! The [`FunctionLoader`] keeps one private VM per function identity.
//! Loading an identity again tears the previous VM down first, so a
//! recompiled artifact fully replaces the old one instead of accumulating
//! stale globals. Dropping the loader drops every VM with it.

mod error;
mod invoke;
mod loader;

pub use error::RuntimeError;
pub use loader::FunctionLoader;
