use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use mlua::{ChunkMode, Lua, Table, Value as LuaValue};
use tracing::{debug, info};
use uuid::Uuid;
use verbena_function::{CompileStatus, Function};
use verbena_script::function_vm;

use crate::error::RuntimeError;

/// A loaded function: its private VM plus the resolved entry point.
pub(crate) struct LoadedFunction {
  pub(crate) lua: Lua,
  pub(crate) entry: mlua::Function,
  pub(crate) artifact_path: PathBuf,
  pub(crate) entry_point: String,
}

/// Registry of isolated, unloadable function VMs keyed by function identity.
///
/// Exactly one VM is held per identity. Dropping the loader releases every
/// VM; handles cloned out of a dropped VM fail on use rather than dangle.
pub struct FunctionLoader {
  loaded: RwLock<HashMap<Uuid, LoadedFunction>>,
}

impl FunctionLoader {
  pub fn new() -> Self {
    Self {
      loaded: RwLock::new(HashMap::new()),
    }
  }

  /// Load a compiled artifact for `function_id`, replacing any prior handle.
  ///
  /// # Errors
  /// Fails when the artifact file is missing, the entry point has no
  /// separator, a table on the entry path does not exist, or the final
  /// segment is not a function.
  pub fn load(
    &self,
    function_id: Uuid,
    artifact_path: &Path,
    entry_point: &str,
  ) -> Result<(), RuntimeError> {
    if !artifact_path.exists() {
      return Err(RuntimeError::NotCompiled { function_id });
    }

    let (table_path, function_name) = split_entry_point(entry_point)?;

    // Replace, never merge: the previous VM goes away before the new
    // artifact is loaded.
    self.unload(function_id);

    let bytecode = fs::read(artifact_path).map_err(|source| RuntimeError::ArtifactRead {
      path: artifact_path.to_path_buf(),
      source,
    })?;

    let lua = function_vm()?;
    lua
      .load(bytecode)
      .set_name(entry_point)
      .set_mode(ChunkMode::Binary)
      .exec()
      .map_err(|source| RuntimeError::ArtifactLoad {
        path: artifact_path.to_path_buf(),
        source,
      })?;

    let entry = resolve_entry_point(&lua, entry_point, table_path, function_name)?;

    let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
    loaded.insert(
      function_id,
      LoadedFunction {
        lua,
        entry,
        artifact_path: artifact_path.to_path_buf(),
        entry_point: entry_point.to_string(),
      },
    );

    info!(
      %function_id,
      artifact = %artifact_path.display(),
      entry_point,
      "function_loaded"
    );
    Ok(())
  }

  /// Load from the function entity, checking its compile status first.
  pub fn load_function(&self, function: &Function) -> Result<(), RuntimeError> {
    if function.compile_status != CompileStatus::Compiled {
      return Err(RuntimeError::NotCompiled {
        function_id: function.id,
      });
    }
    let artifact_path = function
      .artifact_path
      .as_deref()
      .ok_or(RuntimeError::NotCompiled {
        function_id: function.id,
      })?;
    self.load(function.id, artifact_path, &function.entry_point)
  }

  /// Unload a function's VM. No-op when nothing is loaded.
  pub fn unload(&self, function_id: Uuid) {
    let removed = self
      .loaded
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .remove(&function_id);
    if removed.is_some() {
      debug!(%function_id, "function_unloaded");
    }
  }

  /// Unload every function. Teardown path when the loader is discarded.
  pub fn unload_all(&self) {
    self
      .loaded
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .clear();
  }

  /// Whether a handle is currently loaded for this identity.
  pub fn is_loaded(&self, function_id: Uuid) -> bool {
    self.handles().contains_key(&function_id)
  }

  /// Artifact path and entry point of the loaded handle, if any.
  pub fn loaded_entry_point(&self, function_id: Uuid) -> Option<(PathBuf, String)> {
    self
      .handles()
      .get(&function_id)
      .map(|f| (f.artifact_path.clone(), f.entry_point.clone()))
  }

  pub(crate) fn handles(&self) -> RwLockReadGuard<'_, HashMap<Uuid, LoadedFunction>> {
    self.loaded.read().unwrap_or_else(|e| e.into_inner())
  }
}

impl Default for FunctionLoader {
  fn default() -> Self {
    Self::new()
  }
}

/// Split the entry point into its table path and function name.
fn split_entry_point(entry_point: &str) -> Result<(&str, &str), RuntimeError> {
  match entry_point.rsplit_once('.') {
    Some((table_path, function_name)) if !table_path.is_empty() && !function_name.is_empty() => {
      Ok((table_path, function_name))
    }
    _ => Err(RuntimeError::InvalidEntryPoint {
      entry_point: entry_point.to_string(),
    }),
  }
}

/// Walk the entry point's table path through the VM's globals and pull the
/// function out of the final table.
fn resolve_entry_point(
  lua: &Lua,
  entry_point: &str,
  table_path: &str,
  function_name: &str,
) -> Result<mlua::Function, RuntimeError> {
  let mut table: Table = lua.globals();
  for segment in table_path.split('.') {
    let value = table.raw_get::<LuaValue>(segment).unwrap_or(LuaValue::Nil);
    match value {
      LuaValue::Table(next) => table = next,
      _ => {
        return Err(RuntimeError::TableNotFound {
          entry_point: entry_point.to_string(),
          table: segment.to_string(),
        });
      }
    }
  }

  match table.raw_get::<LuaValue>(function_name).unwrap_or(LuaValue::Nil) {
    LuaValue::Function(entry) => Ok(entry),
    _ => Err(RuntimeError::FunctionNotFound {
      table: table_path.to_string(),
      name: function_name.to_string(),
    }),
  }
}
