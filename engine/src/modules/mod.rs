//! Built-in capability modules
//!
//! - `system_control`: file management confined to the workspace
//! - `memory_tools`: user preferences and notes

pub mod memory_tools;
pub mod preferences;
pub mod system_control;

pub use memory_tools::MemoryToolsModule;
pub use preferences::{InMemoryPreferences, PreferenceStore};
pub use system_control::SystemControlModule;

use crate::config::Config;
use crate::registry::ModuleRegistry;
use sdk::errors::EngineError;
use std::sync::Arc;
use tracing::debug;

/// Names accepted in `modules.enabled`
pub const BUILTIN_MODULES: &[&str] = &[SystemControlModule::NAME, MemoryToolsModule::NAME];

impl ModuleRegistry {
    /// Build a registry holding the modules enabled in `config`.
    ///
    /// `memory_tools` keeps its preferences in `preferences`.
    pub fn from_config(
        config: &Config,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Result<Self, EngineError> {
        let mut registry = ModuleRegistry::new();
        for name in &config.modules.enabled {
            match name.as_str() {
                SystemControlModule::NAME => {
                    let module = SystemControlModule::new(config.core.workspace.clone())?;
                    registry.register(Arc::new(module));
                }
                MemoryToolsModule::NAME => {
                    registry.register(Arc::new(MemoryToolsModule::new(Arc::clone(&preferences))));
                }
                other => {
                    return Err(EngineError::Config(format!("Unknown module '{}'", other)));
                }
            }
        }
        debug!("Module registry ready: {:?}", registry.module_names());
        Ok(registry)
    }
}
