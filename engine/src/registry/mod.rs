//! Capability Registry
//!
//! Holds the capability modules available to plans. The registry is built
//! once at startup (single-threaded, `&mut self`) and then frozen behind an
//! `Arc`; every read path takes `&self` and no lock is involved, so the
//! scheduler can resolve steps from many tasks at once.
//!
//! The registry is also the only thing a plan producer may consult to learn
//! what exists: [`ModuleRegistry::list_capabilities`] returns a deterministic
//! snapshot of enabled modules.

use sdk::errors::EngineError;
use sdk::module::Module;
use sdk::types::CapabilityDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

/// One parameter in a capability listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterListing {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

/// One enabled capability, as advertised to plan producers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityListing {
    pub module: String,
    pub full_name: String,
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterListing>,
    pub requires_confirmation: bool,
    pub is_read_only: bool,
}

/// A resolved `module.capability` reference
#[derive(Clone)]
pub struct Resolved {
    pub module: Arc<dyn Module>,
    pub capability: CapabilityDescriptor,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("module", &self.module.name())
            .field("capability", &self.capability.name)
            .finish()
    }
}

/// Registry of capability modules keyed by module name
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn Module>>,
    disabled: BTreeSet<String>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any module with the same name.
    ///
    /// A replacement is logged as a potential conflict and the previous
    /// module is returned.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Option<Arc<dyn Module>> {
        let name = module.name().to_string();
        let previous = self.modules.insert(name.clone(), module);
        if previous.is_some() {
            warn!("Module '{}' already registered, overwriting", name);
        } else {
            info!("Registered module: {}", name);
        }
        previous
    }

    /// Remove a module by name
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Module>> {
        self.disabled.remove(name);
        let removed = self.modules.remove(name);
        if removed.is_some() {
            info!("Unregistered module: {}", name);
        }
        removed
    }

    /// Enable or disable a registered module.
    ///
    /// Returns `false` if no module has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        if !self.modules.contains_key(name) {
            return false;
        }
        if enabled {
            self.disabled.remove(name);
        } else {
            self.disabled.insert(name.to_string());
        }
        true
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.modules.contains_key(name) && !self.disabled.contains(name)
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).cloned()
    }

    /// Names of all registered modules, in order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Resolve a qualified `module.capability` reference.
    ///
    /// Splits on the first `.`; the remainder is the capability name.
    pub fn resolve(&self, qualified: &str) -> Result<Resolved, EngineError> {
        let (module_name, capability_name) = qualified
            .split_once('.')
            .ok_or_else(|| EngineError::InvalidReference(qualified.to_string()))?;

        let module = self
            .modules
            .get(module_name)
            .ok_or_else(|| EngineError::UnknownModule(module_name.to_string()))?;

        if self.disabled.contains(module_name) {
            return Err(EngineError::ModuleDisabled(module_name.to_string()));
        }

        let capability = module.capability(capability_name).cloned().ok_or_else(|| {
            EngineError::UnknownCapability {
                module: module_name.to_string(),
                capability: capability_name.to_string(),
            }
        })?;

        Ok(Resolved {
            module: Arc::clone(module),
            capability,
        })
    }

    fn enabled(&self) -> impl Iterator<Item = (&String, &Arc<dyn Module>)> {
        self.modules
            .iter()
            .filter(|(name, _)| !self.disabled.contains(*name))
    }

    /// Snapshot of every enabled capability.
    ///
    /// Modules appear in name order and capabilities in declared order, so
    /// the listing is identical across calls for the same registry.
    pub fn list_capabilities(&self) -> Vec<CapabilityListing> {
        self.enabled()
            .flat_map(|(module_name, module)| {
                module.capabilities().iter().map(move |cap| CapabilityListing {
                    module: module_name.clone(),
                    full_name: format!("{}.{}", module_name, cap.name),
                    name: cap.name.clone(),
                    description: cap.description.clone(),
                    parameters: cap
                        .parameters
                        .iter()
                        .map(|p| ParameterListing {
                            name: p.name.clone(),
                            param_type: p.param_type.to_string(),
                            description: p.description.clone(),
                            required: p.required,
                        })
                        .collect(),
                    requires_confirmation: module.requires_confirmation(),
                    is_read_only: module.is_read_only() || cap.read_only,
                })
            })
            .collect()
    }

    /// Human-readable description of every enabled module and capability.
    ///
    /// Used as the capability section of a planner prompt.
    pub fn catalog(&self) -> String {
        let mut out = String::new();
        for (name, module) in self.enabled() {
            out.push_str(&format!("Module: {}\n", name));
            out.push_str(&format!("Description: {}\n", module.description()));
            out.push_str("Capabilities:\n");
            for cap in module.capabilities() {
                out.push_str(&format!("  - {}.{}: {}\n", name, cap.name, cap.description));
                if !cap.parameters.is_empty() {
                    out.push_str("    Parameters:\n");
                    for param in &cap.parameters {
                        let req = if param.required { "required" } else { "optional" };
                        out.push_str(&format!(
                            "      - {} ({}, {}): {}\n",
                            param.name, param.param_type, req, param.description
                        ));
                    }
                }
                for example in &cap.examples {
                    out.push_str(&format!("    Example: {}\n", example));
                }
            }
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.module_names())
            .field("disabled", &self.disabled)
            .finish()
    }
}
