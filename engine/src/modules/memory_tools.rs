//! Memory Tools Module
//!
//! Stores and retrieves user preferences and records free-form notes in the
//! engine log.

use super::preferences::PreferenceStore;
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::module::{InvocationContext, Module};
use sdk::types::{CapabilityDescriptor, ModuleOutput, ParamType, ParameterDescriptor, Params};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct MemoryToolsModule {
    store: Arc<dyn PreferenceStore>,
    capabilities: Vec<CapabilityDescriptor>,
}

impl MemoryToolsModule {
    pub const NAME: &'static str = "memory_tools";

    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        let key = || ParameterDescriptor::required("key", ParamType::String, "Preference key/name");
        let user_id = || ParameterDescriptor::required("user_id", ParamType::Int, "User ID");

        let capabilities = vec![
            CapabilityDescriptor::new("remember_preference", "Remember a user preference")
                .param(key())
                .param(ParameterDescriptor::required(
                    "value",
                    ParamType::String,
                    "Preference value",
                ))
                .param(user_id())
                .returns("{key, value, message}")
                .example("remember_preference: key='theme', value='dark', user_id=1"),
            CapabilityDescriptor::new("get_preference", "Retrieve a user preference")
                .param(key())
                .param(user_id())
                .returns("{key, value}")
                .read_only(),
            CapabilityDescriptor::new("log_message", "Log a message or note")
                .param(ParameterDescriptor::required(
                    "message",
                    ParamType::String,
                    "Message to log",
                ))
                .returns("{message, logged}"),
        ];

        Self {
            store,
            capabilities,
        }
    }

    async fn remember_preference(&self, params: &Params) -> Result<ModuleOutput, EngineError> {
        let key = params.str("key")?;
        let value = params.str("value")?;
        let user_id = params.i64("user_id")?;

        self.store.save(user_id, key, value).await?;

        Ok(ModuleOutput::json(json!({
            "key": key,
            "value": value,
            "message": format!("Preference '{}' saved", key),
        })))
    }

    async fn get_preference(&self, params: &Params) -> Result<ModuleOutput, EngineError> {
        let key = params.str("key")?;
        let user_id = params.i64("user_id")?;

        match self.store.load(user_id, key).await? {
            Some(value) => Ok(ModuleOutput::json(json!({ "key": key, "value": value }))),
            None => Ok(ModuleOutput::error(format!("Preference '{}' not found", key))),
        }
    }

    fn log_message(&self, params: &Params, ctx: &InvocationContext) -> Result<ModuleOutput, EngineError> {
        let message = params.str("message")?;
        info!("Run {} step {}: {}", ctx.run_id, ctx.step_id, message);

        Ok(ModuleOutput::json(json!({ "message": message, "logged": true })))
    }
}

#[async_trait]
impl Module for MemoryToolsModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Store and retrieve user preferences and memories"
    }

    fn requires_confirmation(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn capabilities(&self) -> &[CapabilityDescriptor] {
        &self.capabilities
    }

    async fn invoke(
        &self,
        capability: &str,
        params: Params,
        ctx: &InvocationContext,
    ) -> Result<ModuleOutput, EngineError> {
        match capability {
            "remember_preference" => self.remember_preference(&params).await,
            "get_preference" => self.get_preference(&params).await,
            "log_message" => self.log_message(&params, ctx),
            other => Err(EngineError::UnknownCapability {
                module: Self::NAME.to_string(),
                capability: other.to_string(),
            }),
        }
    }
}
