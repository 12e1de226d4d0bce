//! Capability schema and invocation types
//!
//! A module declares what it accepts through [`CapabilityDescriptor`]s. Raw
//! plan parameters never reach a module directly: they are bound against the
//! descriptor first ([`CapabilityDescriptor::bind`]), which checks every value
//! against its declared [`ParamType`], fills in defaults and produces a
//! [`Params`] bag.

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type tag of a capability parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
    List,
    #[serde(alias = "dict")]
    Map,
}

impl ParamType {
    /// Check a JSON value against this type.
    ///
    /// Returns the value to store in the bag. Integral floats are accepted
    /// for `int` and normalised to integers.
    fn coerce(self, value: &Value) -> Option<Value> {
        match self {
            ParamType::String if value.is_string() => Some(value.clone()),
            ParamType::Int if value.is_i64() || value.is_u64() => Some(value.clone()),
            ParamType::Int => value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            ParamType::Float if value.is_number() => Some(value.clone()),
            ParamType::Bool if value.is_boolean() => Some(value.clone()),
            ParamType::List if value.is_array() => Some(value.clone()),
            ParamType::Map if value.is_object() => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::List => "list",
            ParamType::Map => "map",
        };
        f.write_str(name)
    }
}

/// JSON type name used in parameter error messages
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Declares one parameter a capability accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterDescriptor {
    /// A parameter that must be supplied
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// A parameter that may be omitted
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    /// Attach a default used when the parameter is absent
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Describes one capability a module exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default = "default_returns")]
    pub returns: String,
    /// The capability only observes state, even if its module can mutate it
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_returns() -> String {
    "Result object".to_string()
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            returns: default_returns(),
            read_only: false,
            examples: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Bind raw plan parameters against this capability's schema.
    ///
    /// `null` values count as absent. Absent parameters with a declared
    /// default receive it; absent required parameters without one fail with
    /// [`EngineError::MissingParameter`]. Values of the wrong type and names
    /// the capability does not declare are rejected.
    pub fn bind(&self, raw: &BTreeMap<String, Value>) -> Result<Params, EngineError> {
        let mut values = BTreeMap::new();

        for parameter in &self.parameters {
            match raw.get(&parameter.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let bound = parameter.param_type.coerce(value).ok_or_else(|| {
                        EngineError::InvalidParameter {
                            name: parameter.name.clone(),
                            expected: parameter.param_type.to_string(),
                            found: json_type_name(value).to_string(),
                        }
                    })?;
                    values.insert(parameter.name.clone(), bound);
                }
                None => match &parameter.default {
                    Some(default) => {
                        values.insert(parameter.name.clone(), default.clone());
                    }
                    None if parameter.required => {
                        return Err(EngineError::MissingParameter(parameter.name.clone()));
                    }
                    None => {}
                },
            }
        }

        if let Some(unexpected) = raw
            .keys()
            .find(|key| !self.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(EngineError::UnexpectedParameter(unexpected.clone()));
        }

        Ok(Params { values })
    }
}

/// Typed parameter bag handed to a module
///
/// Only [`CapabilityDescriptor::bind`] produces a non-empty bag, so every
/// value present has already been checked against its declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    /// Get a parameter as a JSON value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Get a string parameter
    pub fn str(&self, key: &str) -> Result<&str, EngineError> {
        self.typed(key, ParamType::String, Value::as_str)
    }

    /// Get an i64 parameter
    pub fn i64(&self, key: &str) -> Result<i64, EngineError> {
        self.typed(key, ParamType::Int, Value::as_i64)
    }

    /// Get an f64 parameter
    pub fn f64(&self, key: &str) -> Result<f64, EngineError> {
        self.typed(key, ParamType::Float, Value::as_f64)
    }

    /// Get a bool parameter
    pub fn bool(&self, key: &str) -> Result<bool, EngineError> {
        self.typed(key, ParamType::Bool, Value::as_bool)
    }

    /// Get a list parameter
    pub fn list(&self, key: &str) -> Result<&Vec<Value>, EngineError> {
        self.typed(key, ParamType::List, Value::as_array)
    }

    /// Get a map parameter
    pub fn map(&self, key: &str) -> Result<&serde_json::Map<String, Value>, EngineError> {
        self.typed(key, ParamType::Map, Value::as_object)
    }

    /// Get an optional string parameter
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Get an optional i64 parameter
    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    /// Get an optional bool parameter
    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Get an optional list of strings, skipping non-string entries
    pub fn opt_string_list(&self, key: &str) -> Option<Vec<String>> {
        self.values.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: ParamType,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, EngineError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| EngineError::MissingParameter(key.to_string()))?;
        extract(value).ok_or_else(|| EngineError::InvalidParameter {
            name: key.to_string(),
            expected: expected.to_string(),
            found: json_type_name(value).to_string(),
        })
    }
}

/// Output from a module invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl ModuleOutput {
    /// Create a successful output with JSON data
    pub fn json(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Create a failed output
    ///
    /// Modules report ordinary failures (missing files, retrieval misses)
    /// this way instead of returning an error.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Create an empty successful output
    pub fn empty() -> Self {
        Self::json(Value::Null)
    }
}
