//! Conductor SDK
//!
//! Shared library providing the module contract, capability schema types and
//! the error taxonomy. This crate is used by the engine and by anything that
//! implements a capability module.

/// Module trait and invocation context
pub mod module;

/// Error types and handling
pub mod errors;

/// Capability schema and invocation types
pub mod types;

// Re-export commonly used types
pub use errors::{ConductorErrorExt, EngineError, ErrorKind};
pub use module::{InvocationContext, Module};
pub use types::{CapabilityDescriptor, ModuleOutput, ParamType, ParameterDescriptor, Params};
