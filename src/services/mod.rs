//! Pure services: configuration validation, translation into the engine
//! contract and the forward model registry.

pub mod forward_model_registry;
pub mod translator;
pub mod validation;

pub use forward_model_registry::{BuiltinJobs, ForwardModelRegistry, InstalledJobs};
pub use translator::{build_engine_request, translate, translate_simulation};
pub use validation::{validate, validate_str, ConfigValidator};
