//! Forward model provider port.

use crate::domain::models::JobDescriptor;

/// A source of forward model jobs. Providers are registered explicitly with
/// a `ForwardModelRegistry`; nothing is discovered at runtime.
pub trait ForwardModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn forward_models(&self) -> Vec<JobDescriptor>;
}
