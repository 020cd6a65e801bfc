//! Forward model registry.
//!
//! Jobs come from an explicit list of providers handed in at construction.
//! Later providers shadow earlier ones, so jobs installed by a configuration
//! override built-ins of the same name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::models::{InstallJobSpec, JobDescriptor};
use crate::domain::ports::ForwardModelProvider;

/// Helper jobs shipped with the tool.
pub const BUILTIN_JOBS: &[&str] = &[
    "careful_copy_file",
    "copy_directory",
    "copy_file",
    "delete_directory",
    "delete_file",
    "make_directory",
    "make_symlink",
    "move_file",
    "recovery_factor",
    "render",
    "symlink",
];

/// Provider for [`BUILTIN_JOBS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinJobs;

impl ForwardModelProvider for BuiltinJobs {
    fn name(&self) -> &str {
        "builtin"
    }

    fn forward_models(&self) -> Vec<JobDescriptor> {
        BUILTIN_JOBS.iter().map(|name| JobDescriptor::builtin(name)).collect()
    }
}

/// Provider for the `install_jobs` section of a configuration.
#[derive(Debug, Clone, Default)]
pub struct InstalledJobs {
    jobs: Vec<JobDescriptor>,
}

impl InstalledJobs {
    /// Installed jobs declared under `install_jobs`.
    pub fn from_specs(specs: &[InstallJobSpec]) -> Self {
        Self {
            jobs: specs
                .iter()
                .map(|spec| JobDescriptor::installed(spec.name.clone(), spec.executable.clone()))
                .collect(),
        }
    }
}

impl ForwardModelProvider for InstalledJobs {
    fn name(&self) -> &str {
        "install_jobs"
    }

    fn forward_models(&self) -> Vec<JobDescriptor> {
        self.jobs.clone()
    }
}

/// Registry of forward model jobs available to a configuration.
#[derive(Clone, Default)]
pub struct ForwardModelRegistry {
    providers: Vec<Arc<dyn ForwardModelProvider>>,
}

impl ForwardModelRegistry {
    /// Registry over `providers`, searched in order.
    pub fn new(providers: Vec<Arc<dyn ForwardModelProvider>>) -> Self {
        Self { providers }
    }

    /// Registry with only the built-in jobs.
    pub fn with_builtins() -> Self {
        Self::new(vec![Arc::new(BuiltinJobs)])
    }

    /// Built-ins plus the jobs a configuration installs.
    pub fn for_install_jobs(specs: &[InstallJobSpec]) -> Self {
        Self::with_builtins().with_provider(Arc::new(InstalledJobs::from_specs(specs)))
    }

    /// Append a provider, searched after the existing ones.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ForwardModelProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Every available job, one per name, sorted by name.
    pub fn list_available_jobs(&self) -> Vec<JobDescriptor> {
        let mut by_name = BTreeMap::new();
        for provider in &self.providers {
            for job in provider.forward_models() {
                by_name.insert(job.name.clone(), job);
            }
        }
        by_name.into_values().collect()
    }

    /// Look up a job by name.
    pub fn resolve(&self, name: &str) -> Option<JobDescriptor> {
        self.providers
            .iter()
            .rev()
            .find_map(|provider| provider.forward_models().into_iter().find(|job| job.name == name))
    }

    /// Whether `name` is one of the built-in helper jobs.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|job| job.builtin)
    }
}

impl std::fmt::Debug for ForwardModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardModelRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Split a forward model step into job name and arguments.
pub fn parse_step(step: &str) -> Option<(&str, Vec<String>)> {
    let mut parts = step.split_whitespace();
    let name = parts.next()?;
    Some((name, parts.map(str::to_string).collect()))
}
