pub mod config;
pub mod engine;
pub mod forward_model;
pub mod identity;
pub mod optimization;
pub mod status;

pub use config::{LoggingConfig, Settings};
pub use engine::{
    CvarParameters, EngineEvent, EngineOutcome, EngineRequest, EventKind, ForwardModelStep,
    JobEvent, LaunchPayload, NormalizedEngineConfig, ObjectiveFunctions, SimulationSpec,
    Variables,
};
pub use forward_model::JobDescriptor;
pub use identity::JobIdentity;
pub use optimization::{
    ControlSpec, CvarSelection, CvarSpec, InstallJobSpec, ObjectiveSpec, OptimizationConfig,
    OptimizerSpec, RawOptimizationConfig,
};
pub use status::{JobStatus, StatusRecord};
