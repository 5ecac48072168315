//! Gem activation, dependency resolution, template instantiation, and project
//! export for O3DE projects.

pub mod activate;
pub mod error;
pub mod export;
pub mod resolve;
pub mod template;

pub use activate::{disable_gem, enable_gem, ActivationOptions, ActivationReport, GemSelector};
pub use error::EngineError;
pub use export::{export_project, ExportOptions, ExportOutcome, ExportRequest, HostToolchain};
pub use resolve::{resolve, Resolution, ResolveError, ResolvedGem, RootRequirement, TargetEngine};
pub use template::{instantiate, TemplateRequest};
