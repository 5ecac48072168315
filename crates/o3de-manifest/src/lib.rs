#![forbid(unsafe_code)]
//! Engine, project, gem, template, and repo manifests, the user manifest, and
//! the version model used to relate them.

pub mod document;
pub mod engine;
pub mod error;
pub mod gem;
pub mod project;
pub mod registry;
pub mod repo;
pub mod template;
pub mod user;
pub mod version;

pub use document::{Document, Manifest, ObjectKind};
pub use engine::EngineManifest;
pub use error::ManifestError;
pub use gem::GemManifest;
pub use project::{GemEntry, ProjectManifest};
pub use registry::{GemCandidate, Registry, Scope};
pub use repo::RepoManifest;
pub use template::TemplateManifest;
pub use user::UserManifest;
pub use version::{Requirement, Specifier, Version};
