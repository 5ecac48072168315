//! Enabling and disabling gems in a project.

use std::path::{Path, PathBuf};

use o3de_manifest::{
    GemCandidate, GemEntry, GemManifest, Manifest, ProjectManifest, Registry, Requirement, Scope,
};

use crate::error::EngineError;
use crate::resolve::{resolve, Resolution, RootRequirement, TargetEngine};

/// Which gem to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GemSelector {
    /// A requirement such as `GemA` or `GemA>=1.2`.
    Name(String),
    /// A gem root directory or its `gem.json`.
    Path(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationOptions {
    pub optional: bool,
    pub force: bool,
    pub dry_run: bool,
}

/// What an enable or disable did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationReport {
    pub gem_name: String,
    /// Whether `project.json` was (or, for a dry run, would be) rewritten.
    pub changed: bool,
    pub warnings: Vec<String>,
    pub resolution: Option<Resolution>,
}

struct ProjectContext {
    project: Manifest<ProjectManifest>,
    engine: TargetEngine,
    catalogue: Vec<GemCandidate>,
}

fn load_context(registry: &Registry, project_path: &Path) -> Result<ProjectContext, EngineError> {
    let project = Manifest::<ProjectManifest>::load(project_path)?;
    registry.check_project_references(&project)?;
    let engine = registry.engine_for_project(&project)?;
    let catalogue = registry.gem_catalogue(&project, Some(&engine));
    Ok(ProjectContext {
        engine: TargetEngine::from_manifest(&engine.data),
        project,
        catalogue,
    })
}

/// Enable a gem in the project at `project_path`.
///
/// The new gem and every gem already enabled are resolved together against
/// the project's engine. On success the entry is appended to `gem_names`
/// (or rewritten when its optional flag changes). With `force` a resolver
/// failure is downgraded to a warning and the entry is written anyway.
///
/// # Errors
/// Returns `GemNotFound` for an unknown gem, `Resolve` when the requirement
/// set cannot be satisfied and `force` is not set, or any manifest error.
pub fn enable_gem(
    registry: &Registry,
    selector: &GemSelector,
    project_path: &Path,
    options: ActivationOptions,
) -> Result<ActivationReport, EngineError> {
    let ProjectContext {
        mut project,
        engine,
        mut catalogue,
    } = load_context(registry, project_path)?;

    let (requirement, requirement_text, added_path) = match selector {
        GemSelector::Name(text) => {
            let requirement: Requirement = text.parse()?;
            if !catalogue.iter().any(|c| c.name == requirement.name) {
                return Err(EngineError::GemNotFound {
                    gem: requirement.name,
                });
            }
            let text = text.trim().to_owned();
            (requirement, text, None)
        }
        GemSelector::Path(path) => {
            let gem = Manifest::<GemManifest>::load(path)?;
            let root = o3de_util::fs::normalize(gem.root());
            let requirement: Requirement = format!("{}=={}", gem.name(), gem.data.parsed_version()).parse()?;
            let reachable = catalogue.iter().any(|c| c.path == root);
            if !reachable {
                catalogue.insert(
                    0,
                    GemCandidate {
                        name: gem.data.gem_name.clone(),
                        version: gem.data.parsed_version(),
                        path: root.clone(),
                        scope: Scope::Project,
                        manifest: gem.data.clone(),
                    },
                );
            }
            let text = gem.data.gem_name.clone();
            (requirement, text, (!reachable).then_some(root))
        }
    };
    let gem_name = requirement.name.clone();

    let mut roots = vec![RootRequirement::new(requirement, options.optional)];
    roots.extend(
        project
            .data
            .gem_names()
            .iter()
            .filter(|e| e.gem_name() != gem_name)
            .map(|e| RootRequirement::new(e.requirement(), e.is_optional())),
    );

    let mut report = ActivationReport {
        gem_name: gem_name.clone(),
        ..ActivationReport::default()
    };
    match resolve(&roots, &catalogue, &engine, options.force) {
        Ok(resolution) => {
            report.warnings.extend(resolution.warnings.iter().cloned());
            report.resolution = Some(resolution);
        }
        Err(e) if options.force => {
            report.warnings.push(format!("{e}; enabled anyway because of --force"));
        }
        Err(e) => return Err(e.into()),
    }
    for warning in &report.warnings {
        tracing::warn!(gem = %gem_name, "{warning}");
    }

    let entry = GemEntry::new(&requirement_text, options.optional);
    let entries = project.data.gem_names.get_or_insert_with(Vec::new);
    match entries.iter().position(|e| e.gem_name() == gem_name) {
        Some(idx) => {
            let unchanged = entries.get(idx).is_some_and(|e| {
                e.is_optional() == options.optional && e.requirement_text() == requirement_text
            });
            if !unchanged {
                if let Some(slot) = entries.get_mut(idx) {
                    *slot = entry;
                }
                report.changed = true;
            }
        }
        None => {
            entries.push(entry);
            report.changed = true;
        }
    }
    if let Some(path) = added_path {
        let stored = path.display().to_string();
        let subdirs = project.data.external_subdirectories.get_or_insert_with(Vec::new);
        if !subdirs.contains(&stored) {
            subdirs.push(stored);
            report.changed = true;
        }
    }

    if !report.changed {
        tracing::info!(gem = %gem_name, project = project.name(), "gem already enabled");
        return Ok(report);
    }
    if options.dry_run {
        tracing::info!(gem = %gem_name, project = project.name(), "dry run; project.json not written");
        return Ok(report);
    }
    project.save()?;
    tracing::info!(gem = %gem_name, project = project.name(), "gem enabled");
    Ok(report)
}

/// Disable a gem in the project at `project_path`.
///
/// Disabling a gem that is not enabled is a no-op.
///
/// # Errors
/// Returns `GemRequired` when other enabled gems depend on it and `force`
/// is not set, or any manifest error.
pub fn disable_gem(
    registry: &Registry,
    gem_name: &str,
    project_path: &Path,
    options: ActivationOptions,
) -> Result<ActivationReport, EngineError> {
    let ProjectContext {
        mut project,
        catalogue,
        ..
    } = load_context(registry, project_path)?;
    let gem_name = gem_name
        .parse::<Requirement>()
        .map_or_else(|_| gem_name.trim().to_owned(), |r| r.name);
    let mut report = ActivationReport {
        gem_name: gem_name.clone(),
        ..ActivationReport::default()
    };

    let Some(idx) = project.data.find_gem(&gem_name) else {
        tracing::warn!(gem = %gem_name, project = project.name(), "gem is not enabled");
        return Ok(report);
    };

    let dependents = enabled_dependents(&project.data, &catalogue, &gem_name);
    if !dependents.is_empty() {
        let listed = dependents.join(", ");
        if !options.force {
            return Err(EngineError::GemRequired {
                gem: gem_name,
                dependents: listed,
            });
        }
        let warning = format!("`{gem_name}` is still required by {listed}");
        tracing::warn!("{warning}; disabling anyway because of --force");
        report.warnings.push(warning);
    }

    if let Some(entries) = project.data.gem_names.as_mut() {
        if idx < entries.len() {
            entries.remove(idx);
        }
    }
    report.changed = true;
    if !options.dry_run {
        project.save()?;
        tracing::info!(gem = %gem_name, project = project.name(), "gem disabled");
    }
    Ok(report)
}

/// Enabled, non-optional gems whose newest reachable manifest depends on `gem_name`.
fn enabled_dependents(project: &ProjectManifest, catalogue: &[GemCandidate], gem_name: &str) -> Vec<String> {
    project
        .gem_names()
        .iter()
        .filter(|e| !e.is_optional() && e.gem_name() != gem_name)
        .filter(|e| {
            let req = e.requirement();
            catalogue
                .iter()
                .filter(|c| req.matches(&c.name, &c.version))
                .max_by(|a, b| a.version.cmp(&b.version).then(b.scope.cmp(&a.scope)))
                .is_some_and(|c| c.manifest.dependencies().iter().any(|d| d.name == gem_name))
        })
        .map(GemEntry::gem_name)
        .collect()
}
