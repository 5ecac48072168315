#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use o3de_config::{ConfigStore, SettingsDescription, Severity, TerminalPrompt};
use o3de_engine::export::paths::{extract_cmake_custom_args, CustomCmakeArgs};
use o3de_engine::export::settings as export_settings;
use o3de_engine::{ActivationOptions, ExportOptions, ExportRequest, GemSelector, HostToolchain, TemplateRequest};
use o3de_manifest::{Manifest, ObjectKind, ProjectManifest, Registry};
use o3de_targets::Platform;
use o3de_tiaf::{RuntimeType, SequenceType, StorageBackend, TiaRequest};
use o3de_util::process::CancelToken;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "o3de", about = "Manage O3DE engines, projects, and gems")]
#[command(version)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register an engine, project, gem, template, or repo
    Register {
        #[command(flatten)]
        target: RegisterTarget,
    },
    /// Remove a registration
    Unregister {
        #[command(flatten)]
        target: RegisterTarget,
    },
    /// Print the path registered under a name
    GetRegistered {
        /// Name of the registered object
        name: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Also search this engine's registrations
        #[arg(long)]
        engine_path: Option<PathBuf>,
        /// Also search this project's registrations
        #[arg(long)]
        project_path: Option<PathBuf>,
    },
    /// List every registration in the user manifest
    ListRegistrations {
        /// Only list this kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
    /// Enable a gem in a project
    EnableGem {
        /// Gem name with an optional version specifier, e.g. `GemA>=1.2`
        #[arg(long, required_unless_present = "gem_path")]
        gem_name: Option<String>,
        /// Gem root directory
        #[arg(long, conflicts_with = "gem_name")]
        gem_path: Option<PathBuf>,
        #[arg(long)]
        project_path: PathBuf,
        /// Write the entry even when dependencies cannot be resolved
        #[arg(long)]
        force: bool,
        /// Resolve and report without writing project.json
        #[arg(long)]
        dry_run: bool,
        /// Mark the gem optional
        #[arg(long)]
        optional: bool,
    },
    /// Disable a gem in a project
    DisableGem {
        #[arg(long)]
        gem_name: String,
        #[arg(long)]
        project_path: PathBuf,
        /// Disable even when other enabled gems depend on it
        #[arg(long)]
        force: bool,
    },
    /// Create an engine from a template
    EngineCreate(CreateArgs),
    /// Create a project from a template
    ProjectCreate(CreateArgs),
    /// Create a gem from a template
    GemCreate(CreateArgs),
    /// Build, bundle, and lay out a project for release
    ExportProject(Box<ExportArgs>),
    /// View or change the export settings
    ExportProjectConfigure(ConfigureArgs),
    /// Android tooling
    Android {
        #[command(subcommand)]
        action: AndroidAction,
    },
    /// Run tests selected by impact analysis
    Tiaf(Box<TiafArgs>),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct RegisterTarget {
    #[arg(long)]
    engine_path: Option<PathBuf>,
    #[arg(long)]
    project_path: Option<PathBuf>,
    #[arg(long)]
    gem_path: Option<PathBuf>,
    #[arg(long)]
    template_path: Option<PathBuf>,
    #[arg(long)]
    repo_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Engine,
    Project,
    Gem,
    Template,
    Repo,
}

impl From<KindArg> for ObjectKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Engine => Self::Engine,
            KindArg::Project => Self::Project,
            KindArg::Gem => Self::Gem,
            KindArg::Template => Self::Template,
            KindArg::Repo => Self::Repo,
        }
    }
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Destination directory
    #[arg(long, visible_aliases = ["engine-path", "project-path", "gem-path"])]
    path: PathBuf,
    /// Name of the new object (defaults to the destination folder name)
    #[arg(long, visible_aliases = ["engine-name", "project-name", "gem-name"])]
    name: Option<String>,
    /// Template directory (defaults to the built-in template)
    #[arg(long)]
    template_path: Option<PathBuf>,
    /// Extra text substitutions as FROM=TO
    #[arg(long = "replace", value_name = "FROM=TO")]
    replacements: Vec<String>,
    /// Write into a non-empty destination
    #[arg(long)]
    force: bool,
    /// Do not register the new object
    #[arg(long)]
    no_register: bool,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Project to export (defaults to the current directory)
    #[arg(long)]
    project_path: Option<PathBuf>,
    /// Engine to build with (defaults to the project's engine)
    #[arg(long)]
    engine_path: Option<PathBuf>,
    /// Target platform (defaults to the host)
    #[arg(long)]
    platform: Option<String>,
    /// Launcher build configuration
    #[arg(long)]
    config: Option<String>,
    /// Asset tool build configuration
    #[arg(long)]
    tool_config: Option<String>,
    /// Archive each layout: none, zip, gzip, bz2, or xz
    #[arg(long)]
    archive_output: Option<String>,
    /// Process assets before bundling
    #[arg(long, conflicts_with = "skip_build_assets")]
    build_assets: bool,
    #[arg(long)]
    skip_build_assets: bool,
    /// Stop when asset processing reports errors
    #[arg(long)]
    fail_on_asset_errors: bool,
    /// Use the asset tools already in the tools build folder
    #[arg(long)]
    skip_build_tools: bool,
    #[arg(long = "seedlist", value_name = "PATH")]
    seedlists: Vec<PathBuf>,
    #[arg(long = "seedfile", value_name = "PATH")]
    seedfiles: Vec<PathBuf>,
    /// Level to bundle, by name
    #[arg(long = "level-name", value_name = "NAME")]
    level_names: Vec<String>,
    #[arg(long)]
    tools_build_path: Option<PathBuf>,
    #[arg(long)]
    launcher_build_path: Option<PathBuf>,
    #[arg(long)]
    asset_bundling_path: Option<PathBuf>,
    #[arg(long)]
    output_path: Option<PathBuf>,
    #[arg(long)]
    android_build_path: Option<PathBuf>,
    /// Maximum bundle size in megabytes
    #[arg(long)]
    max_bundle_size: Option<u32>,
    #[arg(long)]
    no_game_launcher: bool,
    #[arg(long)]
    no_server_launcher: bool,
    #[arg(long)]
    no_unified_launcher: bool,
    #[arg(long)]
    headless_server_launcher: bool,
    /// Configure the engine with the project instead of the project alone
    #[arg(long)]
    engine_centric: bool,
    /// Link launchers against shared engine libraries
    #[arg(long)]
    no_monolithic: bool,
    #[arg(long)]
    allow_registry_overrides: bool,
    /// Install the APK on a connected device (Android only)
    #[arg(long)]
    deploy: bool,
    /// Empty every output folder first
    #[arg(long)]
    clean: bool,
    /// Override a setting for this run only
    #[arg(long = "set-value", value_name = "KEY=VALUE")]
    set_values: Vec<String>,
}

impl ExportArgs {
    /// The flags as `export_project` setting overrides, after `--set-value`.
    fn overrides(&self) -> Vec<String> {
        use export_settings as s;

        let mut out = self.set_values.clone();
        let mut set = |key: &str, value: String| out.push(format!("{key}={value}"));
        let joined = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(";")
        };

        let values = [
            (s::PROJECT_BUILD_CONFIG, self.config.clone()),
            (s::TOOL_BUILD_CONFIG, self.tool_config.clone()),
            (s::ARCHIVE_OUTPUT_FORMAT, self.archive_output.clone()),
            (s::MAX_SIZE, self.max_bundle_size.map(|n| n.to_string())),
            (s::DEFAULT_BUILD_TOOLS_PATH, display(self.tools_build_path.as_deref())),
            (s::DEFAULT_LAUNCHER_BUILD_PATH, display(self.launcher_build_path.as_deref())),
            (s::ASSET_BUNDLING_PATH, display(self.asset_bundling_path.as_deref())),
            (s::DEFAULT_OUTPUT_PATH, display(self.output_path.as_deref())),
            (s::DEFAULT_ANDROID_BUILD_PATH, display(self.android_build_path.as_deref())),
        ];
        for (key, value) in values {
            if let Some(value) = value {
                set(key, value);
            }
        }
        if !self.seedlists.is_empty() {
            set(s::SEEDLIST_PATHS, joined(&self.seedlists));
        }
        if !self.seedfiles.is_empty() {
            set(s::SEEDFILE_PATHS, joined(&self.seedfiles));
        }
        if !self.level_names.is_empty() {
            set(s::DEFAULT_LEVEL_NAMES, self.level_names.join(";"));
        }

        let flags = [
            (s::OPTION_BUILD_ASSETS, self.build_assets, "true"),
            (s::OPTION_BUILD_ASSETS, self.skip_build_assets, "false"),
            (s::OPTION_FAIL_ON_ASSET_ERRORS, self.fail_on_asset_errors, "true"),
            (s::OPTION_BUILD_TOOLS, self.skip_build_tools, "false"),
            (s::OPTION_BUILD_GAME_LAUNCHER, self.no_game_launcher, "false"),
            (s::OPTION_BUILD_SERVER_LAUNCHER, self.no_server_launcher, "false"),
            (s::OPTION_BUILD_UNIFIED_LAUNCHER, self.no_unified_launcher, "false"),
            (s::OPTION_BUILD_HEADLESS_SERVER_LAUNCHER, self.headless_server_launcher, "true"),
            (s::OPTION_ENGINE_CENTRIC, self.engine_centric, "true"),
            (s::OPTION_BUILD_MONOLITHIC, self.no_monolithic, "false"),
            (s::OPTION_ALLOW_REGISTRY_OVERRIDES, self.allow_registry_overrides, "true"),
            (s::OPTION_ANDROID_DEPLOY, self.deploy, "true"),
        ];
        for (key, given, value) in flags {
            if given {
                set(key, value.to_owned());
            }
        }
        out
    }
}

fn display(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

#[derive(Debug, Args)]
struct ConfigureArgs {
    /// Use the global settings instead of a project's
    #[arg(long, conflicts_with = "project")]
    global: bool,
    /// Project whose settings to use (defaults to the current directory
    /// when it holds a project.json)
    #[arg(long)]
    project: Option<PathBuf>,
    /// Store KEY=VALUE
    #[arg(long = "set-value", value_name = "KEY=VALUE")]
    set_values: Vec<String>,
    /// Prompt for a password and store it in the system vault
    #[arg(long = "set-password", value_name = "KEY")]
    set_passwords: Vec<String>,
    /// Remove a stored value
    #[arg(long = "clear-value", value_name = "KEY")]
    clear_values: Vec<String>,
    /// Print every setting with its source
    #[arg(long)]
    list: bool,
    /// Check the stored settings (and for Android, the host tools)
    #[arg(long)]
    validate: bool,
}

#[derive(Debug, Subcommand)]
enum AndroidAction {
    /// View or change the Android settings
    Configure(ConfigureArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SequenceArg {
    Regular,
    Seed,
    Tia,
    Tianowrite,
}

impl From<SequenceArg> for SequenceType {
    fn from(sequence: SequenceArg) -> Self {
        match sequence {
            SequenceArg::Regular => Self::Regular,
            SequenceArg::Seed => Self::Seed,
            SequenceArg::Tia => Self::Tia,
            SequenceArg::Tianowrite => Self::TiaNoWrite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageArg {
    Local,
    S3,
}

#[derive(Debug, Args)]
struct TiafArgs {
    /// Runtime configuration written by the build
    #[arg(long)]
    config: PathBuf,
    /// Repository checkout to diff in
    #[arg(long, default_value = ".")]
    repo: PathBuf,
    #[arg(long)]
    src_branch: String,
    /// Target branch of a pull request; empty for branch builds
    #[arg(long, default_value = "")]
    dst_branch: String,
    #[arg(long)]
    commit: String,
    /// native or python
    #[arg(long, default_value = "native")]
    runtime_type: RuntimeType,
    #[arg(long = "suite", required = true)]
    suites: Vec<String>,
    #[arg(long = "label-exclude")]
    label_excludes: Vec<String>,
    /// File listing tests to exclude
    #[arg(long)]
    exclude_file: Option<PathBuf>,
    /// Force a sequence instead of choosing one
    #[arg(long, value_enum)]
    sequence: Option<SequenceArg>,
    /// Storage backend (defaults to s3 when s3.bucket is set)
    #[arg(long, value_enum)]
    storage: Option<StorageArg>,
    /// Write the result here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Override a setting for this run only
    #[arg(long = "set-value", value_name = "KEY=VALUE")]
    set_values: Vec<String>,
}

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let custom = match extract_cmake_custom_args(&argv) {
        Ok(custom) => custom,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    let cli = Cli::parse_from(&custom.remaining);
    init_tracing(cli.debug);

    let result = match cli.command {
        Command::ExportProject(args) => cmd_export_project(&args, &custom),
        _ if !custom.configure.is_empty() || !custom.build.is_empty() => {
            Err("custom CMake arguments are only accepted by export-project".into())
        }
        Command::Register { target } => cmd_register(&target, false),
        Command::Unregister { target } => cmd_register(&target, true),
        Command::GetRegistered {
            name,
            kind,
            engine_path,
            project_path,
        } => cmd_get_registered(&name, kind.into(), engine_path.as_deref(), project_path.as_deref()),
        Command::ListRegistrations { kind } => cmd_list_registrations(kind.map(Into::into)),
        Command::EnableGem {
            gem_name,
            gem_path,
            project_path,
            force,
            dry_run,
            optional,
        } => cmd_enable_gem(
            gem_name,
            gem_path.as_deref(),
            &project_path,
            ActivationOptions {
                optional,
                force,
                dry_run,
            },
        ),
        Command::DisableGem {
            gem_name,
            project_path,
            force,
        } => cmd_disable_gem(&gem_name, &project_path, force),
        Command::EngineCreate(args) => cmd_create(ObjectKind::Engine, &args),
        Command::ProjectCreate(args) => cmd_create(ObjectKind::Project, &args),
        Command::GemCreate(args) => cmd_create(ObjectKind::Gem, &args),
        Command::ExportProjectConfigure(args) => cmd_configure(export_settings::TOOL, export_settings::EXPORT_SETTINGS, &args),
        Command::Android {
            action: AndroidAction::Configure(args),
        } => cmd_android_configure(&args),
        Command::Tiaf(args) => cmd_tiaf(&args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(exit_code(err.as_ref()));
    }
}

/// Log to stderr. `RUST_LOG` picks the filter unless `--debug` is given.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

/// Resolver failures exit 2 and failed child tools pass their code through.
fn exit_code(err: &(dyn Error + 'static)) -> i32 {
    if let Some(e) = err.downcast_ref::<o3de_engine::EngineError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<o3de_android::AndroidError>() {
        return e.exit_code();
    }
    1
}

/// A token cancelled by Ctrl-C.
fn interrupt_token() -> CancelToken {
    let token = CancelToken::new();
    let handler = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        tracing::warn!(error = %e, "cannot install the interrupt handler");
    }
    token
}

fn cmd_register(target: &RegisterTarget, remove: bool) -> CliResult {
    let mut registry = Registry::open_default()?;
    let verb = if remove { "Unregistered" } else { "Registered" };
    if let Some(uri) = &target.repo_uri {
        registry.register_repo(uri, remove)?;
        eprintln!("    {verb} repo {uri}");
        return Ok(());
    }
    let (kind, path) = [
        (ObjectKind::Engine, &target.engine_path),
        (ObjectKind::Project, &target.project_path),
        (ObjectKind::Gem, &target.gem_path),
        (ObjectKind::Template, &target.template_path),
    ]
    .into_iter()
    .find_map(|(kind, path)| path.as_ref().map(|p| (kind, p)))
    .ok_or("one of --engine-path, --project-path, --gem-path, --template-path or --repo-uri is required")?;
    let path = absolute(path)?;
    let recorded = registry.register_path(kind, &path, remove)?;
    eprintln!("    {verb} {kind} {}", recorded.display());
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    Ok(o3de_util::fs::resolve_against(&std::env::current_dir()?, path))
}

fn cmd_get_registered(
    name: &str,
    kind: ObjectKind,
    engine_path: Option<&Path>,
    project_path: Option<&Path>,
) -> CliResult {
    let registry = Registry::open_default()?;
    match registry.get_registered(name, kind, engine_path, project_path)? {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(o3de_manifest::ManifestError::UnknownRegistered {
            kind: kind.to_string(),
            name: name.to_owned(),
        }
        .into()),
    }
}

fn cmd_list_registrations(kind: Option<ObjectKind>) -> CliResult {
    let registry = Registry::open_default()?;
    let kinds: Vec<ObjectKind> = match kind {
        Some(kind) => vec![kind],
        None => ObjectKind::ALL.to_vec(),
    };
    for kind in kinds {
        let entries = registry.registrations(kind);
        println!("{}:", kind.plural());
        if entries.is_empty() {
            println!("  (none)");
        }
        for (path, exists) in entries {
            if exists {
                println!("  {path}");
            } else {
                println!("  {path} (missing)");
            }
        }
    }
    Ok(())
}

fn cmd_enable_gem(
    gem_name: Option<String>,
    gem_path: Option<&Path>,
    project_path: &Path,
    options: ActivationOptions,
) -> CliResult {
    let registry = Registry::open_default()?;
    let selector = match (gem_name, gem_path) {
        (_, Some(path)) => GemSelector::Path(absolute(path)?),
        (Some(name), None) => GemSelector::Name(name),
        (None, None) => return Err("either --gem-name or --gem-path is required".into()),
    };
    let report = o3de_engine::enable_gem(&registry, &selector, &absolute(project_path)?, options)?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(resolution) = report.resolution.as_ref().filter(|_| options.dry_run) {
        for gem in resolution.gems.values() {
            eprintln!("    Resolved {} {} ({})", gem.name, gem.version, gem.path.display());
        }
        for dropped in &resolution.dropped {
            eprintln!("     Dropped optional {dropped}");
        }
    }
    match (report.changed, options.dry_run) {
        (true, true) => eprintln!("    Would enable gem `{}`", report.gem_name),
        (true, false) => eprintln!("     Enabled gem `{}`", report.gem_name),
        (false, _) => eprintln!("    Gem `{}` is already enabled", report.gem_name),
    }
    Ok(())
}

fn cmd_disable_gem(gem_name: &str, project_path: &Path, force: bool) -> CliResult {
    let registry = Registry::open_default()?;
    let options = ActivationOptions {
        force,
        ..ActivationOptions::default()
    };
    let report = o3de_engine::disable_gem(&registry, gem_name, &absolute(project_path)?, options)?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if report.changed {
        eprintln!("    Disabled gem `{}`", report.gem_name);
    } else {
        eprintln!("    Gem `{}` is not enabled", report.gem_name);
    }
    Ok(())
}

fn cmd_create(kind: ObjectKind, args: &CreateArgs) -> CliResult {
    let destination = absolute(&args.path)?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => destination
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("cannot derive a name from the destination; pass --name")?
            .to_owned(),
    };
    let mut request = TemplateRequest::new(kind, &name, &destination);
    request.template = args.template_path.as_deref().map(absolute).transpose()?;
    request.force = args.force;
    request.register = !args.no_register;
    for pair in &args.replacements {
        let (from, to) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid replacement `{pair}`; expected FROM=TO"))?;
        request.replacements.push((from.to_owned(), to.to_owned()));
    }

    let mut registry = Registry::open_default()?;
    let created = o3de_engine::instantiate(&mut registry, &request)?;
    eprintln!("     Created {kind} `{name}` at {}", created.display());
    Ok(())
}

fn cmd_export_project(args: &ExportArgs, custom: &CustomCmakeArgs) -> CliResult {
    let project_path = match &args.project_path {
        Some(path) => absolute(path)?,
        None => std::env::current_dir()?,
    };
    let registry = Registry::open_default()?;
    let project = Manifest::<ProjectManifest>::load(&project_path)?;
    let engine_path = match &args.engine_path {
        Some(path) => absolute(path)?,
        None => registry.engine_for_project(&project)?.root().to_path_buf(),
    };

    let home = o3de_util::fs::o3de_home()?;
    let mut config = ConfigStore::open(
        export_settings::TOOL,
        export_settings::EXPORT_SETTINGS,
        &home,
        Some(&project_path),
    )?;
    config.apply_overrides(&args.overrides())?;
    let mut options = ExportOptions::from_config(&config)?;
    options.configure_args.clone_from(&custom.configure);
    options.build_args.clone_from(&custom.build);
    options.clean = args.clean;

    let toolchain = HostToolchain::detect()?;
    let platform = match &args.platform {
        Some(name) => name.parse::<Platform>()?,
        None => toolchain.host,
    };
    let android = if platform == Platform::Android {
        Some(ConfigStore::open(
            o3de_android::settings::TOOL,
            o3de_android::ANDROID_SETTINGS,
            &home,
            Some(&project_path),
        )?)
    } else {
        None
    };

    let request = ExportRequest {
        project_name: project.name().to_owned(),
        project_path,
        engine_path,
        platform,
        options,
    };
    let outcome = o3de_engine::export_project(&request, &toolchain, android.as_ref(), &interrupt_token())?;

    eprintln!(
        "    Finished exporting `{}` for {platform} in {:.2}s",
        request.project_name,
        outcome.duration.as_secs_f64()
    );
    for layout in &outcome.layouts {
        eprintln!("      Layout {}", layout.display());
    }
    for archive in &outcome.archives {
        eprintln!("     Archive {}", archive.display());
    }
    if let Some(apk_dir) = &outcome.apk_dir {
        eprintln!("        APKs {}", apk_dir.display());
    }
    Ok(())
}

/// The project layer for a configure command: `--project`, else the current
/// directory when it is a project, unless `--global` was given.
fn configure_project(args: &ConfigureArgs) -> Result<Option<PathBuf>, Box<dyn Error>> {
    if args.global {
        return Ok(None);
    }
    if let Some(project) = &args.project {
        return Ok(Some(absolute(project)?));
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(ObjectKind::Project.file_name()).is_file().then_some(cwd))
}

fn open_configured(
    tool: &str,
    catalogue: &'static [SettingsDescription],
    args: &ConfigureArgs,
) -> Result<ConfigStore, Box<dyn Error>> {
    let project = configure_project(args)?;
    let mut store = ConfigStore::open(tool, catalogue, &o3de_util::fs::o3de_home()?, project.as_deref())?;

    for expression in &args.set_values {
        store.set_config_value_from_expression(expression)?;
    }
    for key in &args.set_passwords {
        store.set_password(key, &mut TerminalPrompt)?;
    }
    for key in &args.clear_values {
        store.clear_value(key)?;
    }
    let changes = args.set_values.len() + args.set_passwords.len() + args.clear_values.len();
    if changes > 0 {
        eprintln!("     Updated {changes} setting(s) in {}", store.write_path().display());
    }
    if args.list {
        for setting in store.get_all_values() {
            let value = setting.value.as_deref().unwrap_or("");
            println!("{} = {value}  ({})", setting.key, setting.layer);
        }
    }
    Ok(store)
}

/// Print validation issues; returns how many were errors.
fn report_issues(store: &ConfigStore) -> usize {
    let issues = store.validate();
    for issue in &issues {
        let tag = match issue.severity {
            Severity::Warning => "[--]",
            Severity::Error => "[!!]",
        };
        eprintln!("  {tag} {}: {}", issue.key, issue.message);
    }
    issues.iter().filter(|i| i.severity == Severity::Error).count()
}

fn cmd_configure(tool: &str, catalogue: &'static [SettingsDescription], args: &ConfigureArgs) -> CliResult {
    let store = open_configured(tool, catalogue, args)?;
    if args.validate {
        let errors = report_issues(&store);
        if errors > 0 {
            return Err(format!("{errors} invalid setting(s)").into());
        }
        eprintln!("All settings are valid");
    }
    Ok(())
}

fn cmd_android_configure(args: &ConfigureArgs) -> CliResult {
    let store = open_configured(o3de_android::settings::TOOL, o3de_android::ANDROID_SETTINGS, args)?;
    if !args.validate {
        return Ok(());
    }
    eprintln!("Checking Android host tools...");
    eprintln!();
    let checks = o3de_android::check_host(&store);
    for check in &checks {
        eprintln!("{check}");
    }
    let errors = report_issues(&store);
    eprintln!();
    if !o3de_android::all_passed(&checks) || errors > 0 {
        return Err("the Android host is not ready; fix the [!!] items above".into());
    }
    eprintln!("All checks passed");
    Ok(())
}

fn cmd_tiaf(args: &TiafArgs) -> CliResult {
    let repo = absolute(&args.repo)?;
    let mut config = ConfigStore::open(
        o3de_tiaf::settings::TOOL,
        o3de_tiaf::TIAF_SETTINGS,
        &o3de_util::fs::o3de_home()?,
        Some(&repo),
    )?;
    config.apply_overrides(&args.set_values)?;

    let request = TiaRequest {
        config_path: absolute(&args.config)?,
        repo,
        src_branch: args.src_branch.clone(),
        dst_branch: args.dst_branch.clone(),
        dst_commit: args.commit.clone(),
        runtime_type: args.runtime_type,
        suites: args.suites.clone(),
        label_excludes: args.label_excludes.clone(),
        excluded_tests: args.exclude_file.as_deref().map(absolute).transpose()?,
        sequence_override: args.sequence.map(Into::into),
        storage: args.storage.map(|s| match s {
            StorageArg::Local => StorageBackend::Local,
            StorageArg::S3 => StorageBackend::ObjectStore,
        }),
    };
    let result = o3de_tiaf::run_tiaf(&request, &config, &interrupt_token())?;
    if let Some(text) = result.write(args.output.as_deref())? {
        print!("{text}");
    }

    eprintln!(
        "    Finished {} sequence ({} mismatched test(s))",
        result.sequence, result.mismatched_tests_count
    );
    match result.runtime_return_code {
        Some(0) | None => Ok(()),
        Some(code) => process::exit(code),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    // ── Subcommand parsing ─────────────────────────────────────────

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_register_gem() {
        let cli = Cli::try_parse_from(["o3de", "register", "--gem-path", "Gems/A"]).unwrap();
        match cli.command {
            Command::Register { target } => {
                assert_eq!(target.gem_path, Some(PathBuf::from("Gems/A")));
                assert!(target.engine_path.is_none());
            }
            other => panic!("expected Register, got {other:?}"),
        }
    }

    #[test]
    fn parse_get_registered() {
        let cli = Cli::try_parse_from(["o3de", "get-registered", "MyGame", "--kind", "project"]).unwrap();
        match cli.command {
            Command::GetRegistered { name, kind, .. } => {
                assert_eq!(name, "MyGame");
                assert_eq!(ObjectKind::from(kind), ObjectKind::Project);
            }
            other => panic!("expected GetRegistered, got {other:?}"),
        }
    }

    #[test]
    fn parse_enable_gem_flags() {
        let cli = Cli::try_parse_from([
            "o3de",
            "enable-gem",
            "--gem-name",
            "GemA>=1.2",
            "--project-path",
            "MyGame",
            "--dry-run",
            "--optional",
        ])
        .unwrap();
        match cli.command {
            Command::EnableGem {
                gem_name,
                gem_path,
                dry_run,
                optional,
                force,
                ..
            } => {
                assert_eq!(gem_name.as_deref(), Some("GemA>=1.2"));
                assert!(gem_path.is_none());
                assert!(dry_run && optional && !force);
            }
            other => panic!("expected EnableGem, got {other:?}"),
        }
    }

    #[test]
    fn parse_create_with_kind_alias() {
        let cli = Cli::try_parse_from(["o3de", "project-create", "--project-path", "/work/MyGame"]).unwrap();
        match cli.command {
            Command::ProjectCreate(args) => {
                assert_eq!(args.path, PathBuf::from("/work/MyGame"));
                assert!(args.name.is_none());
                assert!(!args.no_register);
            }
            other => panic!("expected ProjectCreate, got {other:?}"),
        }
    }

    #[test]
    fn parse_android_configure() {
        let cli = Cli::try_parse_from([
            "o3de",
            "android",
            "configure",
            "--global",
            "--set-value",
            "sdk.api.level=33",
            "--list",
        ])
        .unwrap();
        match cli.command {
            Command::Android {
                action: AndroidAction::Configure(args),
            } => {
                assert!(args.global && args.list && !args.validate);
                assert_eq!(args.set_values, ["sdk.api.level=33"]);
            }
            other => panic!("expected Android, got {other:?}"),
        }
    }

    #[test]
    fn parse_tiaf() {
        let cli = Cli::try_parse_from([
            "o3de",
            "tiaf",
            "--config",
            "build/tiaf.json",
            "--src-branch",
            "feature",
            "--dst-branch",
            "main",
            "--commit",
            "abc123",
            "--runtime-type",
            "python",
            "--suite",
            "main",
            "--suite",
            "smoke",
            "--sequence",
            "tianowrite",
            "--storage",
            "s3",
        ])
        .unwrap();
        match cli.command {
            Command::Tiaf(args) => {
                assert_eq!(args.runtime_type, RuntimeType::Python);
                assert_eq!(args.suites, ["main", "smoke"]);
                assert_eq!(args.sequence.map(SequenceType::from), Some(SequenceType::TiaNoWrite));
                assert_eq!(args.storage, Some(StorageArg::S3));
                assert_eq!(args.repo, PathBuf::from("."));
            }
            other => panic!("expected Tiaf, got {other:?}"),
        }
    }

    // ── Export flags ───────────────────────────────────────────────

    fn export_args(extra: &[&str]) -> ExportArgs {
        let mut argv = vec!["o3de", "export-project"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::ExportProject(args) => *args,
            other => panic!("expected ExportProject, got {other:?}"),
        }
    }

    #[test]
    fn export_defaults_override_nothing() {
        assert!(export_args(&[]).overrides().is_empty());
    }

    #[test]
    fn export_flags_become_setting_overrides() {
        let args = export_args(&[
            "--set-value",
            "max.size=10",
            "--config",
            "release",
            "--max-bundle-size",
            "512",
            "--seedlist",
            "a.seed",
            "--seedlist",
            "b.seed",
            "--no-server-launcher",
            "--skip-build-assets",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.first().map(String::as_str), Some("max.size=10"));
        for expected in [
            "project.build.config=release",
            "max.size=512",
            "seedlist.paths=a.seed;b.seed",
            "option.build.server.launcher=false",
            "option.build.assets=false",
        ] {
            assert!(overrides.contains(&expected.to_owned()), "missing {expected}: {overrides:?}");
        }
    }

    #[test]
    fn export_overrides_are_valid_settings() {
        let args = export_args(&["--archive-output", "zip", "--headless-server-launcher", "--clean"]);
        let tmp = tempfile::tempdir().unwrap();
        let mut store =
            ConfigStore::open(export_settings::TOOL, export_settings::EXPORT_SETTINGS, tmp.path(), None)
                .unwrap()
                .with_env(|_| None);
        store.apply_overrides(&args.overrides()).unwrap();
        let options = ExportOptions::from_config(&store).unwrap();
        assert_eq!(options.archive_format, o3de_util::archive::ArchiveFormat::Zip);
        assert_eq!(options.launchers.len(), 4);
        assert!(args.clean);
    }

    #[test]
    fn custom_cmake_args_are_split_before_parsing() {
        let argv = [
            "o3de",
            "export-project",
            "-cca",
            "-DFOO=1",
            "/",
            "--clean",
            "-cba",
            "-j8",
        ];
        let custom = extract_cmake_custom_args(&argv).unwrap();
        assert_eq!(custom.configure, ["-DFOO=1"]);
        assert_eq!(custom.build, ["-j8"]);
        let cli = Cli::try_parse_from(&custom.remaining).unwrap();
        assert!(matches!(cli.command, Command::ExportProject(args) if args.clean));
    }

    #[test]
    fn debug_is_global() {
        let cli = Cli::try_parse_from(["o3de", "list-registrations", "--debug"]).unwrap();
        assert!(cli.debug);
    }

    // ── Invalid arguments ──────────────────────────────────────────

    #[test]
    fn error_no_subcommand() {
        let err = Cli::try_parse_from(["o3de"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn error_register_needs_exactly_one_target() {
        let err = Cli::try_parse_from(["o3de", "register"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["o3de", "register", "--gem-path", "a", "--engine-path", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn error_enable_gem_needs_a_gem() {
        let err = Cli::try_parse_from(["o3de", "enable-gem", "--project-path", "p"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn error_global_conflicts_with_project() {
        let err = Cli::try_parse_from(["o3de", "export-project-configure", "--global", "--project", "p"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn error_unknown_runtime_type() {
        let err = Cli::try_parse_from([
            "o3de",
            "tiaf",
            "--config",
            "c.json",
            "--src-branch",
            "main",
            "--commit",
            "abc",
            "--suite",
            "main",
            "--runtime-type",
            "java",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn exit_codes_follow_the_error() {
        let resolve: Box<dyn Error> = Box::new(o3de_engine::EngineError::Resolve(
            o3de_engine::ResolveError::CyclicDependency {
                cycle: "A -> B -> A".to_owned(),
            },
        ));
        assert_eq!(exit_code(resolve.as_ref()), 2);
        let plain: Box<dyn Error> = "nope".into();
        assert_eq!(exit_code(plain.as_ref()), 1);
    }
}
