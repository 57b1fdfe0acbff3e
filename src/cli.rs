use crate::config::Configuration;
use crate::generate::Generator;
use crate::scanner::SourceTree;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::snapshot::AppSnapshot;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot location relative to the application root when `--snapshot` is omitted.
pub const DEFAULT_SNAPSHOT: &str = "tmp/rails_map.json";

/// Configuration file picked up automatically when present.
pub const DEFAULT_CONFIG: &str = "config/rails_map.yml";

/// Rails Map - static HTML reference of a Rails application's routes and models
#[derive(Parser, Debug)]
#[command(name = "rails-map")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract routes and models and write the HTML site
    Generate {
        #[command(flatten)]
        app: AppArgs,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Remove the generated site
    Clean {
        #[command(flatten)]
        app: AppArgs,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the extracted routes and models as YAML or JSON
    Export {
        #[command(flatten)]
        app: AppArgs,
        #[command(flatten)]
        overrides: Overrides,

        /// Output format (yaml or json)
        #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
        format: OutputFormat,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

/// Where the host application and its snapshot live.
#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// Path to the Rails application root
    #[arg(value_name = "APP_ROOT", default_value = ".")]
    pub app_root: PathBuf,

    /// Routing table and ORM snapshot (JSON or YAML) [default: APP_ROOT/tmp/rails_map.json]
    #[arg(short = 's', long = "snapshot", value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Configuration file [default: APP_ROOT/config/rails_map.yml, if present]
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Command-line overrides of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Output directory of the site, relative to APP_ROOT unless absolute
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Application name shown on every page
    #[arg(long = "app-name")]
    pub app_name: Option<String>,

    /// CSS color of the page header and links
    #[arg(long = "theme-color")]
    pub theme_color: Option<String>,

    /// Hide created_at/updated_at columns on model pages
    #[arg(long = "no-timestamps")]
    pub no_timestamps: bool,

    /// Skip validation extraction
    #[arg(long = "no-validations")]
    pub no_validations: bool,

    /// Skip scope extraction
    #[arg(long = "no-scopes")]
    pub no_scopes: bool,
}

impl Overrides {
    /// Applies the flags on top of `config`; a relative `--output` is taken
    /// from `app_root`, like `output_dir` in the configuration file.
    pub fn apply(&self, config: &mut Configuration, app_root: &Path) {
        if let Some(output) = &self.output {
            config.output_dir = app_root.join(output);
        }
        if let Some(app_name) = &self.app_name {
            config.app_name = app_name.clone();
        }
        if let Some(theme_color) = &self.theme_color {
            config.theme_color = theme_color.clone();
        }
        if self.no_timestamps {
            config.include_timestamps = false;
        }
        if self.no_validations {
            config.include_validations = false;
        }
        if self.no_scopes {
            config.include_scopes = false;
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl Command {
    fn app(&self) -> &AppArgs {
        match self {
            Command::Generate { app, .. } | Command::Clean { app, .. } | Command::Export { app, .. } => app,
        }
    }

    fn overrides(&self) -> &Overrides {
        match self {
            Command::Generate { overrides, .. }
            | Command::Clean { overrides, .. }
            | Command::Export { overrides, .. } => overrides,
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    let app_root = &args.command.app().app_root;
    if !app_root.exists() {
        anyhow::bail!("Application root does not exist: {}", app_root.display());
    }
    if !app_root.is_dir() {
        anyhow::bail!("Application root is not a directory: {}", app_root.display());
    }

    info!("Application root: {}", app_root.display());
    Ok(args)
}

/// Configuration file (explicit or conventional) merged with command-line overrides.
pub fn resolve_config(app: &AppArgs, overrides: &Overrides) -> Result<Configuration> {
    let config_path = app
        .config
        .clone()
        .or_else(|| Some(app.app_root.join(DEFAULT_CONFIG)).filter(|p| p.is_file()));

    let mut config = match config_path {
        Some(path) => {
            info!("Configuration file: {}", path.display());
            Configuration::load(&path, &app.app_root)?
        }
        None => Configuration::for_app_root(&app.app_root),
    };
    overrides.apply(&mut config, &app.app_root);
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn load_snapshot(app: &AppArgs) -> Result<AppSnapshot> {
    let path = app
        .snapshot
        .clone()
        .unwrap_or_else(|| app.app_root.join(DEFAULT_SNAPSHOT));
    info!("Snapshot: {}", path.display());
    AppSnapshot::load(&path)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    let app = args.command.app();
    let config = resolve_config(app, args.command.overrides())?;

    match &args.command {
        Command::Generate { app, .. } => generate(app, &config),
        Command::Clean { .. } => clean(&config.output_dir),
        Command::Export { app, format, out, .. } => export(app, &config, *format, out.as_deref()),
    }
}

fn generate(app: &AppArgs, config: &Configuration) -> Result<()> {
    let snapshot = load_snapshot(app)?;
    let source = SourceTree::new(&app.app_root);

    let tree = Generator::new(config)
        .generate(&snapshot, &snapshot, &source)
        .with_context(|| format!("Failed to generate site in {}", config.output_dir.display()))?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Controllers: {}", tree.handler_count());
    info!("  - Routes: {}", tree.route_count());
    info!("  - Models: {}", tree.model_count());
    info!("  - Output: {}", config.output_dir.display());
    Ok(())
}

/// Removes `output_dir` recursively; a missing directory is not an error.
pub fn clean(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        info!("Nothing to clean at {}", output_dir.display());
        return Ok(());
    }
    fs::remove_dir_all(output_dir)
        .with_context(|| format!("Failed to remove {}", output_dir.display()))?;
    info!("Removed {}", output_dir.display());
    Ok(())
}

fn export(
    app: &AppArgs,
    config: &Configuration,
    format: OutputFormat,
    out: Option<&Path>,
) -> Result<()> {
    let snapshot = load_snapshot(app)?;
    let source = SourceTree::new(&app.app_root);
    let tree = Generator::new(config).extract(&snapshot, &snapshot, &source);

    info!("Serializing to {:?} format...", format);
    let content = match format {
        OutputFormat::Yaml => serialize_yaml(&tree)?,
        OutputFormat::Json => serialize_json(&tree)?,
    };

    match out {
        Some(path) => {
            write_to_file(&content, path)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
