//! viaduct command line.
//!
//! ```text
//! viaduct dev      compose (dev) → bind → serve + proxy, reload on change
//! viaduct build    compose (build) → walk root → write output dir
//! viaduct check    compose each entry point → compare output dir + proxy table
//! viaduct resolve  compose (dev) → print the rule that owns a request path
//! viaduct show     compose → print the configuration as JSON
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use viaduct::build::{BuildEngine, CopyTransformer};
use viaduct::compose::{
    check_convergence, BuildConfiguration, ComposeRequest, Composer, ConvergencePolicy, EntryError,
    ServerOverrides,
};
use viaduct::config::schema::CONFIG_FILE_NAME;
use viaduct::config::watcher::{apply_updates, ConfigWatcher};
use viaduct::config::{load_config, EntryConfig};
use viaduct::lifecycle::startup::bind_listener;
use viaduct::observability::init_logging;
use viaduct::plugins::PluginRegistry;
use viaduct::{DevServer, Mode, Shutdown};

#[derive(Parser)]
#[command(name = "viaduct")]
#[command(about = "Compose build and dev-server configuration for a web front end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the project root and proxy API prefixes
    Dev {
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one build pass into the output directory
    Build {
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },
    /// Verify that several entry points resolve to the same configuration
    Check {
        #[arg(short, long = "config", required = true, num_args = 1..)]
        configs: Vec<PathBuf>,
        #[arg(long, default_value = "strict")]
        policy: ConvergencePolicy,
    },
    /// Print the proxy rule that owns a request path
    Resolve {
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
        path: String,
    },
    /// Print the composed configuration as JSON
    Show {
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
        #[arg(short, long, default_value = "dev")]
        mode: Mode,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dev { config, host, port } => dev(&config, host, port).await,
        Commands::Build { config } => build(&config),
        Commands::Check { configs, policy } => check(&configs, policy),
        Commands::Resolve { config, path } => resolve(&config, &path),
        Commands::Show { config, mode } => show(&config, mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

/// Load an entry point and start logging at its configured level.
fn load_entry(path: &Path) -> Result<EntryConfig, EntryError> {
    let entry = load_config(path)?;
    init_logging(&entry.config.logging.level);
    tracing::info!(
        config = %entry.path.display(),
        workspace_root = %entry.workspace_root.display(),
        "Configuration loaded"
    );
    Ok(entry)
}

fn compose_request(entry: &EntryConfig, request: ComposeRequest) -> Result<Arc<BuildConfiguration>, EntryError> {
    let mut composer = Composer::new(PluginRegistry::builtin());
    composer.compose(request).map_err(|source| EntryError::Compose {
        path: entry.path.clone(),
        source,
    })
}

fn compose_entry(entry: &EntryConfig, mode: Mode) -> Result<Arc<BuildConfiguration>, EntryError> {
    let request = ComposeRequest::from_entry(entry, mode).map_err(|source| EntryError::Compose {
        path: entry.path.clone(),
        source,
    })?;
    compose_request(entry, request)
}

async fn dev(path: &Path, host: Option<String>, port: Option<u16>) -> Result<(), Box<dyn Error>> {
    let entry = load_entry(path)?;
    let overrides = ServerOverrides { host, port };
    let mut request = ComposeRequest::from_entry(&entry, Mode::Dev).map_err(|source| EntryError::Compose {
        path: entry.path.clone(),
        source,
    })?;
    overrides.apply(&mut request.server);
    let config = compose_request(&entry, request)?;

    let listener = bind_listener(config.server()).await?;
    let server = DevServer::new(config);
    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let (watcher, updates) = ConfigWatcher::new(entry.path.clone(), entry.watched_files(), Mode::Dev);
    let watcher = watcher.with_overrides(overrides);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, reload disabled");
            None
        }
    };
    let reload = tokio::spawn(apply_updates(updates, server.shared_config(), shutdown.subscribe()));

    server.run(listener, shutdown.subscribe()).await?;
    shutdown.trigger();
    let _ = reload.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build(path: &Path) -> Result<(), Box<dyn Error>> {
    let entry = load_entry(path)?;
    let config = compose_entry(&entry, Mode::Build)?;

    let report = BuildEngine::new(&config, CopyTransformer).run()?;
    tracing::info!(
        output = %config.output().directory.display(),
        cleaned = report.cleaned,
        claimed = report.claimed,
        skipped = report.skipped,
        emitted = report.emitted,
        "Build complete"
    );
    println!(
        "built {} file(s) into {}",
        report.emitted,
        config.output().directory.display()
    );
    Ok(())
}

fn check(paths: &[PathBuf], policy: ConvergencePolicy) -> Result<(), Box<dyn Error>> {
    let mut composed = Vec::with_capacity(paths.len());
    for path in paths {
        let entry = load_entry(path)?;
        let config = compose_entry(&entry, Mode::Build)?;
        composed.push((entry.path.display().to_string(), config));
    }

    let mut divergent = 0;
    for (i, (left_label, left)) in composed.iter().enumerate() {
        for (right_label, right) in &composed[i + 1..] {
            let found = check_convergence((left_label.as_str(), left.as_ref()), (right_label.as_str(), right.as_ref()), policy)?;
            for divergence in &found {
                println!("{left_label} vs {right_label}: {divergence}");
            }
            divergent += found.len();
        }
    }

    if divergent == 0 {
        if let Some((_, config)) = composed.first() {
            println!(
                "{} entry point(s) converge on {}",
                composed.len(),
                config.output().directory.display()
            );
        }
    }
    Ok(())
}

fn resolve(path: &Path, request_path: &str) -> Result<(), Box<dyn Error>> {
    let entry = load_entry(path)?;
    let config = compose_entry(&entry, Mode::Dev)?;

    match config.proxy().resolve(request_path) {
        Some(rule) => println!("{request_path} -> {} ({})", rule.target, rule.prefix()),
        None => println!("{request_path} -> not found"),
    }
    Ok(())
}

fn show(path: &Path, mode: Mode) -> Result<(), Box<dyn Error>> {
    let entry = load_entry(path)?;
    let config = compose_entry(&entry, mode)?;
    println!("{}", serde_json::to_string_pretty(config.as_ref())?);
    Ok(())
}
