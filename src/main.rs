//! OC Swapper - headless entry point.
//!
//! Drives the same two operations a GUI would: report the current state and
//! request a swap. Everything else (`install`, `hash`, `about`) exists to get
//! a setup into a state where those two work.
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/ocswapper.<date>
//! 2. Load or create config.ini ([`ConfigStore`])
//! 3. Classify the installed openvr_api.dll, installing SteamVR if it is missing
//! 4. Run the requested command
//! 5. Log run metrics
//!
//! Command output goes to stdout, logs to the log file and stderr.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use ocswapper::services::hashing;
use ocswapper::{
    APP_NAME, ConfigStore, InstalledState, StartupReport, VERSION, Variant, VariantManager,
};
use serde::Serialize;

/// Swap openvr_api.dll between the SteamVR and OpenComposite builds
#[derive(Parser)]
#[command(name = "ocswapper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.ini
    #[arg(short, long, global = true, default_value = "config.ini")]
    config: Utf8PathBuf,

    /// Directory for log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Don't mirror logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which binaries are currently installed
    Status {
        /// Print a YAML report instead of a sentence
        #[arg(long)]
        yaml: bool,
    },

    /// Swap to the other binaries
    Swap,

    /// Install a specific variant, e.g. to recover from an unrecognized DLL
    Install {
        #[arg(value_enum)]
        variant: VariantArg,
    },

    /// Print the MD5 digest of files, for filling in config.ini
    Hash {
        #[arg(required = true)]
        files: Vec<Utf8PathBuf>,
    },

    /// About OC Swapper
    About,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Steamvr,
    Opencomposite,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Steamvr => Variant::SteamVr,
            VariantArg::Opencomposite => Variant::OpenComposite,
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    state: String,
    target: String,
    digest: Option<String>,
    steamvr_storage: String,
    opencomposite_storage: String,
    bootstrapped: bool,
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = ocswapper::logging::setup_logging(&cli.log_dir, APP_NAME, cli.debug, !cli.quiet)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.command {
        Commands::About => {
            println!("{}", ocswapper::about_text());
            Ok(())
        }
        Commands::Hash { files } => cmd_hash(&files),
        Commands::Status { yaml } => with_manager(&cli.config, |manager, report| {
            cmd_status(manager, report, yaml)
        }),
        Commands::Swap => with_manager(&cli.config, |manager, _| cmd_swap(manager)),
        Commands::Install { variant } => {
            with_manager(&cli.config, |manager, _| cmd_install(manager, variant.into()))
        }
    }
}

/// Load config, build and initialize the manager, run `f`, then log metrics
fn with_manager<F>(config_path: &Utf8Path, f: F) -> Result<()>
where
    F: FnOnce(&mut VariantManager, &StartupReport) -> Result<()>,
{
    let store = ConfigStore::new(config_path)?;
    let config = store
        .load()
        .with_context(|| format!("Could not load {}", config_path))?;

    let missing = config.missing_fields();
    if !missing.is_empty() {
        bail!(
            "{} needs {} filled in before OC Swapper can do anything",
            store.config_path(),
            missing.join(", ")
        );
    }

    let mut manager = VariantManager::new(store, config);
    let result = manager
        .initialize()
        .context("Could not determine the installed openvr_api.dll")
        .and_then(|report| {
            if report.bootstrapped {
                println!("openvr_api.dll was missing, installed the SteamVR binaries");
            }
            if let Some(drift) = &report.drift_since_last_run {
                eprintln!("Warning: {}", drift);
            }
            f(&mut manager, &report)
        });

    manager.metrics().log_summary();
    result
}

fn cmd_status(manager: &VariantManager, report: &StartupReport, yaml: bool) -> Result<()> {
    print!("{}", render_status(manager, report, yaml)?);
    Ok(())
}

fn render_status(manager: &VariantManager, report: &StartupReport, yaml: bool) -> Result<String> {
    let state = manager.current_state();

    if yaml {
        let resolved = manager.resolved();
        let mut warnings = manager.configuration().hash_warnings();
        if let Some(drift) = &report.drift_since_last_run {
            warnings.push(drift.to_string());
        }

        let status = StatusReport {
            state: state.to_string(),
            target: resolved.target_path.to_string(),
            digest: manager.snapshot().last_digest,
            steamvr_storage: resolved.steamvr_storage_path.to_string(),
            opencomposite_storage: resolved.opencomposite_storage_path.to_string(),
            bootstrapped: report.bootstrapped,
            warnings,
        };
        return Ok(serde_yaml_ng::to_string(&status)?);
    }

    let hint = match state {
        InstalledState::Installed(variant) => format!("Run `swap` to switch to {}", variant.other()),
        InstalledState::Unknown | InstalledState::Missing => {
            "Run `install steamvr` or `install opencomposite` to pick one".to_string()
        }
    };
    Ok(format!("You are currently using {}\n{}\n", state, hint))
}

fn cmd_install(manager: &mut VariantManager, variant: Variant) -> Result<()> {
    let state = manager.install(variant)?;
    println!("You are currently using {}", state);
    Ok(())
}

fn cmd_swap(manager: &mut VariantManager) -> Result<()> {
    let outcome = manager.request_swap()?;

    if let Some(drift) = &outcome.drift {
        eprintln!(
            "WARNING: Something has changed the openvr_api.dll binaries whilst this program has been open! {}",
            drift
        );
    }
    println!(
        "Swapped from {} to {}, you are currently using {} binaries",
        outcome.previous, outcome.current, outcome.current
    );
    Ok(())
}

fn cmd_hash(files: &[Utf8PathBuf]) -> Result<()> {
    for file in files {
        let digest =
            hashing::hash_file(file).with_context(|| format!("Failed to hash {}", file))?;
        println!("{}  {}", digest, file);
    }
    Ok(())
}
