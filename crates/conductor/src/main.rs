mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use conductor_core::kernel::constants;
use conductor_core::kernel::error::Result as KernelResult;
use conductor_core::{Configuration, ControlLoop, ExecutionScope, OrchestratorConfig};
use log::{error, info, warn};

/// Conductor: boot-gated service orchestrator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Orchestrator configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Name of this process; `<app>:<suffix>` marks a helper sub-process
    #[arg(long)]
    process_name: Option<String>,

    /// User this process runs for
    #[arg(long)]
    user_id: Option<u32>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Deliver the boot completed signal right after startup
    #[arg(long)]
    boot_completed: bool,

    /// Announce a locale change after startup
    #[arg(long)]
    locale: Option<String>,

    /// Process the queued events and exit instead of waiting for Ctrl-C
    #[arg(long)]
    once: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print the descriptor tables
    Check,
    /// List the services this binary can build
    Services,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        eprintln!("Failed to initialize env_logger: {}", e);
    }
}

async fn run(args: CliArgs) -> KernelResult<()> {
    let config = match &args.config {
        Some(path) => OrchestratorConfig::load(path)?,
        None => {
            info!("No configuration file given; using the built-in service set");
            services::default_config()
        }
    };

    match args.command {
        Some(Commands::Check) => return check(&config),
        Some(Commands::Services) => {
            println!("Available services:");
            for name in services::known_services() {
                println!("  - {}", name);
            }
            return Ok(());
        }
        None => {}
    }

    let process_name = args
        .process_name
        .clone()
        .unwrap_or_else(|| config.app_process_name.clone());
    let user_id = args.user_id.unwrap_or(config.primary_user_id);

    println!("Initializing {} v{}...", constants::APP_NAME, constants::APP_VERSION);
    let orchestrator = config.build_orchestrator(services::catalog(), &process_name, user_id);
    let scope = orchestrator.scope();
    println!("Scope: {}", scope);

    if scope == ExecutionScope::Auxiliary {
        println!("Auxiliary process '{}': no services started", process_name);
        return Ok(());
    }
    let table = config.descriptor_table(scope)?;
    let total = table.len();

    let (mut control, sender) = ControlLoop::new(orchestrator);
    sender.start_services(table)?;
    if args.boot_completed {
        if scope == ExecutionScope::Primary {
            sender.boot_completed()?;
        } else {
            warn!("--boot-completed has no effect in the {} scope", scope);
        }
    }
    if let Some(locale) = args.locale {
        sender.configuration_changed(Configuration::new().with_locale(locale.clone()))?;
        sender.locale_changed(locale)?;
    }

    let orchestrator = if args.once {
        // Handling an event may queue more, e.g. plugin reports.
        while control.process_pending().await? > 0 {}
        control.into_orchestrator()
    } else {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    if let Err(e) = sender.shutdown() {
                        warn!("Could not request shutdown: {}", e);
                    }
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        println!("Running; press Ctrl-C to stop");
        control.run().await?
    };

    println!(
        "Services running: {}/{} (boot completed: {})",
        orchestrator.created_count(),
        total,
        orchestrator.is_boot_completed()
    );
    for timing in orchestrator.diagnostics().slow_services() {
        println!("  slow: {} took {} ms", timing.service, timing.elapsed.as_millis());
    }
    if let Some(tracker) = orchestrator.plugin_tracker() {
        if !tracker.is_empty() {
            println!("Overlay plugins holding the status bar: {}", tracker.overlay_ids().join(", "));
        }
    }

    println!("Shutting down orchestrator...");
    Ok(())
}

fn check(config: &OrchestratorConfig) -> KernelResult<()> {
    config.validate()?;
    let catalog = services::catalog();
    for scope in [ExecutionScope::Primary, ExecutionScope::Secondary] {
        if config.services_for(scope).is_empty() {
            println!("{}: (none)", scope);
            continue;
        }
        let table = config.descriptor_table(scope)?;
        catalog.verify(&table)?;
        println!("{}:", scope);
        for descriptor in &table {
            println!("  - {} ({:?})", descriptor.name(), descriptor.phase());
        }
    }
    println!("Configuration OK");
    Ok(())
}
