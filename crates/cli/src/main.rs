use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgent_autostart::{AutostartEntry, instances, platform_autostart};
use edgent_core::config::AppConfig;
use edgent_watchman::{Watchman, default_targets, sweep_once};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Name used for the autostart entry.
const APP_NAME: &str = "edgent";

#[derive(Parser, Debug)]
#[command(author, version, about = "Edgent - keeps the Microsoft Edge shortcut off your desktop", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the service to keep watch
    Watch {
        /// Run in the background without a terminal
        #[arg(long)]
        hidden: bool,
    },
    /// Run the cleaning sweep once and exit
    Clean,
    /// Register to run at login and spin up a background instance
    Install,
    /// Remove the login registration and end all instances
    Uninstall,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("⚠️ Configuration invalid ({}), using defaults", e);
        AppConfig::default()
    });
    let guard = init_logging(&config, &args.command);

    edgent_core::init();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        eprintln!("❌ Error: {:#}", e);
        // Flush the file writer before exiting
        drop(guard);
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig, command: &Commands) -> Option<WorkerGuard> {
    let filter = || EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if matches!(command, Commands::Watch { hidden: false }) {
        // Watch mode usually runs detached: the log file is the only trace
        let log_path = config.log_path();
        let file = std::fs::create_dir_all(&config.app_root).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
        });

        match file {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(non_blocking.and(std::io::stderr))
                    .with_ansi(false)
                    .init();
                return Some(guard);
            }
            Err(e) => eprintln!("⚠️ Cannot open log file {}: {}", log_path.display(), e),
        }
    }

    // CLI mode: Log to stderr for feedback
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();
    None
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Watch { hidden: true } => {
            instances::spawn_detached(&["watch"]).context("Failed to start background instance")?;
            println!("👀 Edgent is watching in the background.");
        }
        Commands::Watch { hidden: false } => {
            let targets = default_targets()?;
            let watchman = Watchman::new(targets);
            watchman
                .run_until(shutdown_signal())
                .await
                .context("Cannot start watching")?;
        }
        Commands::Clean => {
            let targets = default_targets()?;
            let report = sweep_once(&targets).await;
            println!(
                "🧹 Sweep done: {} removed, {} failed",
                report.deleted(),
                report.failed()
            );
        }
        Commands::Install => {
            instances::kill_other_instances();

            let entry = AutostartEntry::for_current_exe(APP_NAME)?;
            platform_autostart(APP_NAME)?
                .ensure_registered(&entry)
                .await
                .context("Failed to register for startup")?;

            instances::spawn_detached(&["watch"]).context("Failed to start background instance")?;
            println!("✅ Installed: {}", entry.command_line());
        }
        Commands::Uninstall => {
            platform_autostart(APP_NAME)?
                .ensure_unregistered()
                .await
                .context("Failed to remove startup registration")?;

            let ended = instances::kill_other_instances();
            println!("✅ Uninstalled ({} instance(s) ended)", ended);
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
