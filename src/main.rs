//! folder-audit - append-only audit trail of file activity in monitored folders.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use folder_audit::audit::{AuditRecord, EventKind};
use folder_audit::config::{self, AuditConfig, ConfigError};
use folder_audit::display;
use folder_audit::monitor::Monitor;
use folder_audit::pipeline::SystemUserResolver;
use folder_audit::source::FsNotifySource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Create,
    Open,
    Rename,
    Unlink,
    Write,
}

impl From<KindArg> for EventKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Create => EventKind::Create,
            KindArg::Open => EventKind::Open,
            KindArg::Rename => EventKind::Rename,
            KindArg::Unlink => EventKind::Unlink,
            KindArg::Write => EventKind::Write,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "folder-audit",
    about = "Append-only audit trail of file activity in monitored folders",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Audit log file, overriding the configured one.
    #[arg(short, long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor folders and append every accepted event to the audit log.
    Run {
        /// Folder to monitor, in addition to the configured ones.
        #[arg(short, long = "folder")]
        folders: Vec<String>,
        /// File name to ignore, in addition to the configured ones.
        #[arg(short, long = "ignore")]
        ignore: Vec<String>,
    },
    /// Print the records in the audit log.
    Tail {
        /// Only show records of this kind.
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        /// Print records as JSON lines.
        #[arg(long, conflicts_with = "plain")]
        json: bool,
        /// Print records without color.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration.
    Config,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AuditConfig, ConfigError> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(log) = &cli.log {
        config.log_path.clone_from(log);
    }
    Ok(config)
}

async fn run(mut config: AuditConfig, folders: Vec<String>, ignore: Vec<String>) -> ExitCode {
    for folder in folders {
        if !config.monitored_folders.contains(&folder) {
            config.monitored_folders.push(folder);
        }
    }
    config.ignored_files.extend(ignore);

    let source = FsNotifySource::new(config.monitored_folders.iter().map(PathBuf::from));
    let monitor = match Monitor::start(&config, source, SystemUserResolver).await {
        Ok(monitor) => monitor,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start audit monitor");
            eprintln!("folder-audit: {e}");
            return ExitCode::FAILURE;
        }
    };
    display::print_monitor_start(monitor.log_path(), &config.monitored_folders);

    let stopped = monitor.stopped_token();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Shutdown requested");
        }
        () = stopped.cancelled() => {
            tracing::warn!("Dispatch queue stopped");
        }
    }

    match monitor.shutdown().await {
        Ok(written) => {
            display::print_monitor_stop(written);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Audit record could not be persisted");
            eprintln!("folder-audit: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn tail(config: &AuditConfig, kind: Option<EventKind>, json: bool, plain: bool) -> ExitCode {
    let content = match tokio::fs::read_to_string(&config.log_path).await {
        Ok(content) => content,
        Err(e) => {
            eprintln!("folder-audit: cannot read {}: {e}", config.log_path.display());
            return ExitCode::FAILURE;
        }
    };

    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let record = match AuditRecord::parse_line(line) {
            Ok(record) => record,
            Err(e) => {
                display::print_malformed(index + 1, line, &e);
                continue;
            }
        };
        if kind.is_some_and(|k| k != record.event_kind()) {
            continue;
        }

        if json {
            match serde_json::to_string(&record) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize record"),
            }
        } else if plain {
            println!("{}", display::format_record(&record));
        } else {
            display::print_record(&record);
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("folder-audit: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run { folders, ignore } => run(config, folders, ignore).await,
        Commands::Tail { kind, json, plain } => {
            tail(&config, kind.map(EventKind::from), json, plain).await
        }
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("folder-audit: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
