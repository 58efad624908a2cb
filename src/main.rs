use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskshell::{AppConfig, ExecRequest, ExecSession, TunnelError};

/// Interactive shells inside running remote tasks.
#[derive(Parser)]
#[command(name = "taskshell", version, about)]
struct Cli {
    /// Configuration file (default: <config dir>/taskshell/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop into a shell in a running task's container.
    Exec {
        /// Name of the running task.
        task_name: String,
        /// Container to attach to (default: the pod's default container).
        #[arg(short, long)]
        container: Option<String>,
        /// Command to run instead of the configured shell.
        #[arg(last = true)]
        command: Vec<String>,
    },
}

fn main() {
    // Diagnostics go to stderr so they never mix with remote output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("TLS crypto provider already installed");
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run(cli));

    // A pending read on local stdin would block a graceful runtime shutdown
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => return report(None, &TunnelError::from(e)),
    };

    match cli.command {
        Commands::Exec {
            task_name,
            container,
            command,
        } => {
            let request = ExecRequest {
                task_name,
                command: (!command.is_empty()).then_some(command),
                container,
            };
            let session = ExecSession::new(config);
            match session.run(&request).await {
                Ok(code) => code,
                Err(e) => report(Some(&request.task_name), &e),
            }
        }
    }
}

/// Print a human-readable diagnostic and pick the process exit code
fn report(task_name: Option<&str>, error: &TunnelError) -> i32 {
    tracing::debug!(
        retryable = error.is_retryable(),
        fatal = error.is_fatal(),
        "{}",
        error
    );

    eprintln!();
    match (task_name, error) {
        (Some(task), e) if e.is_retryable() => eprintln!("Unable to exec into {}: {}", task, e),
        _ => eprintln!("{}", error),
    }
    eprintln!();

    error.exit_code()
}
