use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use url::Url;

use flagwatch::console::{self, ConsoleError, OutputFormat};
use flagwatch::flag::DEFAULT_FLAG_KEY;
use flagwatch::transport::TransportsError;
use flagwatch::{Builder, HandleError};

#[derive(Parser)]
#[command(name = "flagwatch")]
#[command(about = "Watch or flip a remotely served feature flag", long_about = None)]
struct Cli {
    /// Base URL of the flag service, or a path to a local JSON flag file [default: http://localhost:8080]
    #[arg(long, global = true, env = "FLAGWATCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Name of the flag to follow
    #[arg(long, global = true, env = "FLAGWATCH_FLAG", default_value = DEFAULT_FLAG_KEY)]
    flag: String,

    /// Seconds between polls
    #[arg(
        long,
        global = true,
        env = "FLAGWATCH_POLL_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "FLAGWATCH_TIMEOUT_SECS", default_value_t = 3)]
    timeout_secs: u64,

    /// Extra root certificate (PEM or DER) to trust
    #[arg(long, global = true, value_name = "FILE", env = "FLAGWATCH_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Proxy for all requests
    #[arg(long, global = true, env = "FLAGWATCH_PROXY")]
    proxy: Option<Url>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show which side of the flag is live, updating as it changes
    Viewer {
        /// Print one JSON object per change instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the flag as a toggle and flip it from stdin
    Admin {
        /// Label shown next to the toggle
        #[arg(long, default_value = console::DEFAULT_ADMIN_LABEL)]
        label: String,
    },
    /// Check that the flag service is up
    Health,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Transports(#[from] TransportsError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Handle(#[from] HandleError),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "flagwatch=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(%e, "flagwatch failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (handle, worker) = Builder::new()
        .set_endpoint(cli.endpoint)
        .set_flag_key(Some(cli.flag))
        .set_poll_interval(Some(Duration::from_secs(cli.poll_secs)))
        .set_timeout(Some(Duration::from_secs(cli.timeout_secs)))
        .set_proxy(cli.proxy)
        .set_certificate_from_path(cli.ca_cert)
        .await
        .build()
        .await?;

    let mut stdout = tokio::io::stdout();

    let result = match cli.command {
        Command::Viewer { json } => {
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            };

            console::run_viewer(handle, &mut stdout, format, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(%e, "Failed to listen for Ctrl-C, run until killed");
                    std::future::pending::<()>().await;
                }
            })
            .await
            .map_err(CliError::from)
        }
        Command::Admin { label } => {
            let stdin = BufReader::new(tokio::io::stdin());
            console::run_admin(handle, stdin, &mut stdout, &label)
                .await
                .map_err(CliError::from)
        }
        Command::Health => {
            let health = handle.health().await;
            drop(handle);

            match health {
                Ok(health) if health.is_ok() => {
                    println!("{}", health.status);
                    Ok(())
                }
                Ok(health) => Err(HandleError::Health(health.status).into()),
                Err(e) => Err(e.into()),
            }
        }
    };

    worker.wait().await;

    result
}
