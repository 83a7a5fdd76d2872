use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use fuel_watch::{
    config::Config,
    error::EXIT_USAGE,
    fetcher::{FetchRequest, Fetcher},
    watcher::Watcher,
    FetchError,
};
use reqwest::Method;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fuel-watch", version)]
#[command(about = "Fuel price watcher for Latvian fuel stations", long_about = None)]
struct Cli {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single HTTP request and print the response body
    Fetch {
        /// Target URL
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra request header as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short = 'd', long)]
        data: Option<String>,
    },
    /// Scrape every provider once and print current prices
    Check,
    /// Watch providers and report price changes until interrupted
    Run,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = ?e, "fuel-watch failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// clap exits with 2 on bad arguments, which would collide with `EXIT_TRANSPORT`
fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_USAGE,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the process exit code; `Err` is reserved for configuration problems.
async fn run(cli: Cli) -> Result<u8> {
    let config = Config::resolve(cli.config.as_deref())?;
    let fetcher = Arc::new(Fetcher::new(&config.http)?);

    match cli.command {
        Commands::Fetch {
            url,
            method,
            headers,
            data,
        } => Ok(run_fetch(&fetcher, &url, &method, &headers, data).await),
        Commands::Check => Ok(run_check(&config, fetcher).await),
        Commands::Run => {
            run_watch(&config, fetcher).await;
            Ok(0)
        }
    }
}

fn build_request(
    url: &str,
    method: &str,
    headers: &[String],
    data: Option<String>,
) -> Result<FetchRequest, FetchError> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| FetchError::InvalidRequest(format!("invalid HTTP method '{}'", method)))?;

    let mut request = FetchRequest::new(method, url)?;
    for header in headers {
        let (name, value) = header.split_once(':').ok_or_else(|| {
            FetchError::InvalidRequest(format!("header must look like 'Name: value', got '{}'", header))
        })?;
        request = request.with_header(name, value)?;
    }
    if let Some(body) = data {
        request = request.with_body(body);
    }
    Ok(request)
}

fn report_failure(err: &FetchError) -> u8 {
    error!(error = %err, kind = ?err.kind(), "Request failed");
    eprintln!("Error: {}", err);
    err.exit_code()
}

async fn run_fetch(
    fetcher: &Fetcher,
    url: &str,
    method: &str,
    headers: &[String],
    data: Option<String>,
) -> u8 {
    let request = match build_request(url, method, headers, data) {
        Ok(request) => request,
        Err(e) => return report_failure(&e),
    };

    match fetcher.fetch(&request).await {
        Ok(response) => {
            info!(url = %request.url(), status = response.status.as_u16(), "Request succeeded");
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout
                .write_all(&response.body)
                .and_then(|_| stdout.flush())
            {
                warn!(error = %e, "Failed to write response body to stdout");
            }
            0
        }
        Err(e) => report_failure(&e),
    }
}

async fn run_check(config: &Config, fetcher: Arc<Fetcher>) -> u8 {
    let watcher = Watcher::from_config(config, fetcher);

    let mut exit_code = 0;
    for (provider, result) in watcher.snapshot().await {
        match result {
            Ok(prices) => println!("{} {}", provider, prices),
            Err(e) => {
                error!(provider = %provider, error = %e, "Price check failed");
                eprintln!("{}: {}", provider, e);
                if exit_code == 0 {
                    exit_code = e.exit_code();
                }
            }
        }
    }
    exit_code
}

async fn run_watch(config: &Config, fetcher: Arc<Fetcher>) {
    let mut watcher = Watcher::from_config(config, fetcher);
    watcher
        .run(
            Duration::from_secs(config.polling.interval_seconds),
            shutdown_signal(),
        )
        .await;
    info!("fuel-watch stopped");
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM (container stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
