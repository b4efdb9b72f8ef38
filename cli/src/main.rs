use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use postgrab::{CancellationToken, CoreClient, ExtractorConfig};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg()]
    url: String,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// overall extraction deadline, seconds
    #[arg(long)]
    deadline: Option<u64>,

    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> Result<ExtractorConfig> {
    let mut config = match &args.config {
        Some(path) => ExtractorConfig::load(path)?,
        None => ExtractorConfig::from_env(),
    };
    if let Some(secs) = args.deadline {
        config.overall_deadline_secs = secs;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // stdout is reserved for the result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postgrab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = CoreClient::new(load_config(&args)?)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let dispatched = client.dispatch_with(&args.url, cancel).await;
    let json = if args.pretty {
        serde_json::to_string_pretty(&dispatched)?
    } else {
        serde_json::to_string(&dispatched)?
    };
    println!("{}", json);

    Ok(if dispatched.result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
