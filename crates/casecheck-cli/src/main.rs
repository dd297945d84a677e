use anyhow::Context;
use clap::Parser;

use casecheck_runtime::RuntimeConfig;

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("casecheck error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        cli::Commands::Chunk { file, format } => commands::chunk(&file, format, &config),
        cli::Commands::Search { file, query, top_k } => commands::search(&file, &query, top_k, &config),
        cli::Commands::Check {
            file,
            inputs,
            response,
            output,
        } => commands::check(&file, &inputs, response.as_deref(), output.as_deref(), config).await,
        cli::Commands::Normalize { file, report } => commands::normalize(file.as_deref(), report),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<RuntimeConfig> {
    let config = match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    config
        .with_env_overrides()
        .context("invalid environment override")
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let default_directives = format!(
        "warn,casecheck={level},casecheck_core={level},casecheck_runtime={level}"
    );

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
