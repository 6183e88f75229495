use barcraft::cli::handle_config;
use barcraft::cli::handle_ingest;
use barcraft::cli::handle_retrieve;
use barcraft::cli::handle_serve;
use barcraft::cli::Cli;
use barcraft::cli::Commands;
use barcraft::config::AppConfig;
use barcraft::Result;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in .env; a missing file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    barcraft::logging::apply_backtrace(config.logging.backtrace);

    if cli.verbose {
        barcraft::logging::init_logging_with_level("debug")?;
    } else {
        barcraft::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Serve { host, port, cors } => handle_serve(&config, host, port, cors).await?,
        Commands::Ingest { sources, output } => handle_ingest(&config, sources, output).await?,
        Commands::Retrieve { query, k } => handle_retrieve(&config, query, k).await?,
        Commands::Config => handle_config(&config)?,
    }

    Ok(())
}
