use anyhow::Result;
use clap::{Parser, Subcommand};
use depotlens::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the look-through analysis and write report and charts
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Report) | None => depotlens::run(cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = depotlens::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
# Portfolio CSV: Ticker,Category,Label,Sector,Country,Quantity
portfolio_file: "portfolio.csv"

# Fund constituent exports land here; the file stem must match the
# portfolio's Fund position label.
fund_dir: "funds"
funds: []
#  - url: "https://example.com/ishares-world.csv"
#    file: "MSCI World.csv"

report_dir: "report"
charts_dir: "charts"

# Exchange / currency-pair suffixes tried during price lookup.
stock_suffixes: [".DE"]
crypto_suffixes: ["-EUR"]
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
