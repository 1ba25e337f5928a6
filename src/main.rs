use clap::Parser;
use marketpulse::artifacts::FileArtifactSink;
use marketpulse::config::AppConfig;
use marketpulse::pipeline::Pipeline;
use marketpulse::provider::HttpPriceProvider;
use marketpulse::report::PngChartRenderer;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "marketpulse")]
#[command(about = "Run one daily market pipeline pass: fetch, indicators, partitions, movers, report")]
struct Cli {
    /// Path to a YAML config file (takes precedence over CONFIG_FILE / env vars)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("marketpulse=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => AppConfig::from_yaml(&path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error, aborting before any stage runs");
            std::process::exit(2);
        }
    };
    info!(
        tickers = config.tickers.len(),
        lookback_days = config.lookback_days,
        base_dir = %config.base_dir.display(),
        "Loaded configuration"
    );

    let provider = match HttpPriceProvider::new(config.provider_url.clone(), config.api_key.clone())
    {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "Failed to build price provider client");
            std::process::exit(1);
        }
    };

    let sink = FileArtifactSink::new(config.base_dir.join("artifacts"));
    let pipeline = Pipeline::new(
        config,
        provider,
        Box::new(PngChartRenderer::default()),
        Box::new(sink),
    );

    let report = pipeline.run().await;
    for (stage, status) in report.stages() {
        info!(stage, ?status, "Stage outcome");
    }

    if report.succeeded() {
        info!("Run completed without unrecovered stage failures");
    } else {
        error!("Run completed with at least one failed stage");
        std::process::exit(1);
    }
}
