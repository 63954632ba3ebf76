use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stockcast_api::{create_router, AppState};
use stockcast_config::AppConfig;
use stockcast_core::types::RiskLabel;
use stockcast_core::utils::{normalize_ticker, parse_date};
use stockcast_data::YahooClient;
use stockcast_ml::kmeans::KMeansConfig;
use stockcast_risk::StockClusteringSystem;

#[derive(Parser)]
#[command(name = "stockcast", about = "Stock price forecasting and risk-based recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP forecast server
    Serve,
    /// Forecast one ticker from its stored artifacts
    Forecast {
        /// Ticker symbol (case-insensitive)
        #[arg(short, long)]
        stock: String,
        /// Number of days to forecast
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Cluster tickers by risk and list recommendations
    Recommend {
        /// Comma-separated ticker symbols
        #[arg(short, long)]
        tickers: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Number of clusters (defaults to the configured value)
        #[arg(long)]
        clusters: Option<usize>,
        /// Only list tickers for this risk label (Aggressive, Moderate, Conservative)
        #[arg(long)]
        risk: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => run_server(&config).await?,
        Commands::Forecast { stock, steps } => cmd_forecast(&config, &stock, steps).await?,
        Commands::Recommend {
            tickers,
            start,
            end,
            clusters,
            risk,
        } => {
            cmd_recommend(&config, &tickers, &start, &end, clusters, risk.as_deref()).await?;
        }
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    if Path::new(path).exists() {
        AppConfig::from_file(path).with_context(|| format!("loading {}", path))
    } else {
        warn!("Config file {} not found, using defaults", path);
        Ok(AppConfig::default())
    }
}

// ── Forecast ────────────────────────────────────────────────────────

async fn cmd_forecast(config: &AppConfig, stock: &str, steps: Option<usize>) -> anyhow::Result<()> {
    let state = AppState::new(config.clone());
    let predictions = state.forecaster.predict(stock, steps).await?;

    println!("Forecast for {}", normalize_ticker(stock));
    for (i, p) in predictions.iter().enumerate() {
        println!("  t+{:<4} {:.4}", i + 1, p);
    }
    Ok(())
}

// ── Recommend ───────────────────────────────────────────────────────

async fn cmd_recommend(
    config: &AppConfig,
    tickers: &str,
    start: &str,
    end: &str,
    clusters: Option<usize>,
    risk: Option<&str>,
) -> anyhow::Result<()> {
    let tickers: Vec<String> = tickers
        .split(',')
        .map(normalize_ticker)
        .filter(|t| !t.is_empty())
        .collect();
    let start_date = parse_date(start).with_context(|| format!("invalid start date '{}'", start))?;
    let end_date = parse_date(end).with_context(|| format!("invalid end date '{}'", end))?;
    let risk: Option<RiskLabel> = risk.map(str::parse::<RiskLabel>).transpose()?;

    let cc = &config.clustering;
    let provider = Arc::new(YahooClient::new(
        &cc.provider_base_url,
        Duration::from_secs(cc.timeout_secs),
    ));
    let kmeans = KMeansConfig {
        n_clusters: cc.n_clusters,
        n_init: cc.n_init,
        max_iter: cc.max_iter,
        tolerance: cc.tolerance,
        seed: cc.seed,
    };

    info!("Clustering {} tickers from {} to {}", tickers.len(), start_date, end_date);
    let mut system = StockClusteringSystem::new(tickers, start_date, end_date, provider)
        .with_kmeans_config(kmeans);
    system.fetch_data().await;
    system.create_feature_matrix();
    system.preprocess_features()?;
    system.perform_clustering(clusters.unwrap_or(cc.n_clusters))?;

    let profiles = system.cluster_profiles();
    if profiles.is_empty() {
        println!("No clusters formed.");
        return Ok(());
    }

    println!("{:<8} {:>5} {:>12} {:>12} {:>10}  Label", "Cluster", "Size", "Mean ret", "Volatility", "Sharpe");
    for p in &profiles {
        println!(
            "{:<8} {:>5} {:>12.6} {:>12.6} {:>10.4}  {}",
            p.cluster, p.size, p.mean_return, p.volatility, p.sharpe, p.label
        );
    }
    if let Some(s) = system.silhouette() {
        println!("Silhouette score: {:.4}", s);
    }
    println!();

    let labels = match risk {
        Some(label) => vec![label],
        None => RiskLabel::all().to_vec(),
    };
    for label in labels {
        let picks = system.get_recommendations(label);
        if picks.is_empty() {
            println!("{}: (none)", label);
        } else {
            println!("{}: {}", label, picks.join(", "));
        }
    }
    Ok(())
}

// ── Server ──────────────────────────────────────────────────────────

async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.clone());
    info!("Artifact source: {}", state.forecaster.source_name());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Stockcast API listening on http://{}", addr);
    info!("  POST http://{}/predict", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
