use clap::Parser;
use nc_core::NarrativeStore;
use nc_inference::batch::DEFAULT_BATCH_SIZE;
use nc_inference::{Pipeline, DEFAULT_BASE_URL, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL_NAME};
use nc_scrapers::{default_sources, load_sources, ScraperManager, SourceConfig};
use nc_storage::StoreKind;
use nc_web::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct HumanDuration(Duration);

const UNITS: [(char, u64); 4] = [('s', 1), ('m', 60), ('h', 3600), ('d', 86_400)];

/// Add `digits` counted in `unit_secs` to `total`, refusing to overflow.
fn add_part(total: u64, digits: &str, unit_secs: u64) -> std::result::Result<u64, String> {
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", digits))?;
    n.checked_mul(unit_secs)
        .and_then(|secs| total.checked_add(secs))
        .ok_or_else(|| "Duration is too large".to_string())
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = 0u64;
        let mut digits = String::new();
        let mut parts = 0;

        for c in s.chars().filter(|c| !c.is_whitespace()) {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let Some(&(_, unit_secs)) = UNITS.iter().find(|(unit, _)| *unit == c) else {
                return Err(format!("Invalid duration unit: {}", c));
            };
            if digits.is_empty() {
                return Err(format!("Missing number before '{}'", c));
            }
            total = add_part(total, &digits, unit_secs)?;
            digits.clear();
            parts += 1;
        }

        // trailing digits count as seconds
        if !digits.is_empty() {
            total = add_part(total, &digits, 1)?;
            parts += 1;
        }

        match (parts, total) {
            (0, _) => Err("Duration must include a number".to_string()),
            (_, 0) => Err("Duration must be greater than zero".to_string()),
            _ => Ok(HumanDuration(Duration::from_secs(total))),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "newschain", author, version, about = "Cluster news headlines into narratives and summarize them", long_about = None)]
pub struct Cli {
    #[arg(long, default_value = "json", help = "Result store: json (default), memory")]
    store: String,
    #[arg(long, env = "NEWSCHAIN_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
    #[arg(long, default_value = "xai", help = "Summarizer to use. Available models: xai (default), dummy")]
    model: String,
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model_name: String,
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    api_base: String,
    #[arg(long, env = "XAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Extra attempts per batch on rate limits, server errors and timeouts
    #[arg(long, default_value_t = 0)]
    retries: u32,
    /// Per-request timeout (e.g. 90s, 2m)
    #[arg(long, default_value = "120s")]
    timeout: HumanDuration,
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: u32,
    /// JSON file listing sources as [{"name", "url", "selector"}]
    #[arg(long)]
    sources: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scrape, cluster and summarize once, printing the narratives as JSON
    Run {
        /// Keep running with the specified interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Summarize the stored narratives that have no summary yet
    Summarize,
    /// Serve the trigger and read endpoints
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
        #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
        cron_secret: Option<String>,
    },
    /// List the configured sources
    Sources,
    /// Score the stored clustering against a {"headline title": "label"} file
    Evaluate {
        ground_truth: PathBuf,
    },
    /// Forget all summarization progress
    Reset,
}

impl Cli {
    fn inference_config(&self) -> nc_inference::Config {
        nc_inference::Config {
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            model_name: self.model_name.clone(),
            base_url: self.api_base.clone(),
            max_output_tokens: self.max_output_tokens,
            timeout: self.timeout.0,
            batch_size: self.batch_size,
            retries: self.retries,
            ..nc_inference::Config::default()
        }
    }

    fn sources(&self) -> nc_core::Result<Vec<SourceConfig>> {
        match &self.sources {
            Some(path) => load_sources(path),
            None => Ok(default_sources()),
        }
    }
}

async fn open_store(cli: &Cli) -> anyhow::Result<Arc<dyn NarrativeStore>> {
    let kind: StoreKind = cli.store.parse()?;
    let store = nc_storage::create_store(kind, &cli.data_dir).await?;
    info!("💾 Store initialized successfully (using {:?} at {})", kind, cli.data_dir.display());
    Ok(store)
}

async fn build_manager(cli: &Cli, store: Arc<dyn NarrativeStore>) -> anyhow::Result<ScraperManager> {
    let config = cli.inference_config();
    let summarizer = nc_inference::create_model(&config)?;
    info!("🧠 Summarizer initialized successfully (using {})", summarizer.name());

    let pipeline = Arc::new(Pipeline::from_config(summarizer, store, &config));
    let manager = ScraperManager::from_sources(&cli.sources()?, pipeline, cli.timeout.0)?;
    info!("🦗 Scrapers initialized successfully: {}", manager.sources().join(", "));
    Ok(manager)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Sources => {
            for source in cli.sources()? {
                println!("{}\t{}\t{}", source.name, source.url, source.selector);
            }
        }
        Commands::Run { interval } => {
            let manager = build_manager(&cli, open_store(&cli).await?).await?;
            match interval {
                Some(interval) => {
                    info!("Running in periodic mode with {}s interval", interval.0.as_secs());
                    loop {
                        info!("Starting run cycle");
                        match manager.run_cycle().await {
                            Ok(narratives) => info!("✨ Cycle finished with {} narratives", narratives.len()),
                            Err(e) => error!("❌ Error during run cycle: {}", e),
                        }
                        info!("Waiting {}s before next cycle", interval.0.as_secs());
                        tokio::time::sleep(interval.0).await;
                    }
                }
                None => print_json(&manager.run_cycle().await?)?,
            }
        }
        Commands::Summarize => {
            let manager = build_manager(&cli, open_store(&cli).await?).await?;
            let narratives = manager.pipeline().summarize_outstanding().await?;
            print_json(&narratives)?;
        }
        Commands::Serve { addr, cron_secret } => {
            if cron_secret.is_none() {
                info!("⚠️ No cron secret set, trigger routes will reject every request");
            }
            let manager = build_manager(&cli, open_store(&cli).await?).await?;
            let app = nc_web::create_app(AppState::new(Arc::new(manager), cron_secret.clone()));
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("🌐 Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Evaluate { ground_truth } => {
            let labels = nc_narratives::load_ground_truth(ground_truth)?;
            let narratives = open_store(&cli)
                .await?
                .load_narratives()
                .await?
                .ok_or_else(|| nc_core::Error::NotFound("no clustered narratives have been saved".to_string()))?;
            let scores = nc_narratives::evaluate(&narratives, &labels);
            info!(
                "📊 F1 {:.4} across {} narratives ({} labelled headlines clustered)",
                scores.f1, scores.narratives, scores.clustered
            );
            print_json(&scores)?;
        }
        Commands::Reset => {
            open_store(&cli).await?.reset_summaries().await?;
            info!("🧹 Summary state cleared");
        }
    }

    Ok(())
}
