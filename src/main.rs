mod config;
mod diff;
mod docs;
mod extract;
mod report;
mod score;
mod state;
mod watch;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::WatchConfig;
use docs::auth::Credentials;
use docs::google::GoogleDocsSource;
use score::RelevanceScorer;
use watch::Watcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(dotenv::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match WatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    let credentials = match Credentials::from_env(&config.token_file) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Missing Google credentials: {}", e);
            std::process::exit(1);
        }
    };

    // Init source; fails fast if the refresh token is rejected
    let source = match GoogleDocsSource::connect(credentials).await {
        Ok(source) => source,
        Err(e) => {
            error!("Google authentication failed: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Google Docs client authenticated");

    // Init scorer; model weights load once here
    let scorer = match RelevanceScorer::from_config(&config.scoring).await {
        Ok(scorer) => scorer,
        Err(e) => {
            error!(
                strategy = ?config.scoring.strategy,
                model = %config.scoring.embedding_model,
                "Scorer unavailable, check SCORING_STRATEGY / EMBEDDING_MODEL: {:#}",
                e
            );
            std::process::exit(1);
        }
    };

    let mut watcher = Watcher::new(source, scorer, &config);
    watcher.run().await;

    Ok(())
}
