//! statszone-crawler binary
//!
//! Loads the configuration, prepares the store and runs one crawl. Ctrl-C
//! cancels the run; everything already committed stays committed.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use statszone_crawler::crawling::{CrawlingOrchestrator, OrchestratorConfig, SharedState};
use statszone_crawler::domain::Store;
use statszone_crawler::infrastructure::logging::{init_logging_with_config, log_system_info};
use statszone_crawler::infrastructure::{
    AppConfig, ConfigManager, ConfigOrigin, DatabaseConnection, ExtractionTables, HttpClient,
    HttpClientConfig, InMemoryStore, PageParsers, SqliteStore, StoreKind,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let (config, origin) = config_manager.load_config().await?;

    init_logging_with_config(config.logging.clone())?;
    log_system_info();
    match origin {
        ConfigOrigin::Loaded => {
            info!("📋 Configuration: {}", config_manager.config_path().display());
        }
        ConfigOrigin::CreatedDefault => info!(
            "📋 No configuration found, wrote defaults to {}",
            config_manager.config_path().display()
        ),
    }

    let store = open_store(&config).await?;
    let shared_state = Arc::new(SharedState::new());

    let http_client = HttpClient::new(
        HttpClientConfig::from(config.http.clone()),
        shared_state.cancellation_token.clone(),
    )?;
    let parsers = PageParsers::new(&config.selectors, Arc::new(ExtractionTables::new()))
        .context("Invalid selector configuration")?;

    let ctrl_c_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, shutting down");
            ctrl_c_state.request_shutdown();
        }
    });

    let orchestrator = CrawlingOrchestrator::new(
        OrchestratorConfig::from(&config),
        Arc::new(http_client),
        store,
        Arc::new(parsers),
        shared_state,
    );

    match orchestrator.run().await {
        Ok(_) => {
            info!("🎉 Crawl completed");
            Ok(())
        }
        Err(e) if e.is_cancellation() => {
            warn!("Crawl cancelled before completion");
            Ok(())
        }
        Err(e) => {
            error!("💥 Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.store.kind {
        StoreKind::Sqlite => {
            let db = DatabaseConnection::new(
                &config.store.database_url,
                config.store.max_connections,
            )
            .await?;
            db.migrate().await?;
            Ok(Arc::new(SqliteStore::new(db.into_pool())))
        }
        StoreKind::Memory => {
            warn!("In-memory store selected, nothing will be persisted");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
