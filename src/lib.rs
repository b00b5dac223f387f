pub mod backend;
pub mod config;
pub mod dialogue;
pub mod host;
pub mod runtime;
pub mod store;
pub mod utils;

use crate::backend::{ContactSink, HttpBackend, LocalCatalog, LoggingContactSink, ProductMatcher};
use crate::dialogue::config::{load_config, save_config};
use crate::dialogue::{DialoguePack, FlowController, FunnelConfig};
use crate::runtime::FunnelRuntime;
use crate::store::JsonFileStore;
use crate::utils::http::RetryPolicy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("forest_guide_lib=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    // Compute app data dir the same way the visit store does
    let app_data = dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("com.forest.guide");
    let config_path = std::env::var_os("FOREST_GUIDE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data.join("funnel_config.json"));

    if !config_path.exists() {
        // Seed an editable file on first run
        if let Err(e) = save_config(&config_path, &FunnelConfig::default()) {
            tracing::warn!("[Config] Could not write default config: {}", e);
        }
    }
    let config = load_config(&config_path);
    config.validate()?;

    let pack = match &config.dialogue_path {
        Some(path) => DialoguePack::load(path)?,
        None => DialoguePack::builtin(),
    };

    let store_path = config
        .store_path
        .clone()
        .unwrap_or_else(JsonFileStore::default_path);
    let mut store = JsonFileStore::open(store_path);

    let mut controller = FlowController::new(pack, config.clone(), StdRng::from_entropy());
    controller.detect_returning(&mut store, chrono::Utc::now());

    let (matcher, sink) = backends(&config)?;
    let (handle, task) = FunnelRuntime::spawn(controller, matcher, sink, config.idle_timeout());

    host::run_terminal(handle).await?;
    task.await?;
    Ok(())
}

/// Remote endpoints where configured, the in-process demo catalog otherwise.
fn backends(
    config: &FunnelConfig,
) -> anyhow::Result<(Arc<dyn ProductMatcher>, Arc<dyn ContactSink>)> {
    let product_url = config.resolve_product_url();
    let contact_url = config.resolve_contact_url();
    if product_url.is_none() && contact_url.is_none() {
        tracing::info!("[Backend] No endpoints configured, using the local demo catalog");
        let matcher: Arc<dyn ProductMatcher> = Arc::new(LocalCatalog::demo());
        let sink: Arc<dyn ContactSink> = Arc::new(LoggingContactSink);
        return Ok((matcher, sink));
    }

    let retry = RetryPolicy {
        max_retries: config.http_max_retries,
        ..RetryPolicy::default()
    };
    let has_product = product_url.is_some();
    let has_contact = contact_url.is_some();
    let http = Arc::new(HttpBackend::new(
        product_url,
        contact_url,
        Duration::from_secs(config.http_timeout_secs),
        retry,
    )?);

    let matcher: Arc<dyn ProductMatcher> = if has_product {
        http.clone()
    } else {
        Arc::new(LocalCatalog::demo())
    };
    let sink: Arc<dyn ContactSink> = if has_contact {
        http
    } else {
        Arc::new(LoggingContactSink)
    };
    Ok((matcher, sink))
}
