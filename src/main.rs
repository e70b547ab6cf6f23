//! Runtime entry point: build the collaborators once, fail fast if the
//! shared store is unreachable, then serve.
//!
//! App crates embedding this runtime register their owner in the
//! [`AppRegistry`](stagehand::apps::AppRegistry) before starting the
//! server; this reference binary wires an empty registry.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stagehand::apps::AppRegistry;
use stagehand::config::RuntimeConfig;
use stagehand::coordinator::ExecutionCoordinator;
use stagehand::events::{EventSink, LogSink};
use stagehand::server;
use stagehand::store::StoreFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = RuntimeConfig::from_env().context("invalid runtime configuration")?;
    info!(app_name = %config.app_name, "Starting runtime");

    let store = StoreFactory::from_config(&config.store)
        .await
        .context("could not create shared store")?;
    store
        .ping()
        .await
        .context("could not reach shared store; refusing to serve")?;

    let apps = Arc::new(AppRegistry::new());
    if apps.is_empty() {
        warn!("No owners registered; every execution request will be rejected");
    }
    let sink: Arc<dyn EventSink> = Arc::new(LogSink);

    let coordinator = Arc::new(ExecutionCoordinator::new(&config, store, apps, sink));
    server::serve(&config.bind_addr, coordinator).await
}
