use anyhow::Context;
use completion_client::{CompletionClient, OpenAiClient, UnconfiguredClient};
use po_core::analysis::build_agent;
use po_core::config::{Config, StorageBackend};
use po_core::repository::{RedbStore, Repositories};
use po_core::training::TrainingStore;
use po_core::ProductOwner;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Loaded configuration plus the repositories it selects.
pub struct AppContext {
    pub config: Config,
    pub repos: Repositories,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = Config::load(config_path).context("failed to load config")?;
        let repos = match config.storage.backend()? {
            StorageBackend::Memory => Repositories::in_memory(),
            StorageBackend::Redb(path) => {
                let store = RedbStore::open(&path)
                    .with_context(|| format!("failed to open store at {}", path.display()))?;
                Repositories::redb(&store)
            }
        };
        Ok(Self { config, repos })
    }

    /// The orchestrator, wired to the configured completion endpoint. Without
    /// an API key the workflows that never consult the model still run; the
    /// others fail at their first completion call.
    pub fn product_owner(&self) -> anyhow::Result<ProductOwner> {
        let client: Arc<dyn CompletionClient> = match self.config.completion.client_config() {
            Ok(client_config) => Arc::new(
                OpenAiClient::new(client_config).context("failed to build completion client")?,
            ),
            Err(e) => {
                debug!(reason = %e, "completion client not configured");
                Arc::new(UnconfiguredClient::new(e.to_string()))
            }
        };
        let training = Arc::new(TrainingStore::new(self.config.training.capacity));
        let agent = build_agent(
            self.config.agent.kind,
            client,
            self.config.completion.options(),
            training,
        );
        Ok(ProductOwner::new(self.repos.clone(), agent))
    }
}

/// Drive one async workflow to completion from a synchronous command.
pub fn block_on<F: std::future::Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(fut))
}
