use anyhow::Context;
use attesta_config::{NodeConfig, StorageBackend};
use attesta_engine::{AffidavitService, ServiceDeps};
use attesta_identity::profile::MemoryProfileStore;
use attesta_types::content::{MemoryContentStore, MemoryUploadStore};
use attesta_types::ledger::MemoryLedger;
use attesta_types::store::{
    MemoryAffidavitStore, MemoryRequestStore, MemorySequenceStore, SledBackend,
};
use chrono::Duration;
use std::sync::Arc;

/// Build the service facade from the configured storage backend.
///
/// The profile store, upload store, content store, and ledger are
/// external collaborators in production; the in-process implementations
/// wired here stand in for them on local single-node runs.
pub fn build_service(config: &NodeConfig) -> anyhow::Result<AffidavitService> {
    let deps = match config.storage.backend {
        StorageBackend::Sled => {
            let backend = SledBackend::open(&config.storage.path)
                .with_context(|| format!("opening sled store at {:?}", config.storage.path))?;
            ServiceDeps {
                requests: Arc::new(backend.request_store()?),
                affidavits: Arc::new(backend.affidavit_store()?),
                sequences: Arc::new(backend.sequence_store()?),
                uploads: Arc::new(MemoryUploadStore::new()),
                contents: Arc::new(MemoryContentStore::new()),
                profiles: Arc::new(MemoryProfileStore::new()),
                ledger: Arc::new(MemoryLedger::new()),
            }
        }
        StorageBackend::Memory => ServiceDeps {
            requests: Arc::new(MemoryRequestStore::new()),
            affidavits: Arc::new(MemoryAffidavitStore::new()),
            sequences: Arc::new(MemorySequenceStore::new()),
            uploads: Arc::new(MemoryUploadStore::new()),
            contents: Arc::new(MemoryContentStore::new()),
            profiles: Arc::new(MemoryProfileStore::new()),
            ledger: Arc::new(MemoryLedger::new()),
        },
    };
    Ok(AffidavitService::new(deps))
}

/// Run the node: the service plus the periodic reconciliation sweep,
/// until ctrl-c.
pub async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    tracing::info!(service = %config.service.name, "starting attesta node");

    let service = Arc::new(build_service(&config)?);

    let sweep_handle = if config.reconciliation.enabled {
        let reconciler = service.reconciler(Duration::seconds(
            config.reconciliation.min_age_secs as i64,
        ));
        let interval_secs = config.reconciliation.interval_secs;
        Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                if let Err(e) = reconciler.sweep().await {
                    tracing::error!(error = %e, "reconciliation sweep failed");
                }
            }
        }))
    } else {
        tracing::info!("reconciliation sweep disabled by configuration");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("installing ctrl-c handler")?;
    tracing::info!("shutdown signal received, exiting");

    if let Some(handle) = sweep_handle {
        handle.abort();
    }
    Ok(())
}
