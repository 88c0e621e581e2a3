use std::sync::Arc;

use anyhow::{Context, Result};
use hedge_engine::HedgeEngine;
use inventory::InventoryManager;
use ledger_store::reconciliation::ReconciliationSweep;
use ledger_store::{InMemoryLedgerStore, LedgerStore};
use matching_engine::MatchingEngine;
use tracing::info;

use crate::config::GatewayConfig;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub inventory: InventoryManager,
    pub matching: MatchingEngine,
    pub hedges: HedgeEngine,
    pub orchestrator: Orchestrator,
    pub reconciliation: Arc<ReconciliationSweep>,
}

impl AppState {
    /// Wire the engines over `store` and bootstrap every configured metal
    pub fn new(config: &GatewayConfig, store: Arc<dyn LedgerStore>) -> Result<Self> {
        let inventory = InventoryManager::with_config(store.clone(), config.inventory_config()?);
        let matching = MatchingEngine::with_config(store.clone(), config.matching_config()?);
        let hedges = HedgeEngine::with_config(store.clone(), config.hedge_config());

        for setup in config.metal_setups()? {
            inventory
                .bootstrap(setup.metal, setup.bootstrap)
                .with_context(|| format!("failed to bootstrap {}", setup.metal))?;
            matching
                .bootstrap(setup.metal)
                .with_context(|| format!("failed to bootstrap flow for {}", setup.metal))?;
            info!(
                metal = %setup.metal,
                initial_stock = %setup.bootstrap.initial_stock,
                vault_capacity = %setup.limits.vault_capacity,
                exposure_band = %setup.limits.exposure_band,
                "Metal ready"
            );
        }

        let orchestrator = Orchestrator::new(
            inventory.clone(),
            matching.clone(),
            hedges.clone(),
            config.policy,
        );

        Ok(Self {
            store,
            inventory,
            matching,
            hedges,
            orchestrator,
            reconciliation: Arc::new(ReconciliationSweep::new(config.reconciliation_config())),
        })
    }

    /// State over a fresh in-memory store
    pub fn in_memory(config: &GatewayConfig) -> Result<Self> {
        Self::new(config, Arc::new(InMemoryLedgerStore::new()))
    }
}
