/// Recurring trigger for the engine's time-driven work: activating scheduled
/// listings and finalizing auctions whose end time has passed. Redundant
/// ticks are harmless; finalization is idempotent.
// region:    --- Imports
use crate::engine::AuctionEngine;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, error};
// endregion: --- Imports

// region:    --- EngineScheduler

pub struct EngineScheduler {
    engine: Arc<AuctionEngine>,
    tick: std::time::Duration,
    batch_limit: i64,
}

impl EngineScheduler {
    pub fn new(engine: Arc<AuctionEngine>, tick: std::time::Duration, batch_limit: i64) -> Self {
        Self { engine, tick, batch_limit }
    }

    pub fn start(&self) {
        let engine = Arc::clone(&self.engine);
        let tick = self.tick;
        let batch_limit = self.batch_limit;
        tokio::spawn(async move {
            let mut interval = interval(tick);
            loop {
                interval.tick().await;

                match engine.activate_due_listings().await {
                    Ok(activated) if activated > 0 => {
                        debug!("{:<12} --> activated {} listings", "Scheduler", activated);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("{:<12} --> activation tick failed: {}", "Scheduler", e);
                    }
                }

                if let Err(e) = engine.finalize_due_auctions(batch_limit).await {
                    error!("{:<12} --> finalization tick failed: {}", "Scheduler", e);
                }
            }
        });
    }
}

// endregion: --- EngineScheduler
