/// Finalization: the one-time transition of an ended auction to its terminal
/// outcome. Invoked on a schedule and on demand; safe to run concurrently
/// because the status check inside each listing's lock is the guard.
// region:    --- Imports
use super::AuctionEngine;
use crate::auction::model::ListingStatus;
use crate::bidding::commands::FinalizeReport;
use crate::error::EngineError;
use crate::notify::NotificationKind;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Finalization

enum FinalizedOutcome {
    Sold,
    Ended,
}

impl AuctionEngine {
    /// Scans live listings whose end time has passed, oldest first, and
    /// settles each. A failure on one listing never aborts the batch.
    pub async fn finalize_due_auctions(
        &self,
        batch_limit: i64,
    ) -> Result<FinalizeReport, EngineError> {
        let now = self.clock.now();
        let due = self.store.due_listings(now, batch_limit).await?;

        let mut report = FinalizeReport::default();
        let mut purge_tags = Vec::new();

        for candidate in due {
            report.scanned += 1;
            match self.finalize_one(candidate.id).await {
                Ok(Some(FinalizedOutcome::Sold)) => {
                    report.sold += 1;
                    purge_tags.push(format!("listing:{}", candidate.id));
                }
                Ok(Some(FinalizedOutcome::Ended)) => {
                    report.ended += 1;
                    purge_tags.push(format!("listing:{}", candidate.id));
                }
                // Already finalized, or extended past now in the meantime.
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "{:<12} --> finalization of listing {} failed: {}",
                        "Finalize", candidate.id, e
                    );
                }
            }
        }

        if !purge_tags.is_empty() {
            self.cache.invalidate(&purge_tags).await;
        }
        if report.sold + report.ended > 0 {
            info!(
                "{:<12} --> finalized {} listings ({} sold, {} ended)",
                "Finalize",
                report.sold + report.ended,
                report.sold,
                report.ended
            );
        }
        Ok(report)
    }

    async fn finalize_one(&self, listing_id: i64) -> Result<Option<FinalizedOutcome>, EngineError> {
        let _guard = self.lock_listing(listing_id).await?;
        let mut listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        // Re-check under the lock: a concurrent finalizer may have settled
        // this listing, or a late bid may have extended it.
        let now = self.clock.now();
        if listing.status != ListingStatus::Live || listing.end_time > now {
            return Ok(None);
        }

        let highest = self.store.highest_bid(listing.id).await?;
        let outcome = match highest {
            None => {
                listing.status = ListingStatus::Ended;
                self.store.update_listing(&listing).await?;
                self.notifier
                    .notify(
                        listing.owner_id,
                        NotificationKind::ListingEndedSeller,
                        serde_json::json!({
                            "listing_id": listing.id,
                            "outcome": "no_bids",
                        }),
                    )
                    .await;
                FinalizedOutcome::Ended
            }
            Some(high) => {
                let reserve_ok = listing.reserve_price.is_none_or(|r| high.amount >= r);
                if reserve_ok {
                    let final_price = listing.current_price;
                    self.settle_sold(&mut listing, high.bidder_id, final_price)
                        .await?;
                    FinalizedOutcome::Sold
                } else {
                    listing.status = ListingStatus::Ended;
                    listing.reserve_met = false;
                    self.store.update_listing(&listing).await?;
                    // Distinct signal so seller and high bidder can still
                    // make contact off-auction.
                    self.notifier
                        .notify(
                            listing.owner_id,
                            NotificationKind::ReserveNotMet,
                            serde_json::json!({
                                "listing_id": listing.id,
                                "highest_bid": high.amount,
                                "highest_bidder_id": high.bidder_id,
                            }),
                        )
                        .await;
                    FinalizedOutcome::Ended
                }
            }
        };

        Ok(Some(outcome))
    }

    /// Moves scheduled listings whose start time has arrived to live.
    pub async fn activate_due_listings(&self) -> Result<u64, EngineError> {
        Ok(self.store.activate_scheduled(self.clock.now()).await?)
    }
}

// endregion: --- Finalization
