/// The bidding engine: validates and commits bids, escalates proxy ceilings,
/// extends end times against sniping, and finalizes ended auctions.
///
/// All mutation of one listing happens under that listing's lock; different
/// listings proceed in parallel. The proxy escalation loop runs inside the
/// triggering bid's critical section so no external bid can observe a
/// half-resolved cascade.
// region:    --- Imports
use crate::auction::model::{AutoBid, Bid, Listing, ListingStatus, NewBid, Transaction};
use crate::bidding::commands::{BuyNowCommand, PlaceBidCommand, PlaceBidOutcome, SetAutoBidCommand};
use crate::bidding::rate_limit::RateLimiter;
use crate::bidding::{autobid, ledger};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{EngineError, StoreError};
use crate::notify::{CacheInvalidator, NotificationKind, Notifier};
use crate::store::AuctionStore;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::info;
// endregion: --- Imports

// region:    --- Modules
mod finalize;
// endregion: --- Modules

// region:    --- LockMap

/// One async mutex per listing id, created on first use.
struct LockMap {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    fn for_listing(&self, listing_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(listing_id).or_default())
    }
}

// endregion: --- LockMap

// region:    --- AuctionEngine

pub struct AuctionEngine {
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn CacheInvalidator>,
    rate_limiter: Arc<dyn RateLimiter>,
    config: Config,
    locks: LockMap,
}

impl AuctionEngine {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn CacheInvalidator>,
        rate_limiter: Arc<dyn RateLimiter>,
        config: Config,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            cache,
            rate_limiter,
            config,
            locks: LockMap::new(),
        }
    }

    pub fn store(&self) -> &dyn AuctionStore {
        &*self.store
    }

    /// Enters the listing's critical section, bounded by the lock timeout.
    async fn lock_listing(&self, listing_id: i64) -> Result<OwnedMutexGuard<()>, EngineError> {
        let lock = self.locks.for_listing(listing_id);
        tokio::time::timeout(self.config.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| EngineError::ContentionTimeout)
    }

    // -- place_bid

    pub async fn place_bid(&self, cmd: PlaceBidCommand) -> Result<PlaceBidOutcome, EngineError> {
        if cmd.amount < 1 {
            return Err(EngineError::Validation(
                "bid amount must be at least 1".to_string(),
            ));
        }

        let _guard = self.lock_listing(cmd.listing_id).await?;
        let mut listing = self
            .store
            .get_listing(cmd.listing_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        let now = self.clock.now();
        if !listing.is_open_at(now) {
            return Err(EngineError::NotLive { status: listing.status });
        }
        if cmd.bidder_id == listing.owner_id {
            return Err(EngineError::SelfBid);
        }

        let minimum =
            ledger::next_minimum_bid(&*self.store, &self.config.increment_policy, &listing).await?;
        if cmd.amount < minimum {
            return Err(EngineError::BelowMinimum { minimum_required: minimum });
        }

        self.rate_limiter
            .check(cmd.bidder_id, cmd.listing_id, now)
            .map_err(|retry_after_ms| EngineError::RateLimited { retry_after_ms })?;

        let mut superseded = Vec::new();
        self.accept_bid(&mut listing, cmd.bidder_id, cmd.amount, false, &mut superseded)
            .await?;
        self.rate_limiter.record(cmd.bidder_id, cmd.listing_id, now);

        let mut auto_bids_placed = 0;
        if listing.status != ListingStatus::Sold {
            auto_bids_placed = self.resolve_competition(&mut listing, &mut superseded).await?;
        }

        let highest = self
            .store
            .highest_bid(listing.id)
            .await?
            .ok_or_else(|| {
                EngineError::Store(StoreError::Internal(
                    "ledger empty after accepted bid".to_string(),
                ))
            })?;

        self.notify_superseded(&listing, &superseded, highest.bidder_id).await;
        if listing.status == ListingStatus::Sold {
            self.cache.invalidate(&[format!("listing:{}", listing.id)]).await;
        }

        info!(
            "{:<12} --> bid accepted: listing {} price {} bidder {} ({} auto)",
            "Engine", listing.id, listing.current_price, highest.bidder_id, auto_bids_placed
        );

        Ok(PlaceBidOutcome {
            listing_id: listing.id,
            accepted_amount: cmd.amount.min(listing.buy_now_price.unwrap_or(i64::MAX)),
            current_price: listing.current_price,
            highest_bidder_id: highest.bidder_id,
            end_time: listing.end_time,
            sold: listing.status == ListingStatus::Sold,
            auto_bids_placed,
        })
    }

    // -- buy_now

    /// Direct purchase at the listed buy-now price; ends the auction
    /// immediately as a sale.
    pub async fn buy_now(&self, cmd: BuyNowCommand) -> Result<PlaceBidOutcome, EngineError> {
        let _guard = self.lock_listing(cmd.listing_id).await?;
        let mut listing = self
            .store
            .get_listing(cmd.listing_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        let now = self.clock.now();
        if !listing.is_open_at(now) {
            return Err(EngineError::NotLive { status: listing.status });
        }
        if cmd.buyer_id == listing.owner_id {
            return Err(EngineError::SelfBid);
        }
        let price = listing.buy_now_price.ok_or(EngineError::BuyNowUnavailable)?;

        let mut superseded = Vec::new();
        self.accept_bid(&mut listing, cmd.buyer_id, price, false, &mut superseded)
            .await?;

        self.notify_superseded(&listing, &superseded, cmd.buyer_id).await;
        self.cache.invalidate(&[format!("listing:{}", listing.id)]).await;

        Ok(PlaceBidOutcome {
            listing_id: listing.id,
            accepted_amount: price,
            current_price: listing.current_price,
            highest_bidder_id: cmd.buyer_id,
            end_time: listing.end_time,
            sold: true,
            auto_bids_placed: 0,
        })
    }

    // -- Acceptance (lock held)

    /// Commits one validated bid: appends to the ledger, bumps the price,
    /// tracks the reserve, short-circuits buy-now, and extends the end time
    /// when the bid lands inside the anti-snipe window.
    async fn accept_bid(
        &self,
        listing: &mut Listing,
        bidder_id: i64,
        amount: i64,
        is_auto_bid: bool,
        superseded: &mut Vec<i64>,
    ) -> Result<Bid, EngineError> {
        let now = self.clock.now();

        if let Some(previous) = self.store.highest_bid(listing.id).await? {
            if previous.bidder_id != bidder_id {
                superseded.push(previous.bidder_id);
            }
        }

        let buy_now_hit = listing.buy_now_price.is_some_and(|p| amount >= p);
        // A bid at or over the buy-now price settles at exactly that price.
        let effective_amount = if buy_now_hit {
            listing.buy_now_price.unwrap_or(amount)
        } else {
            amount
        };

        let bid = self
            .store
            .insert_bid(NewBid {
                listing_id: listing.id,
                bidder_id,
                amount: effective_amount,
                is_auto_bid,
                created_at: now,
            })
            .await?;

        listing.current_price = listing.current_price.max(effective_amount);
        if let Some(reserve) = listing.reserve_price {
            if effective_amount >= reserve {
                listing.reserve_met = true;
            }
        }

        if buy_now_hit {
            self.settle_sold(listing, bidder_id, effective_amount).await?;
            return Ok(bid);
        }

        // Anti-snipe: a late bid pushes the end out by a fixed extension.
        if listing.end_time - now <= self.config.snipe_window {
            listing.end_time += self.config.snipe_extension;
            info!(
                "{:<12} --> anti-snipe: listing {} extended to {}",
                "Engine", listing.id, listing.end_time
            );
        }

        self.store.update_listing(listing).await?;
        Ok(bid)
    }

    /// Proxy escalation. One bounded pass: each auto-bidder counters at most
    /// once, the highest ceiling goes first, and the loop stops when nobody
    /// left can beat the standing price. Runs entirely under the listing lock.
    async fn resolve_competition(
        &self,
        listing: &mut Listing,
        superseded: &mut Vec<i64>,
    ) -> Result<u32, EngineError> {
        let auto_bids: Vec<AutoBid> = self.store.enabled_auto_bids(listing.id).await?;
        if auto_bids.is_empty() {
            return Ok(0);
        }

        let mut visited: HashSet<i64> = HashSet::new();
        let mut placed = 0;

        // Termination bound: one counter-bid per distinct auto-bidder.
        for _ in 0..auto_bids.len() {
            let current_bidder = self
                .store
                .highest_bid(listing.id)
                .await?
                .map(|b| b.bidder_id);
            let next_min =
                ledger::next_minimum_bid(&*self.store, &self.config.increment_policy, listing)
                    .await?;

            let Some(candidate) = autobid::select_counter_bidder(
                &auto_bids,
                current_bidder,
                listing.owner_id,
                &visited,
                next_min,
            ) else {
                break;
            };

            visited.insert(candidate.user_id);
            let amount = autobid::counter_amount(candidate, next_min);
            self.accept_bid(listing, candidate.user_id, amount, true, superseded)
                .await?;
            placed += 1;

            if listing.status == ListingStatus::Sold {
                break;
            }
        }

        Ok(placed)
    }

    /// Outbid notifications fire once per distinct user ultimately superseded
    /// in the pass; intermediate cascade steps do not each produce one.
    async fn notify_superseded(
        &self,
        listing: &Listing,
        superseded: &[i64],
        final_highest_bidder: i64,
    ) {
        let mut notified = HashSet::new();
        for user_id in superseded {
            if *user_id == final_highest_bidder || !notified.insert(*user_id) {
                continue;
            }
            self.notifier
                .notify(
                    *user_id,
                    NotificationKind::BidOutbid,
                    serde_json::json!({
                        "listing_id": listing.id,
                        "current_price": listing.current_price,
                    }),
                )
                .await;
        }
    }

    /// One-time transition to sold plus its side effects. The transaction
    /// insert is the duplicate guard: side effects only fire when a row was
    /// actually created.
    async fn settle_sold(
        &self,
        listing: &mut Listing,
        buyer_id: i64,
        final_price: i64,
    ) -> Result<Option<Transaction>, EngineError> {
        let now = self.clock.now();
        listing.status = ListingStatus::Sold;
        listing.current_price = listing.current_price.max(final_price);
        self.store.update_listing(listing).await?;

        let transaction = self
            .store
            .insert_transaction(listing.id, buyer_id, final_price, now)
            .await?;

        if transaction.is_some() {
            self.notifier
                .notify(
                    buyer_id,
                    NotificationKind::AuctionWon,
                    serde_json::json!({
                        "listing_id": listing.id,
                        "final_price": final_price,
                    }),
                )
                .await;
            self.notifier
                .notify(
                    listing.owner_id,
                    NotificationKind::ListingEndedSeller,
                    serde_json::json!({
                        "listing_id": listing.id,
                        "outcome": "sold",
                        "final_price": final_price,
                        "buyer_id": buyer_id,
                    }),
                )
                .await;
        }

        Ok(transaction)
    }

    // -- Auto-bid ceilings

    pub async fn set_auto_bid(&self, cmd: SetAutoBidCommand) -> Result<AutoBid, EngineError> {
        if cmd.max_amount < 1 {
            return Err(EngineError::Validation(
                "auto-bid ceiling must be at least 1".to_string(),
            ));
        }

        match self.store.user_has_bidding_agreement(cmd.user_id).await? {
            None => return Err(EngineError::NotFound),
            Some(false) => return Err(EngineError::AgreementRequired),
            Some(true) => {}
        }

        let _guard = self.lock_listing(cmd.listing_id).await?;
        let listing = self
            .store
            .get_listing(cmd.listing_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        if listing.status.is_terminal() {
            return Err(EngineError::NotLive { status: listing.status });
        }
        if cmd.user_id == listing.owner_id {
            return Err(EngineError::SelfBid);
        }

        let minimum =
            ledger::next_minimum_bid(&*self.store, &self.config.increment_policy, &listing).await?;
        if cmd.max_amount < minimum {
            return Err(EngineError::BelowMinimum { minimum_required: minimum });
        }

        let now = self.clock.now();
        let auto_bid = self
            .store
            .upsert_auto_bid(cmd.user_id, cmd.listing_id, cmd.max_amount, now)
            .await?;

        info!(
            "{:<12} --> auto-bid set: listing {} user {} ceiling {}",
            "Engine", cmd.listing_id, cmd.user_id, cmd.max_amount
        );
        Ok(auto_bid)
    }

    /// Idempotent; succeeds whether or not a ceiling exists.
    pub async fn cancel_auto_bid(&self, user_id: i64, listing_id: i64) -> Result<(), EngineError> {
        let _guard = self.lock_listing(listing_id).await?;
        let now = self.clock.now();
        self.store.disable_auto_bid(user_id, listing_id, now).await?;
        Ok(())
    }

    pub async fn get_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
    ) -> Result<Option<AutoBid>, EngineError> {
        Ok(self.store.get_auto_bid(user_id, listing_id).await?)
    }

    // -- Reads

    pub async fn get_listing(&self, listing_id: i64) -> Result<Listing, EngineError> {
        self.store
            .get_listing(listing_id)
            .await?
            .ok_or(EngineError::NotFound)
    }

    pub async fn all_listings(&self) -> Result<Vec<Listing>, EngineError> {
        Ok(self.store.all_listings().await?)
    }

    pub async fn bid_history(&self, listing_id: i64) -> Result<Vec<Bid>, EngineError> {
        self.get_listing(listing_id).await?;
        Ok(self.store.bids_for_listing(listing_id).await?)
    }

    pub async fn next_minimum_bid(&self, listing_id: i64) -> Result<i64, EngineError> {
        let listing = self.get_listing(listing_id).await?;
        Ok(ledger::next_minimum_bid(&*self.store, &self.config.increment_policy, &listing).await?)
    }
}

// endregion: --- AuctionEngine
