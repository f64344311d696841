/// Persistence boundary for the engine's owned state: listings, the bid
/// ledger, auto-bid ceilings, transactions and the notification queue.
/// The engine only talks to this trait; `PostgresStore` backs the service and
/// `MemoryStore` backs the unit tests.
// region:    --- Imports
use crate::auction::model::{AutoBid, Bid, Listing, NewBid, NewListing, Transaction};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod postgres;
mod queries;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
// endregion: --- Modules

// region:    --- AuctionStore

#[async_trait]
pub trait AuctionStore: Send + Sync {
    // -- Listings
    async fn insert_listing(&self, new: NewListing, now: DateTime<Utc>)
        -> Result<Listing, StoreError>;
    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;
    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError>;
    /// Persists price/status/reserve/end_time mutations made by the engine.
    async fn update_listing(&self, listing: &Listing) -> Result<(), StoreError>;
    /// Live listings whose end_time has passed, oldest end_time first.
    async fn due_listings(&self, now: DateTime<Utc>, limit: i64)
        -> Result<Vec<Listing>, StoreError>;
    /// Moves scheduled listings whose start_time has passed to live.
    async fn activate_scheduled(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // -- Bid ledger (append-only)
    async fn insert_bid(&self, bid: NewBid) -> Result<Bid, StoreError>;
    /// Ordered by amount desc, then created_at asc, then id asc.
    async fn bids_for_listing(&self, listing_id: i64) -> Result<Vec<Bid>, StoreError>;
    /// Highest amount; ties broken by earliest created_at.
    async fn highest_bid(&self, listing_id: i64) -> Result<Option<Bid>, StoreError>;

    // -- Auto-bids
    async fn upsert_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        max_amount: i64,
        now: DateTime<Utc>,
    ) -> Result<AutoBid, StoreError>;
    async fn get_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
    ) -> Result<Option<AutoBid>, StoreError>;
    /// Idempotent disable; succeeds even when no ceiling exists.
    async fn disable_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn enabled_auto_bids(&self, listing_id: i64) -> Result<Vec<AutoBid>, StoreError>;

    // -- Transactions
    /// Returns `None` when the listing already has a transaction.
    async fn insert_transaction(
        &self,
        listing_id: i64,
        buyer_id: i64,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError>;
    async fn transaction_for_listing(
        &self,
        listing_id: i64,
    ) -> Result<Option<Transaction>, StoreError>;

    // -- Users / notifications
    /// `None` when the user is unknown.
    async fn user_has_bidding_agreement(&self, user_id: i64) -> Result<Option<bool>, StoreError>;
    async fn enqueue_notification(
        &self,
        user_id: i64,
        kind: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

// endregion: --- AuctionStore
