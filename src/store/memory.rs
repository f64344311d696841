/// In-memory store used by the engine's unit and scenario tests. Mirrors the
/// ordering and uniqueness guarantees of the Postgres schema.
// region:    --- Imports
use super::AuctionStore;
use crate::auction::model::{
    AutoBid, Bid, Listing, ListingStatus, NewBid, NewListing, Transaction, TransactionStatus,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
// endregion: --- Imports

// region:    --- MemoryStore

#[derive(Default)]
struct Inner {
    listings: HashMap<i64, Listing>,
    bids: Vec<Bid>,
    auto_bids: HashMap<(i64, i64), AutoBid>,
    transactions: HashMap<i64, Transaction>,
    users: HashMap<i64, bool>,
    notifications: Vec<(i64, String, serde_json::Value)>,
    next_listing_id: i64,
    next_bid_id: i64,
    next_auto_bid_id: i64,
    next_transaction_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and their bidding-agreement flag.
    pub async fn upsert_user(&self, user_id: i64, agreement_accepted: bool) {
        self.inner.write().await.users.insert(user_id, agreement_accepted);
    }

    /// Snapshot of enqueued notifications, for assertions.
    pub async fn notifications(&self) -> Vec<(i64, String, serde_json::Value)> {
        self.inner.read().await.notifications.clone()
    }
}

fn ledger_order(a: &Bid, b: &Bid) -> std::cmp::Ordering {
    b.amount
        .cmp(&a.amount)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn insert_listing(
        &self,
        new: NewListing,
        now: DateTime<Utc>,
    ) -> Result<Listing, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_listing_id += 1;
        let listing = Listing {
            id: inner.next_listing_id,
            owner_id: new.owner_id,
            status: new.status,
            start_price: new.start_price,
            current_price: new.start_price,
            reserve_price: new.reserve_price,
            reserve_met: false,
            buy_now_price: new.buy_now_price,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: now,
        };
        inner.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        Ok(self.inner.read().await.listings.get(&id).cloned())
    }

    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let inner = self.inner.read().await;
        let mut listings: Vec<_> = inner.listings.values().cloned().collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listings)
    }

    async fn update_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.listings.get_mut(&listing.id) {
            Some(existing) => {
                *existing = listing.clone();
                Ok(())
            }
            None => Err(StoreError::Internal(format!(
                "update of unknown listing {}",
                listing.id
            ))),
        }
    }

    async fn due_listings(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let inner = self.inner.read().await;
        let mut due: Vec<_> = inner
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Live && l.end_time <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.end_time.cmp(&b.end_time).then(a.id.cmp(&b.id)));
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn activate_scheduled(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut activated = 0;
        for listing in inner.listings.values_mut() {
            if listing.status == ListingStatus::Scheduled && listing.start_time <= now {
                listing.status = ListingStatus::Live;
                activated += 1;
            }
        }
        Ok(activated)
    }

    async fn insert_bid(&self, bid: NewBid) -> Result<Bid, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_bid_id += 1;
        let bid = Bid {
            id: inner.next_bid_id,
            listing_id: bid.listing_id,
            bidder_id: bid.bidder_id,
            amount: bid.amount,
            is_auto_bid: bid.is_auto_bid,
            created_at: bid.created_at,
        };
        inner.bids.push(bid.clone());
        Ok(bid)
    }

    async fn bids_for_listing(&self, listing_id: i64) -> Result<Vec<Bid>, StoreError> {
        let inner = self.inner.read().await;
        let mut bids: Vec<_> = inner
            .bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        bids.sort_by(ledger_order);
        Ok(bids)
    }

    async fn highest_bid(&self, listing_id: i64) -> Result<Option<Bid>, StoreError> {
        Ok(self.bids_for_listing(listing_id).await?.into_iter().next())
    }

    async fn upsert_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        max_amount: i64,
        now: DateTime<Utc>,
    ) -> Result<AutoBid, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_auto_bid_id += 1;
        let next_id = inner.next_auto_bid_id;
        let auto_bid = inner
            .auto_bids
            .entry((user_id, listing_id))
            .and_modify(|ab| {
                ab.max_amount = max_amount;
                ab.enabled = true;
                ab.updated_at = now;
            })
            .or_insert(AutoBid {
                id: next_id,
                user_id,
                listing_id,
                max_amount,
                enabled: true,
                created_at: now,
                updated_at: now,
            });
        Ok(auto_bid.clone())
    }

    async fn get_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
    ) -> Result<Option<AutoBid>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .auto_bids
            .get(&(user_id, listing_id))
            .cloned())
    }

    async fn disable_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(ab) = inner.auto_bids.get_mut(&(user_id, listing_id)) {
            ab.enabled = false;
            ab.updated_at = now;
        }
        Ok(())
    }

    async fn enabled_auto_bids(&self, listing_id: i64) -> Result<Vec<AutoBid>, StoreError> {
        let inner = self.inner.read().await;
        let mut auto_bids: Vec<_> = inner
            .auto_bids
            .values()
            .filter(|ab| ab.listing_id == listing_id && ab.enabled)
            .cloned()
            .collect();
        auto_bids.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(auto_bids)
    }

    async fn insert_transaction(
        &self,
        listing_id: i64,
        buyer_id: i64,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.transactions.contains_key(&listing_id) {
            return Ok(None);
        }
        inner.next_transaction_id += 1;
        let transaction = Transaction {
            id: inner.next_transaction_id,
            listing_id,
            buyer_id,
            final_price,
            status: TransactionStatus::Pending,
            created_at: now,
        };
        inner.transactions.insert(listing_id, transaction.clone());
        Ok(Some(transaction))
    }

    async fn transaction_for_listing(
        &self,
        listing_id: i64,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.read().await.transactions.get(&listing_id).cloned())
    }

    async fn user_has_bidding_agreement(&self, user_id: i64) -> Result<Option<bool>, StoreError> {
        Ok(self.inner.read().await.users.get(&user_id).copied())
    }

    async fn enqueue_notification(
        &self,
        user_id: i64,
        kind: &str,
        payload: &serde_json::Value,
        _now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .notifications
            .push((user_id, kind.to_string(), payload.clone()));
        Ok(())
    }
}

// endregion: --- MemoryStore

// endregion: --- Tests
