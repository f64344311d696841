// region:    --- Imports
use super::{queries, AuctionStore};
use crate::auction::model::{
    AutoBid, Bid, Listing, ListingStatus, NewBid, NewListing, Transaction, TransactionStatus,
};
use crate::database::DatabaseManager;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Row};
use std::sync::Arc;
// endregion: --- Imports

// region:    --- Row Mapping

/// Raw listing row; status is TEXT in the schema.
#[derive(FromRow)]
struct ListingRow {
    id: i64,
    owner_id: i64,
    status: String,
    start_price: i64,
    current_price: i64,
    reserve_price: Option<i64>,
    reserve_met: bool,
    buy_now_price: Option<i64>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, StoreError> {
        let status = ListingStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Internal(format!("unknown listing status: {}", row.status)))?;
        Ok(Listing {
            id: row.id,
            owner_id: row.owner_id,
            status,
            start_price: row.start_price,
            current_price: row.current_price,
            reserve_price: row.reserve_price,
            reserve_met: row.reserve_met,
            buy_now_price: row.buy_now_price,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: i64,
    listing_id: i64,
    buyer_id: i64,
    final_price: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let status = TransactionStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Internal(format!("unknown transaction status: {}", row.status))
        })?;
        Ok(Transaction {
            id: row.id,
            listing_id: row.listing_id,
            buyer_id: row.buyer_id,
            final_price: row.final_price,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BidRow {
    id: i64,
    listing_id: i64,
    bidder_id: i64,
    amount: i64,
    is_auto_bid: bool,
    created_at: DateTime<Utc>,
}

impl From<BidRow> for Bid {
    fn from(row: BidRow) -> Self {
        Bid {
            id: row.id,
            listing_id: row.listing_id,
            bidder_id: row.bidder_id,
            amount: row.amount,
            is_auto_bid: row.is_auto_bid,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AutoBidRow {
    id: i64,
    user_id: i64,
    listing_id: i64,
    max_amount: i64,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AutoBidRow> for AutoBid {
    fn from(row: AutoBidRow) -> Self {
        AutoBid {
            id: row.id,
            user_id: row.user_id,
            listing_id: row.listing_id,
            max_amount: row.max_amount,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// endregion: --- Row Mapping

// region:    --- PostgresStore

pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(db_manager: &DatabaseManager) -> Self {
        Self { pool: db_manager.get_pool() }
    }
}

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn insert_listing(
        &self,
        new: NewListing,
        now: DateTime<Utc>,
    ) -> Result<Listing, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(queries::INSERT_LISTING)
            .bind(new.owner_id)
            .bind(new.status.as_str())
            .bind(new.start_price)
            .bind(new.reserve_price)
            .bind(new.buy_now_price)
            .bind(new.start_time)
            .bind(new.end_time)
            .bind(now)
            .fetch_one(&*self.pool)
            .await?;
        row.try_into()
    }

    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(queries::GET_LISTING)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(Listing::try_from).transpose()
    }

    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(queries::ALL_LISTINGS)
            .fetch_all(&*self.pool)
            .await?;
        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn update_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        let result = sqlx::query(queries::UPDATE_LISTING)
            .bind(listing.id)
            .bind(listing.status.as_str())
            .bind(listing.current_price)
            .bind(listing.reserve_met)
            .bind(listing.end_time)
            .execute(&*self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Internal(format!(
                "update of unknown listing {}",
                listing.id
            )));
        }
        Ok(())
    }

    async fn due_listings(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(queries::DUE_LISTINGS)
            .bind(now)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await?;
        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn activate_scheduled(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(queries::ACTIVATE_SCHEDULED)
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_bid(&self, bid: NewBid) -> Result<Bid, StoreError> {
        let row = sqlx::query_as::<_, BidRow>(queries::INSERT_BID)
            .bind(bid.listing_id)
            .bind(bid.bidder_id)
            .bind(bid.amount)
            .bind(bid.is_auto_bid)
            .bind(bid.created_at)
            .fetch_one(&*self.pool)
            .await?;
        Ok(row.into())
    }

    async fn bids_for_listing(&self, listing_id: i64) -> Result<Vec<Bid>, StoreError> {
        let rows = sqlx::query_as::<_, BidRow>(queries::BIDS_FOR_LISTING)
            .bind(listing_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(Bid::from).collect())
    }

    async fn highest_bid(&self, listing_id: i64) -> Result<Option<Bid>, StoreError> {
        let row = sqlx::query_as::<_, BidRow>(queries::HIGHEST_BID)
            .bind(listing_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(Bid::from))
    }

    async fn upsert_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        max_amount: i64,
        now: DateTime<Utc>,
    ) -> Result<AutoBid, StoreError> {
        let row = sqlx::query_as::<_, AutoBidRow>(queries::UPSERT_AUTO_BID)
            .bind(user_id)
            .bind(listing_id)
            .bind(max_amount)
            .bind(now)
            .fetch_one(&*self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
    ) -> Result<Option<AutoBid>, StoreError> {
        let row = sqlx::query_as::<_, AutoBidRow>(queries::GET_AUTO_BID)
            .bind(user_id)
            .bind(listing_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(AutoBid::from))
    }

    async fn disable_auto_bid(
        &self,
        user_id: i64,
        listing_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(queries::DISABLE_AUTO_BID)
            .bind(user_id)
            .bind(listing_id)
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn enabled_auto_bids(&self, listing_id: i64) -> Result<Vec<AutoBid>, StoreError> {
        let rows = sqlx::query_as::<_, AutoBidRow>(queries::ENABLED_AUTO_BIDS)
            .bind(listing_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(AutoBid::from).collect())
    }

    async fn insert_transaction(
        &self,
        listing_id: i64,
        buyer_id: i64,
        final_price: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query_as::<_, TransactionRow>(queries::INSERT_TRANSACTION)
            .bind(listing_id)
            .bind(buyer_id)
            .bind(final_price)
            .bind(now)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn transaction_for_listing(
        &self,
        listing_id: i64,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query_as::<_, TransactionRow>(queries::TRANSACTION_FOR_LISTING)
            .bind(listing_id)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn user_has_bidding_agreement(&self, user_id: i64) -> Result<Option<bool>, StoreError> {
        let row = sqlx::query(queries::USER_AGREEMENT)
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|r| r.get("bidding_agreement_accepted")))
    }

    async fn enqueue_notification(
        &self,
        user_id: i64,
        kind: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_NOTIFICATION)
            .bind(user_id)
            .bind(kind)
            .bind(payload)
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }
}

// endregion: --- PostgresStore
