// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Listing

/// Listing lifecycle. Transitions are monotonic:
/// draft -> scheduled -> live -> (ended | sold), never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Draft,
    Scheduled,
    Live,
    Ended,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Scheduled => "scheduled",
            ListingStatus::Live => "live",
            ListingStatus::Ended => "ended",
            ListingStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ListingStatus::Draft),
            "scheduled" => Some(ListingStatus::Scheduled),
            "live" => Some(ListingStatus::Live),
            "ended" => Some(ListingStatus::Ended),
            "sold" => Some(ListingStatus::Sold),
            _ => None,
        }
    }

    /// Terminal states never re-enter the finalization scan.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::Ended | ListingStatus::Sold)
    }
}

/// An auctionable item. Prices are whole currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub owner_id: i64,
    pub status: ListingStatus,
    pub start_price: i64,
    pub current_price: i64,
    pub reserve_price: Option<i64>,
    pub reserve_met: bool,
    pub buy_now_price: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// A listing accepts bids only while live and inside [start_time, end_time).
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Live && now >= self.start_time && now < self.end_time
    }
}

/// Fields supplied when a listing is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub owner_id: i64,
    pub status: ListingStatus,
    pub start_price: i64,
    pub reserve_price: Option<i64>,
    pub buy_now_price: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// endregion: --- Listing

// region:    --- Bid

/// One bid event in the append-only ledger. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub is_auto_bid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBid {
    pub listing_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub is_auto_bid: bool,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Bid

// region:    --- AutoBid

/// A standing proxy-bid ceiling. At most one per (user_id, listing_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoBid {
    pub id: i64,
    pub user_id: i64,
    pub listing_id: i64,
    pub max_amount: i64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// endregion: --- AutoBid

// region:    --- Transaction

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            _ => None,
        }
    }
}

/// Created at most once per listing, when an auction concludes with a winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub final_price: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Transaction
