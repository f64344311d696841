/// Commands accepted by the engine and the outcomes it reports back.
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Commands

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidCommand {
    pub listing_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowCommand {
    pub listing_id: i64,
    pub buyer_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAutoBidCommand {
    pub listing_id: i64,
    pub user_id: i64,
    pub max_amount: i64,
}

// endregion: --- Commands

// region:    --- Outcomes

/// What the caller learns after a bid lands: the new price, who is winning,
/// and the (possibly extended) end time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidOutcome {
    pub listing_id: i64,
    pub accepted_amount: i64,
    pub current_price: i64,
    pub highest_bidder_id: i64,
    pub end_time: DateTime<Utc>,
    pub sold: bool,
    /// Counter-bids placed by proxies in the same critical section.
    pub auto_bids_placed: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalizeReport {
    pub scanned: u32,
    pub sold: u32,
    pub ended: u32,
}

// endregion: --- Outcomes
