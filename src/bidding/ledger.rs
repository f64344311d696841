/// Read side of the append-only bid ledger. Pure queries, no side effects.
// region:    --- Imports
use crate::auction::model::{Bid, Listing};
use crate::error::StoreError;
use crate::policy::IncrementPolicy;
use crate::store::AuctionStore;
// endregion: --- Imports

// region:    --- Ledger

/// Most recent bid with the highest amount; ties go to the earliest bid.
pub async fn highest_bid(
    store: &dyn AuctionStore,
    listing_id: i64,
) -> Result<Option<Bid>, StoreError> {
    store.highest_bid(listing_id).await
}

/// The smallest amount the next bid must reach: highest bid plus the tiered
/// increment at the current price, or the start price when nobody has bid.
pub async fn next_minimum_bid(
    store: &dyn AuctionStore,
    policy: &IncrementPolicy,
    listing: &Listing,
) -> Result<i64, StoreError> {
    match store.highest_bid(listing.id).await? {
        Some(high) => Ok(high.amount + policy.increment(listing.current_price)),
        None => Ok(listing.start_price),
    }
}

// endregion: --- Ledger

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::{ListingStatus, NewBid, NewListing};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn minimum_is_start_price_without_bids() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let listing = store
            .insert_listing(
                NewListing {
                    owner_id: 1,
                    status: ListingStatus::Live,
                    start_price: 10,
                    reserve_price: None,
                    buy_now_price: None,
                    start_time: now,
                    end_time: now + Duration::hours(1),
                },
                now,
            )
            .await
            .unwrap();

        let policy = IncrementPolicy::default();
        let min = next_minimum_bid(&store, &policy, &listing).await.unwrap();
        assert_eq!(min, 10);
    }

    #[tokio::test]
    async fn minimum_steps_up_from_highest_bid() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut listing = store
            .insert_listing(
                NewListing {
                    owner_id: 1,
                    status: ListingStatus::Live,
                    start_price: 10,
                    reserve_price: None,
                    buy_now_price: None,
                    start_time: now,
                    end_time: now + Duration::hours(1),
                },
                now,
            )
            .await
            .unwrap();

        store
            .insert_bid(NewBid {
                listing_id: listing.id,
                bidder_id: 2,
                amount: 15,
                is_auto_bid: false,
                created_at: now,
            })
            .await
            .unwrap();
        listing.current_price = 15;

        let policy = IncrementPolicy::default();
        let min = next_minimum_bid(&store, &policy, &listing).await.unwrap();
        assert_eq!(min, 16);
    }
}
// endregion: --- Tests
