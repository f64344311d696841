/// Proxy-bid competition. Selection is a pure function so the escalation
/// rules are testable without a store; the engine drives the bounded loop
/// inside the listing's critical section.
// region:    --- Imports
use crate::auction::model::AutoBid;
use std::collections::HashSet;
// endregion: --- Imports

// region:    --- Selection

/// Picks the proxy that should counter the current highest bid, or `None`
/// when the pass has reached its fixed point.
///
/// Qualifying ceilings: enabled, not the current highest bidder, not the
/// listing owner, not already counter-bid in this pass, and able to reach
/// `next_min`. Among qualifiers the highest ceiling wins; equal ceilings go
/// to whoever set theirs first.
pub fn select_counter_bidder<'a>(
    auto_bids: &'a [AutoBid],
    current_highest_bidder: Option<i64>,
    owner_id: i64,
    visited: &HashSet<i64>,
    next_min: i64,
) -> Option<&'a AutoBid> {
    auto_bids
        .iter()
        .filter(|ab| ab.enabled)
        .filter(|ab| Some(ab.user_id) != current_highest_bidder)
        .filter(|ab| ab.user_id != owner_id)
        .filter(|ab| !visited.contains(&ab.user_id))
        .filter(|ab| ab.max_amount >= next_min)
        .min_by(|a, b| {
            b.max_amount
                .cmp(&a.max_amount)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        })
}

/// Amount the selected proxy bids: just enough, capped by its ceiling.
pub fn counter_amount(auto_bid: &AutoBid, next_min: i64) -> i64 {
    auto_bid.max_amount.min(next_min)
}

// endregion: --- Selection

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn auto_bid(id: i64, user_id: i64, max_amount: i64, created_offset_secs: i64) -> AutoBid {
        let t = Utc::now() + Duration::seconds(created_offset_secs);
        AutoBid {
            id,
            user_id,
            listing_id: 1,
            max_amount,
            enabled: true,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn highest_ceiling_wins() {
        let bids = vec![auto_bid(1, 10, 50, 0), auto_bid(2, 11, 80, 1)];
        let picked = select_counter_bidder(&bids, Some(99), 1, &HashSet::new(), 21).unwrap();
        assert_eq!(picked.user_id, 11);
    }

    #[test]
    fn equal_ceilings_go_to_first_setter() {
        let bids = vec![auto_bid(1, 10, 50, 5), auto_bid(2, 11, 50, 0)];
        let picked = select_counter_bidder(&bids, Some(99), 1, &HashSet::new(), 21).unwrap();
        assert_eq!(picked.user_id, 11);
    }

    #[test]
    fn current_highest_bidder_does_not_counter_itself() {
        let bids = vec![auto_bid(1, 10, 50, 0)];
        assert!(select_counter_bidder(&bids, Some(10), 1, &HashSet::new(), 21).is_none());
    }

    #[test]
    fn visited_and_unreachable_ceilings_are_skipped() {
        let bids = vec![auto_bid(1, 10, 50, 0), auto_bid(2, 11, 30, 1)];
        let visited: HashSet<i64> = [10].into_iter().collect();
        // 10 already countered this pass, 11 cannot reach the minimum.
        assert!(select_counter_bidder(&bids, Some(99), 1, &visited, 40).is_none());
    }

    #[test]
    fn counter_is_minimum_needed_capped_by_ceiling() {
        let ab = auto_bid(1, 10, 50, 0);
        assert_eq!(counter_amount(&ab, 21), 21);
        assert_eq!(counter_amount(&ab, 50), 50);
        assert_eq!(counter_amount(&ab, 60), 50);
    }
}
// endregion: --- Tests
