//! Scenario tests for the bidding and finalization engine, run against the
//! in-memory store with a manually driven clock.

// region:    --- Imports
use auction_engine::auction::model::{ListingStatus, NewListing};
use auction_engine::bidding::commands::{BuyNowCommand, PlaceBidCommand, SetAutoBidCommand};
use auction_engine::bidding::rate_limit::InProcessRateLimiter;
use auction_engine::clock::{Clock, ManualClock};
use auction_engine::config::Config;
use auction_engine::engine::AuctionEngine;
use auction_engine::error::EngineError;
use auction_engine::notify::{NoopCacheInvalidator, StoreNotifier};
use auction_engine::store::{AuctionStore, MemoryStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
// endregion: --- Imports

// region:    --- Test Rig

struct Rig {
    engine: Arc<AuctionEngine>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn rig() -> Rig {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let config = Config::for_tests();
    let notifier = Arc::new(StoreNotifier::new(
        Arc::clone(&store) as Arc<dyn AuctionStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let rate_limiter = Arc::new(InProcessRateLimiter::new(config.bid_cooldown));
    let engine = AuctionEngine::new(
        store.clone(),
        clock.clone(),
        notifier,
        Arc::new(NoopCacheInvalidator),
        rate_limiter,
        config,
    );
    Rig { engine: Arc::new(engine), store, clock }
}

async fn live_listing(
    rig: &Rig,
    start_price: i64,
    reserve_price: Option<i64>,
    buy_now_price: Option<i64>,
    duration: Duration,
) -> i64 {
    let now = rig.clock.now();
    rig.store
        .insert_listing(
            NewListing {
                owner_id: 1,
                status: ListingStatus::Live,
                start_price,
                reserve_price,
                buy_now_price,
                start_time: now,
                end_time: now + duration,
            },
            now,
        )
        .await
        .unwrap()
        .id
}

fn bid(listing_id: i64, bidder_id: i64, amount: i64) -> PlaceBidCommand {
    PlaceBidCommand { listing_id, bidder_id, amount }
}

async fn notification_count(rig: &Rig, user_id: i64, kind: &str) -> usize {
    rig.store
        .notifications()
        .await
        .iter()
        .filter(|(u, k, _)| *u == user_id && k == kind)
        .count()
}

// endregion: --- Test Rig

// region:    --- Acceptance

#[tokio::test]
async fn first_bid_at_start_price_is_accepted() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    assert_eq!(outcome.current_price, 15);
    assert_eq!(outcome.highest_bidder_id, 2);
    assert!(!outcome.sold);
}

#[tokio::test]
async fn low_bid_is_rejected_with_required_minimum() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();

    // $1 tier at this price: the next bid must reach 16.
    let err = rig.engine.place_bid(bid(listing_id, 3, 14)).await.unwrap_err();
    match err {
        EngineError::BelowMinimum { minimum_required } => assert_eq!(minimum_required, 16),
        other => panic!("expected BelowMinimum, got {other:?}"),
    }

    // The rejection touched nothing.
    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    assert_eq!(listing.current_price, 15);
}

#[tokio::test]
async fn precondition_rejections() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    // Unknown listing.
    let err = rig.engine.place_bid(bid(999, 2, 15)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound));

    // Owner bidding on their own listing.
    let err = rig.engine.place_bid(bid(listing_id, 1, 15)).await.unwrap_err();
    assert!(matches!(err, EngineError::SelfBid));

    // Nonsense amount.
    let err = rig.engine.place_bid(bid(listing_id, 2, 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Past end_time the listing no longer accepts bids, live or not.
    rig.clock.advance(Duration::hours(2));
    let err = rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotLive { .. }));
}

#[tokio::test]
async fn repeat_bids_inside_cooldown_are_rate_limited() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();

    let err = rig.engine.place_bid(bid(listing_id, 2, 20)).await.unwrap_err();
    match err {
        EngineError::RateLimited { retry_after_ms } => assert!(retry_after_ms > 0),
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Another bidder is unaffected, and the cooldown expires.
    rig.engine.place_bid(bid(listing_id, 3, 20)).await.unwrap();
    rig.clock.advance(Duration::seconds(3));
    rig.engine.place_bid(bid(listing_id, 2, 25)).await.unwrap();
}

#[tokio::test]
async fn current_price_is_monotonic_and_ledger_ordering_is_stable() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    let mut last_price = 0;
    for (bidder, amount) in [(2, 15), (3, 20), (4, 30), (5, 45)] {
        rig.clock.advance(Duration::seconds(5));
        let outcome = rig.engine.place_bid(bid(listing_id, bidder, amount)).await.unwrap();
        assert!(outcome.current_price >= last_price);
        last_price = outcome.current_price;
    }

    let bids = rig.engine.bid_history(listing_id).await.unwrap();
    for pair in bids.windows(2) {
        assert!(
            pair[0].amount > pair[1].amount
                || (pair[0].amount == pair[1].amount
                    && pair[0].created_at <= pair[1].created_at)
        );
    }
    assert_eq!(bids[0].amount, 45);
}

#[tokio::test]
async fn outbid_notification_goes_to_previous_highest_bidder() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    rig.clock.advance(Duration::seconds(3));
    rig.engine.place_bid(bid(listing_id, 3, 20)).await.unwrap();

    assert_eq!(notification_count(&rig, 2, "bid_outbid").await, 1);
    assert_eq!(notification_count(&rig, 3, "bid_outbid").await, 0);
}

// endregion: --- Acceptance

// region:    --- Anti-Snipe

#[tokio::test]
async fn late_bid_extends_end_time() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::minutes(2)).await;
    let original_end = rig.engine.get_listing(listing_id).await.unwrap().end_time;

    rig.clock.advance(Duration::minutes(1));
    let outcome = rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    assert_eq!(outcome.end_time, original_end + Duration::minutes(5));
}

#[tokio::test]
async fn early_bid_leaves_end_time_alone() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    let original_end = rig.engine.get_listing(listing_id).await.unwrap().end_time;

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    assert_eq!(outcome.end_time, original_end);
}

#[tokio::test]
async fn extension_repeats_for_each_late_bid() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::minutes(2)).await;
    let original_end = rig.engine.get_listing(listing_id).await.unwrap().end_time;

    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    rig.clock.advance(Duration::minutes(4));
    let outcome = rig.engine.place_bid(bid(listing_id, 3, 20)).await.unwrap();
    assert_eq!(outcome.end_time, original_end + Duration::minutes(10));
}

// endregion: --- Anti-Snipe

// region:    --- Auto-Bids

#[tokio::test]
async fn proxy_counters_a_manual_bid_at_minimum_increment() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    rig.store.upsert_user(5, true).await;

    rig.engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 5, max_amount: 50 })
        .await
        .unwrap();

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 20)).await.unwrap();
    assert_eq!(outcome.current_price, 21);
    assert_eq!(outcome.highest_bidder_id, 5);
    assert_eq!(outcome.auto_bids_placed, 1);

    let highest = rig.store.highest_bid(listing_id).await.unwrap().unwrap();
    assert!(highest.is_auto_bid);

    // The manual bidder was ultimately superseded, once.
    assert_eq!(notification_count(&rig, 2, "bid_outbid").await, 1);
}

#[tokio::test]
async fn competing_proxies_resolve_deterministically_within_bound() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    rig.store.upsert_user(5, true).await;
    rig.store.upsert_user(6, true).await;

    rig.engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 5, max_amount: 50 })
        .await
        .unwrap();
    rig.engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 6, max_amount: 60 })
        .await
        .unwrap();

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 20)).await.unwrap();

    // One counter-bid per distinct proxy, then the pass ends.
    assert!(outcome.auto_bids_placed <= 2);
    let bids = rig.engine.bid_history(listing_id).await.unwrap();
    assert_eq!(bids.iter().filter(|b| b.is_auto_bid).count() as u32, outcome.auto_bids_placed);

    // Each superseded user heard about it exactly once.
    assert_eq!(notification_count(&rig, 2, "bid_outbid").await, 1);
    let winner = outcome.highest_bidder_id;
    for user in [5i64, 6] {
        let expected = if user == winner { 0 } else { 1 };
        assert_eq!(notification_count(&rig, user, "bid_outbid").await, expected);
    }
}

#[tokio::test]
async fn proxy_ceiling_caps_the_counter_bid() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    rig.store.upsert_user(5, true).await;

    rig.engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 5, max_amount: 30 })
        .await
        .unwrap();

    // Manual bid at 30: the proxy cannot go higher and stays silent.
    let outcome = rig.engine.place_bid(bid(listing_id, 2, 30)).await.unwrap();
    assert_eq!(outcome.current_price, 30);
    assert_eq!(outcome.highest_bidder_id, 2);
    assert_eq!(outcome.auto_bids_placed, 0);
}

#[tokio::test]
async fn set_auto_bid_requires_agreement_and_reachable_ceiling() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    rig.store.upsert_user(5, false).await;
    rig.store.upsert_user(6, true).await;

    let err = rig
        .engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 5, max_amount: 50 })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AgreementRequired));

    // Unknown user.
    let err = rig
        .engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 99, max_amount: 50 })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound));

    // Ceiling below the next minimum.
    let err = rig
        .engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 6, max_amount: 5 })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BelowMinimum { minimum_required: 10 }));
}

#[tokio::test]
async fn cancelled_proxy_no_longer_counters() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;
    rig.store.upsert_user(5, true).await;

    rig.engine
        .set_auto_bid(SetAutoBidCommand { listing_id, user_id: 5, max_amount: 50 })
        .await
        .unwrap();
    rig.engine.cancel_auto_bid(5, listing_id).await.unwrap();
    // Cancelling again is a no-op, not an error.
    rig.engine.cancel_auto_bid(5, listing_id).await.unwrap();

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 20)).await.unwrap();
    assert_eq!(outcome.highest_bidder_id, 2);
    assert_eq!(outcome.auto_bids_placed, 0);
}

// endregion: --- Auto-Bids

// region:    --- Buy-Now

#[tokio::test]
async fn bid_at_buy_now_price_ends_the_auction_as_sold() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, Some(200), Duration::hours(1)).await;

    let outcome = rig.engine.place_bid(bid(listing_id, 2, 200)).await.unwrap();
    assert!(outcome.sold);
    assert_eq!(outcome.current_price, 200);

    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);

    let tx = rig.store.transaction_for_listing(listing_id).await.unwrap().unwrap();
    assert_eq!(tx.buyer_id, 2);
    assert_eq!(tx.final_price, 200);

    assert_eq!(notification_count(&rig, 2, "auction_won").await, 1);
    assert_eq!(notification_count(&rig, 1, "listing_ended_seller").await, 1);

    // End time is irrelevant from this point: further bids bounce.
    let err = rig.engine.place_bid(bid(listing_id, 3, 250)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotLive { status: ListingStatus::Sold }));
}

#[tokio::test]
async fn direct_buy_now_settles_at_listed_price() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, Some(150), Duration::hours(1)).await;
    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();

    let outcome = rig
        .engine
        .buy_now(BuyNowCommand { listing_id, buyer_id: 3 })
        .await
        .unwrap();
    assert!(outcome.sold);
    assert_eq!(outcome.current_price, 150);

    let tx = rig.store.transaction_for_listing(listing_id).await.unwrap().unwrap();
    assert_eq!(tx.buyer_id, 3);
    assert_eq!(tx.final_price, 150);

    // The standing highest bidder lost to the purchase.
    assert_eq!(notification_count(&rig, 2, "bid_outbid").await, 1);
}

#[tokio::test]
async fn buy_now_requires_a_listed_price() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    let err = rig
        .engine
        .buy_now(BuyNowCommand { listing_id, buyer_id: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BuyNowUnavailable));
}

// endregion: --- Buy-Now

// region:    --- Finalization

#[tokio::test]
async fn finalize_sells_to_highest_bidder_when_reserve_is_met() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, Some(100), None, Duration::minutes(30)).await;

    rig.engine.place_bid(bid(listing_id, 2, 120)).await.unwrap();
    rig.clock.advance(Duration::hours(1));

    let report = rig.engine.finalize_due_auctions(100).await.unwrap();
    assert_eq!(report.sold, 1);

    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert!(listing.reserve_met);

    let tx = rig.store.transaction_for_listing(listing_id).await.unwrap().unwrap();
    assert_eq!(tx.buyer_id, 2);
    assert_eq!(tx.final_price, 120);
    assert_eq!(notification_count(&rig, 2, "auction_won").await, 1);
}

#[tokio::test]
async fn finalize_with_unmet_reserve_ends_without_transaction() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, Some(100), None, Duration::minutes(30)).await;

    rig.engine.place_bid(bid(listing_id, 2, 80)).await.unwrap();
    rig.clock.advance(Duration::hours(1));

    rig.engine.finalize_due_auctions(100).await.unwrap();

    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Ended);
    assert!(!listing.reserve_met);
    assert!(rig.store.transaction_for_listing(listing_id).await.unwrap().is_none());
    assert_eq!(notification_count(&rig, 1, "reserve_not_met").await, 1);
    assert_eq!(notification_count(&rig, 2, "auction_won").await, 0);
}

#[tokio::test]
async fn finalize_without_bids_just_ends_the_listing() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::minutes(30)).await;
    rig.clock.advance(Duration::hours(1));

    let report = rig.engine.finalize_due_auctions(100).await.unwrap();
    assert_eq!(report.ended, 1);

    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Ended);
    assert!(rig.store.transaction_for_listing(listing_id).await.unwrap().is_none());
}

#[tokio::test]
async fn finalize_is_idempotent() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::minutes(30)).await;
    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();
    rig.clock.advance(Duration::hours(1));

    let first = rig.engine.finalize_due_auctions(100).await.unwrap();
    assert_eq!(first.sold, 1);
    let second = rig.engine.finalize_due_auctions(100).await.unwrap();
    assert_eq!(second.scanned, 0);

    // Still exactly one transaction and one set of notifications.
    let tx = rig.store.transaction_for_listing(listing_id).await.unwrap();
    assert!(tx.is_some());
    assert_eq!(notification_count(&rig, 2, "auction_won").await, 1);
    assert_eq!(notification_count(&rig, 1, "listing_ended_seller").await, 1);
}

#[tokio::test]
async fn finalize_respects_the_batch_limit_oldest_first() {
    let rig = rig();
    let early = live_listing(&rig, 10, None, None, Duration::minutes(10)).await;
    let late = live_listing(&rig, 10, None, None, Duration::minutes(20)).await;
    rig.clock.advance(Duration::hours(1));

    let report = rig.engine.finalize_due_auctions(1).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(
        rig.engine.get_listing(early).await.unwrap().status,
        ListingStatus::Ended
    );
    assert_eq!(
        rig.engine.get_listing(late).await.unwrap().status,
        ListingStatus::Live
    );
}

#[tokio::test]
async fn snipe_extension_defers_finalization() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::minutes(2)).await;

    rig.clock.advance(Duration::minutes(1));
    rig.engine.place_bid(bid(listing_id, 2, 15)).await.unwrap();

    // Past the original end, inside the extension.
    rig.clock.advance(Duration::minutes(3));
    let report = rig.engine.finalize_due_auctions(100).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(
        rig.engine.get_listing(listing_id).await.unwrap().status,
        ListingStatus::Live
    );
}

#[tokio::test]
async fn scheduled_listings_go_live_at_start_time() {
    let rig = rig();
    let now = rig.clock.now();
    let listing = rig
        .store
        .insert_listing(
            NewListing {
                owner_id: 1,
                status: ListingStatus::Scheduled,
                start_price: 10,
                reserve_price: None,
                buy_now_price: None,
                start_time: now + Duration::minutes(10),
                end_time: now + Duration::hours(1),
            },
            now,
        )
        .await
        .unwrap();

    assert_eq!(rig.engine.activate_due_listings().await.unwrap(), 0);
    let err = rig.engine.place_bid(bid(listing.id, 2, 15)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotLive { .. }));

    rig.clock.advance(Duration::minutes(10));
    assert_eq!(rig.engine.activate_due_listings().await.unwrap(), 1);
    rig.engine.place_bid(bid(listing.id, 2, 15)).await.unwrap();
}

// endregion: --- Finalization

// region:    --- Concurrency

#[tokio::test]
async fn concurrent_bids_on_one_listing_are_serialized() {
    let rig = rig();
    let listing_id = live_listing(&rig, 10, None, None, Duration::hours(1)).await;

    let mut handles = Vec::new();
    for bidder in 2..22 {
        let engine = Arc::clone(&rig.engine);
        handles.push(tokio::spawn(async move {
            engine.place_bid(bid(listing_id, bidder, bidder * 10)).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(EngineError::BelowMinimum { .. }) => {}
            Err(other) => panic!("unexpected rejection: {other:?}"),
        }
    }
    assert!(accepted >= 1);

    // Whatever the interleaving, the ledger agrees with the listing and
    // every accepted bid beat the one before it.
    let listing = rig.engine.get_listing(listing_id).await.unwrap();
    let bids = rig.engine.bid_history(listing_id).await.unwrap();
    assert_eq!(listing.current_price, bids[0].amount);
    let mut by_time: Vec<_> = bids.clone();
    by_time.sort_by_key(|b| b.id);
    for pair in by_time.windows(2) {
        assert!(pair[1].amount > pair[0].amount);
    }
}

// endregion: --- Concurrency
