/// Outbound collaborator boundaries. Delivery is someone else's job: the
/// engine enqueues and forgets, and a failed notification or cache purge must
/// never abort the bid or finalization that triggered it.
// region:    --- Imports
use crate::clock::Clock;
use crate::store::AuctionStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
// endregion: --- Imports

// region:    --- NotificationKind

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BidOutbid,
    AuctionWon,
    ListingEndedSeller,
    ReserveNotMet,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BidOutbid => "bid_outbid",
            NotificationKind::AuctionWon => "auction_won",
            NotificationKind::ListingEndedSeller => "listing_ended_seller",
            NotificationKind::ReserveNotMet => "reserve_not_met",
        }
    }
}

// endregion: --- NotificationKind

// region:    --- Notifier

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fire-and-forget; implementations swallow and log their own failures.
    async fn notify(&self, user_id: i64, kind: NotificationKind, payload: serde_json::Value);
}

/// Enqueues into the notifications table for the delivery pipeline to pick up.
pub struct StoreNotifier {
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn AuctionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify(&self, user_id: i64, kind: NotificationKind, payload: serde_json::Value) {
        let now = self.clock.now();
        if let Err(e) = self
            .store
            .enqueue_notification(user_id, kind.as_str(), &payload, now)
            .await
        {
            warn!(
                "{:<12} --> failed to enqueue {} for user {}: {}",
                "Notify",
                kind.as_str(),
                user_id,
                e
            );
        }
    }
}

/// Forwards each notification to an external webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: i64, kind: NotificationKind, payload: serde_json::Value) {
        let body = serde_json::json!({
            "user_id": user_id,
            "kind": kind.as_str(),
            "payload": payload,
        });
        if let Err(e) = self.client.post(&self.url).json(&body).send().await {
            warn!("{:<12} --> webhook delivery failed: {}", "Notify", e);
        }
    }
}

/// Fans out to several notifiers in order.
pub struct MultiNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn notify(&self, user_id: i64, kind: NotificationKind, payload: serde_json::Value) {
        for target in &self.targets {
            target.notify(user_id, kind, payload.clone()).await;
        }
    }
}

// endregion: --- Notifier

// region:    --- CacheInvalidator

/// Page-cache collaborator: finalized listings need their listing/category
/// pages re-rendered.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, tags: &[String]);
}

pub struct HttpCacheInvalidator {
    client: reqwest::Client,
    url: String,
}

impl HttpCacheInvalidator {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl CacheInvalidator for HttpCacheInvalidator {
    async fn invalidate(&self, tags: &[String]) {
        let body = serde_json::json!({ "tags": tags });
        match self.client.post(&self.url).json(&body).send().await {
            Ok(_) => debug!("{:<12} --> purged {} tags", "Cache", tags.len()),
            Err(e) => warn!("{:<12} --> cache purge failed: {}", "Cache", e),
        }
    }
}

pub struct NoopCacheInvalidator;

#[async_trait]
impl CacheInvalidator for NoopCacheInvalidator {
    async fn invalidate(&self, _tags: &[String]) {}
}

// endregion: --- CacheInvalidator
