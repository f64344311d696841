// region:    --- Imports
use crate::bidding::commands::{BuyNowCommand, PlaceBidCommand, SetAutoBidCommand};
use crate::engine::AuctionEngine;
use crate::error::EngineError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
// endregion: --- Imports

// region:    --- Command Handlers

/// Place a bid.
pub async fn handle_bid(
    State(engine): State<Arc<AuctionEngine>>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> place bid: {:?}", "Command", cmd);
    let outcome = engine.place_bid(cmd).await?;
    Ok(Json(outcome))
}

/// Direct buy-now purchase.
pub async fn handle_buy_now(
    State(engine): State<Arc<AuctionEngine>>,
    Json(cmd): Json<BuyNowCommand>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> buy now: {:?}", "Command", cmd);
    let outcome = engine.buy_now(cmd).await?;
    Ok(Json(outcome))
}

/// Set or raise an auto-bid ceiling.
pub async fn handle_set_auto_bid(
    State(engine): State<Arc<AuctionEngine>>,
    Json(cmd): Json<SetAutoBidCommand>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> set auto-bid: {:?}", "Command", cmd);
    let auto_bid = engine.set_auto_bid(cmd).await?;
    Ok(Json(auto_bid))
}

/// Cancel an auto-bid ceiling; succeeds even when none exists.
pub async fn handle_cancel_auto_bid(
    State(engine): State<Arc<AuctionEngine>>,
    Path((listing_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, EngineError> {
    info!(
        "{:<12} --> cancel auto-bid: listing {} user {}",
        "Command", listing_id, user_id
    );
    engine.cancel_auto_bid(user_id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct FinalizeParams {
    pub batch_limit: Option<i64>,
}

/// On-demand finalization sweep, same path the scheduler takes.
pub async fn handle_finalize(
    State(engine): State<Arc<AuctionEngine>>,
    Query(params): Query<FinalizeParams>,
) -> Result<impl IntoResponse, EngineError> {
    let batch_limit = params.batch_limit.unwrap_or(100).clamp(1, 1_000);
    info!("{:<12} --> finalize sweep, limit {}", "Command", batch_limit);
    let report = engine.finalize_due_auctions(batch_limit).await?;
    Ok(Json(report))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_get_listing(
    State(engine): State<Arc<AuctionEngine>>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> get listing {}", "HandlerQuery", listing_id);
    let listing = engine.get_listing(listing_id).await?;
    Ok(Json(listing))
}

pub async fn handle_get_listings(
    State(engine): State<Arc<AuctionEngine>>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> get all listings", "HandlerQuery");
    let listings = engine.all_listings().await?;
    Ok(Json(listings))
}

pub async fn handle_get_bids(
    State(engine): State<Arc<AuctionEngine>>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> get bids for listing {}", "HandlerQuery", listing_id);
    let bids = engine.bid_history(listing_id).await?;
    Ok(Json(bids))
}

pub async fn handle_get_min_bid(
    State(engine): State<Arc<AuctionEngine>>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, EngineError> {
    info!("{:<12} --> get min bid for listing {}", "HandlerQuery", listing_id);
    let minimum = engine.next_minimum_bid(listing_id).await?;
    Ok(Json(serde_json::json!({
        "listing_id": listing_id,
        "next_minimum_bid": minimum,
    })))
}

pub async fn handle_get_auto_bid(
    State(engine): State<Arc<AuctionEngine>>,
    Path((listing_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, EngineError> {
    info!(
        "{:<12} --> get auto-bid: listing {} user {}",
        "HandlerQuery", listing_id, user_id
    );
    match engine.get_auto_bid(user_id, listing_id).await? {
        Some(auto_bid) => Ok(Json(auto_bid).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

// endregion: --- Query Handlers
