// region:    --- Imports
use crate::bidding::commands::AuctionService;
use crate::error::AuctionError;
use crate::query;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

// endregion: --- Imports

// region:    --- Requests

#[derive(Debug, Deserialize)]
pub struct CreateAuctionRequest {
    pub flag_id: i64,
    pub wallet_address: String,
    pub starting_price: Decimal,
    pub duration_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub wallet_address: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CancelAuctionRequest {
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAuctionsParams {
    #[serde(default = "default_active_only")]
    pub active_only: bool,
    pub flag_id: Option<i64>,
}

fn default_active_only() -> bool {
    true
}

// endregion: --- Requests

// region:    --- Router

pub fn router(service: Arc<AuctionService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/auctions",
            post(handle_create_auction).get(handle_list_auctions),
        )
        .route("/auctions/:id", get(handle_get_auction))
        .route("/auctions/:id/bid", post(handle_place_bid))
        .route("/auctions/:id/close", post(handle_close_auction))
        .route("/auctions/:id/cancel", post(handle_cancel_auction))
        .layer(cors)
        .with_state(service)
}

// endregion: --- Router

// region:    --- Command Handlers

/// Create an auction
pub async fn handle_create_auction(
    State(service): State<Arc<AuctionService>>,
    Json(req): Json<CreateAuctionRequest>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> create auction request: {:?}", "Handler", req);
    let auction = service
        .create_auction(
            req.flag_id,
            &req.wallet_address,
            req.starting_price,
            req.duration_hours,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// Place a bid
pub async fn handle_place_bid(
    State(service): State<Arc<AuctionService>>,
    Path(auction_id): Path<i64>,
    Json(req): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, AuctionError> {
    info!(
        "{:<12} --> bid request on auction {}: {}",
        "Handler", auction_id, req.amount
    );
    let bid = service
        .place_bid(auction_id, &req.wallet_address, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// Close an auction past its deadline (callable by anyone)
pub async fn handle_close_auction(
    State(service): State<Arc<AuctionService>>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> close request auction {}", "Handler", auction_id);
    let auction = service.close_auction(auction_id).await?;
    Ok(Json(auction))
}

/// Cancel an auction (seller only, no bids yet)
pub async fn handle_cancel_auction(
    State(service): State<Arc<AuctionService>>,
    Path(auction_id): Path<i64>,
    Json(req): Json<CancelAuctionRequest>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> cancel request auction {}", "Handler", auction_id);
    let auction = service
        .cancel_auction(auction_id, &req.wallet_address)
        .await?;
    Ok(Json(auction))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// List auctions
pub async fn handle_list_auctions(
    State(service): State<Arc<AuctionService>>,
    Query(params): Query<ListAuctionsParams>,
) -> impl IntoResponse {
    info!("{:<12} --> list auctions: {:?}", "Handler", params);
    let auctions =
        query::handlers::list_auctions(service.store(), params.active_only, params.flag_id).await;
    Json(auctions)
}

/// Auction detail with bid history
pub async fn handle_get_auction(
    State(service): State<Arc<AuctionService>>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> auction detail {}", "Handler", auction_id);
    let detail =
        query::handlers::get_auction_detail(service.store(), service.users(), auction_id).await?;
    Ok(Json(detail))
}

// endregion: --- Query Handlers
