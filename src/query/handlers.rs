// region:    --- Imports
use crate::directory::UserDirectory;
use crate::error::AuctionError;
use crate::model::{Auction, AuctionStatus, Bid, User};
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Read Models

/// One auction row for listings, with its bid count.
#[derive(Debug, Serialize)]
pub struct AuctionSummary {
    pub id: i64,
    pub flag_id: i64,
    pub seller_id: i64,
    pub starting_price: Decimal,
    pub current_highest_bid: Option<Decimal>,
    pub highest_bidder_id: Option<i64>,
    pub status: AuctionStatus,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub bid_count: usize,
}

/// Public view of a user on auction read models.
#[derive(Debug, Serialize)]
pub struct BidderSummary {
    pub id: i64,
    pub wallet_address: String,
    pub username: Option<String>,
    pub reputation_score: i64,
}

/// One auction with its full bid history, newest bid first.
#[derive(Debug, Serialize)]
pub struct AuctionDetail {
    pub id: i64,
    pub flag_id: i64,
    pub seller_id: i64,
    pub starting_price: Decimal,
    pub current_highest_bid: Option<Decimal>,
    pub highest_bidder_id: Option<i64>,
    pub status: AuctionStatus,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub bid_count: usize,
    pub bids: Vec<Bid>,
    pub highest_bidder: Option<BidderSummary>,
}

fn summarize(auction: Auction, bid_count: usize) -> AuctionSummary {
    AuctionSummary {
        id: auction.id,
        flag_id: auction.flag_id,
        seller_id: auction.seller_id,
        starting_price: auction.starting_price,
        current_highest_bid: auction.current_highest_bid,
        highest_bidder_id: auction.highest_bidder_id,
        status: auction.status,
        ends_at: auction.ends_at,
        created_at: auction.created_at,
        bid_count,
    }
}

fn summarize_user(user: User) -> BidderSummary {
    BidderSummary {
        id: user.id,
        wallet_address: user.wallet_address,
        username: user.username,
        reputation_score: user.reputation_score,
    }
}

// endregion: --- Read Models

// region:    --- Query Handlers

/// List auctions ordered by `ends_at` ascending, optionally filtered.
pub async fn list_auctions(
    store: &AuctionStore,
    active_only: bool,
    flag_id: Option<i64>,
) -> Vec<AuctionSummary> {
    info!(
        "{:<12} --> list auctions active_only: {}, flag_id: {:?}",
        "Query", active_only, flag_id
    );
    store
        .list()
        .await
        .into_iter()
        .filter(|(auction, _)| !active_only || auction.status == AuctionStatus::Active)
        .filter(|(auction, _)| flag_id.map_or(true, |id| auction.flag_id == id))
        .map(|(auction, bid_count)| summarize(auction, bid_count))
        .collect()
}

/// One auction with full bid history (newest first) and the resolved highest
/// bidder, if any.
pub async fn get_auction_detail(
    store: &AuctionStore,
    users: &dyn UserDirectory,
    auction_id: i64,
) -> Result<AuctionDetail, AuctionError> {
    info!("{:<12} --> auction detail id: {}", "Query", auction_id);
    let (auction, mut bids) = store
        .snapshot(auction_id)
        .await
        .ok_or_else(|| AuctionError::not_found(format!("auction {} not found", auction_id)))?;

    // Stored in acceptance order; history reads newest first.
    bids.reverse();

    let highest_bidder = match auction.highest_bidder_id {
        Some(id) => users.get(id).await.map(summarize_user),
        None => None,
    };

    let bid_count = bids.len();
    Ok(AuctionDetail {
        id: auction.id,
        flag_id: auction.flag_id,
        seller_id: auction.seller_id,
        starting_price: auction.starting_price,
        current_highest_bid: auction.current_highest_bid,
        highest_bidder_id: auction.highest_bidder_id,
        status: auction.status,
        ends_at: auction.ends_at,
        created_at: auction.created_at,
        bid_count,
        bids,
        highest_bidder,
    })
}

// endregion: --- Query Handlers
