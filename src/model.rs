use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Auction lifecycle state. Closed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuctionStatus {
    Active,
    Closed,
    Cancelled,
}

// Auction model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    pub flag_id: i64,
    pub seller_id: i64,
    pub starting_price: Decimal,
    // Both fields set together on every accepted bid, absent until the first one.
    pub current_highest_bid: Option<Decimal>,
    pub highest_bidder_id: Option<i64>,
    pub status: AuctionStatus,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// Bid model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub wallet_address: String,
    pub username: Option<String>,
    pub reputation_score: i64,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry for a collectible flag. The catalog itself lives outside this
/// service; only existence and current ownership matter here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: i64,
    pub name: String,
}
