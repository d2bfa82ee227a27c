/// Auction command processing
/// 1. create auction
/// 2. place bid
/// 3. close auction
/// 4. cancel auction
// region:    --- Imports
use crate::bidding::validate;
use crate::directory::{OwnershipRegistry, UserDirectory};
use crate::error::AuctionError;
use crate::model::{Auction, AuctionStatus, Bid};
use crate::store::AuctionStore;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Auction Service

/// Reputation bonus awarded to the winning bidder when an auction closes.
const WINNER_REPUTATION_BONUS: i64 = 15;

/// Auction duration bounds in hours (1 hour to 7 days).
const MIN_DURATION_HOURS: i64 = 1;
const MAX_DURATION_HOURS: i64 = 168;

/// Orchestrates auction creation, bidding, closing, and cancellation.
/// Collaborator handles are explicit; nothing here is process-global.
pub struct AuctionService {
    store: Arc<AuctionStore>,
    users: Arc<dyn UserDirectory>,
    ownership: Arc<dyn OwnershipRegistry>,
}

impl AuctionService {
    pub fn new(
        store: Arc<AuctionStore>,
        users: Arc<dyn UserDirectory>,
        ownership: Arc<dyn OwnershipRegistry>,
    ) -> Self {
        Self {
            store,
            users,
            ownership,
        }
    }

    pub fn store(&self) -> &AuctionStore {
        &self.store
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    /// Create an Active auction for a flag the seller currently owns.
    pub async fn create_auction(
        &self,
        flag_id: i64,
        seller_wallet: &str,
        starting_price: Decimal,
        duration_hours: i64,
    ) -> Result<Auction, AuctionError> {
        if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&duration_hours) {
            return Err(AuctionError::invalid(format!(
                "duration_hours must be between {} and {}",
                MIN_DURATION_HOURS, MAX_DURATION_HOURS
            )));
        }
        if starting_price <= Decimal::ZERO {
            return Err(AuctionError::invalid("starting price must be positive"));
        }
        if !self.ownership.flag_exists(flag_id).await {
            return Err(AuctionError::not_found(format!(
                "flag {} not found",
                flag_id
            )));
        }

        let seller = self.users.resolve_or_create(seller_wallet).await?;
        match self.ownership.current_owner(flag_id).await {
            Some(owner_id) if owner_id == seller.id => {}
            _ => {
                return Err(AuctionError::forbidden(
                    "you must own this flag to create an auction",
                ))
            }
        }

        let now = Utc::now();
        let auction = self
            .store
            .create(
                flag_id,
                seller.id,
                starting_price,
                now + Duration::hours(duration_hours),
                now,
            )
            .await?;
        info!(
            "{:<12} --> auction {} created for flag {} by user {}, ends at {}",
            "Command", auction.id, flag_id, seller.id, auction.ends_at
        );
        Ok(auction)
    }

    /// Place a bid. Validation and the write of the new highest bid happen in
    /// one atomic unit per auction; a bid losing a race re-validates against
    /// the winner's amount and is rejected with the fresh minimum.
    pub async fn place_bid(
        &self,
        auction_id: i64,
        bidder_wallet: &str,
        amount: Decimal,
    ) -> Result<Bid, AuctionError> {
        if amount <= Decimal::ZERO {
            return Err(AuctionError::invalid("bid amount must be positive"));
        }
        if !self.store.contains(auction_id).await {
            return Err(AuctionError::not_found(format!(
                "auction {} not found",
                auction_id
            )));
        }

        // Resolve the bidder before entering the critical section; directory
        // access is potentially blocking I/O.
        let bidder = self.users.resolve_or_create(bidder_wallet).await?;

        let store = &self.store;
        let bid = store
            .atomic_update(auction_id, |entry| {
                let now = Utc::now();
                validate::check_bid(&entry.auction, bidder.id, amount, now)?;

                let bid = Bid {
                    id: store.next_bid_id(),
                    auction_id,
                    bidder_id: bidder.id,
                    amount,
                    created_at: now,
                };
                // Bid append and highest-bid update are indivisible.
                entry.bids.push(bid.clone());
                entry.auction.current_highest_bid = Some(amount);
                entry.auction.highest_bidder_id = Some(bidder.id);
                Ok(bid)
            })
            .await?;

        info!(
            "{:<12} --> bid {} accepted on auction {}: {} by user {}",
            "Command", bid.id, auction_id, bid.amount, bid.bidder_id
        );
        Ok(bid)
    }

    /// Close an auction past its deadline. The status transition is atomic
    /// with respect to concurrent bids; the reputation award for the winner
    /// runs after the transition commits and is best-effort.
    pub async fn close_auction(&self, auction_id: i64) -> Result<Auction, AuctionError> {
        let closed = self
            .store
            .atomic_update(auction_id, |entry| {
                let now = Utc::now();
                if entry.auction.status != AuctionStatus::Active {
                    return Err(AuctionError::conflict("auction is not active"));
                }
                if now < entry.auction.ends_at {
                    return Err(AuctionError::conflict("auction has not ended yet"));
                }
                entry.auction.status = AuctionStatus::Closed;
                Ok(entry.auction.clone())
            })
            .await?;

        if let Some(winner_id) = closed.highest_bidder_id {
            // Award failure does not revert the close.
            match self
                .users
                .award_reputation(winner_id, WINNER_REPUTATION_BONUS)
                .await
            {
                Ok(()) => info!(
                    "{:<12} --> auction {} closed, user {} awarded {} reputation",
                    "Command", auction_id, winner_id, WINNER_REPUTATION_BONUS
                ),
                Err(e) => warn!(
                    "{:<12} --> auction {} closed but reputation award for user {} failed: {}",
                    "Command", auction_id, winner_id, e
                ),
            }
        } else {
            info!(
                "{:<12} --> auction {} closed with no bids",
                "Command", auction_id
            );
        }
        Ok(closed)
    }

    /// Cancel an auction. Only the seller may cancel, and only while no bid
    /// has been accepted.
    pub async fn cancel_auction(
        &self,
        auction_id: i64,
        caller_wallet: &str,
    ) -> Result<Auction, AuctionError> {
        if !self.store.contains(auction_id).await {
            return Err(AuctionError::not_found(format!(
                "auction {} not found",
                auction_id
            )));
        }

        // Lookup without create: an unknown wallet cannot be the seller.
        let caller_id = self.users.lookup(caller_wallet).await.map(|u| u.id);

        let cancelled = self
            .store
            .atomic_update(auction_id, |entry| {
                if caller_id != Some(entry.auction.seller_id) {
                    return Err(AuctionError::forbidden(
                        "only the seller can cancel the auction",
                    ));
                }
                if entry.auction.status != AuctionStatus::Active {
                    return Err(AuctionError::conflict("auction is not active"));
                }
                if entry.auction.current_highest_bid.is_some() {
                    return Err(AuctionError::conflict(
                        "cannot cancel an auction with existing bids",
                    ));
                }
                entry.auction.status = AuctionStatus::Cancelled;
                Ok(entry.auction.clone())
            })
            .await?;

        info!(
            "{:<12} --> auction {} cancelled by seller",
            "Command", auction_id
        );
        Ok(cancelled)
    }

    /// Active auctions whose deadline has passed, for the closing sweeper.
    pub async fn expired_auction_ids(&self, now: DateTime<Utc>) -> Vec<i64> {
        self.store.expired_active(now).await
    }
}

// endregion: --- Auction Service
