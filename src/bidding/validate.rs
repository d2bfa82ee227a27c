/// Pure bid validation. Decides whether a proposed bid is acceptable against
/// the auction state it is evaluated under; the caller is responsible for
/// running this inside the auction's atomic unit.
use crate::error::AuctionError;
use crate::model::{Auction, AuctionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// The smallest amount a bid must strictly exceed right now.
pub fn min_acceptable(auction: &Auction) -> Decimal {
    auction.current_highest_bid.unwrap_or(auction.starting_price)
}

/// Check a proposed bid against the current auction state.
///
/// Order of checks: status, deadline, self-bid, amount. An expired but not
/// yet swept auction rejects the bid outright; it is not closed here.
pub fn check_bid(
    auction: &Auction,
    bidder_id: i64,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), AuctionError> {
    if auction.status != AuctionStatus::Active {
        return Err(AuctionError::conflict("auction is not active"));
    }
    if now >= auction.ends_at {
        return Err(AuctionError::conflict("auction has ended"));
    }
    if bidder_id == auction.seller_id {
        return Err(AuctionError::forbidden("cannot bid on your own auction"));
    }
    let min = min_acceptable(auction);
    if amount <= min {
        return Err(AuctionError::below_minimum(min));
    }
    Ok(())
}
