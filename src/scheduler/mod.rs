/// Closing sweeper
/// Periodically finalizes Active auctions past their deadline by driving the
/// same atomic close transition as a direct close call. Safe to run
/// concurrently with itself and with direct closes: a racing close shows up
/// here as a per-auction conflict, which is logged and skipped.
// region:    --- Imports
use crate::bidding::commands::AuctionService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Closing Sweeper

pub struct ClosingSweeper {
    service: Arc<AuctionService>,
    period: Duration,
}

impl ClosingSweeper {
    pub fn new(service: Arc<AuctionService>, period: Duration) -> Self {
        Self { service, period }
    }

    /// Spawn the periodic sweep loop.
    pub async fn start(&self) {
        let service = Arc::clone(&self.service);
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                Self::sweep_once(&service).await;
            }
        });
    }

    /// One sweep pass. Per-auction failures never abort the sweep.
    pub async fn sweep_once(service: &AuctionService) {
        let expired = service.expired_auction_ids(Utc::now()).await;
        for auction_id in expired {
            match service.close_auction(auction_id).await {
                Ok(auction) => info!(
                    "{:<12} --> auction {} closed, winner: {:?}",
                    "Sweeper", auction.id, auction.highest_bidder_id
                ),
                // Lost the race to a direct close or another sweep pass.
                Err(e) if e.is_conflict() => debug!(
                    "{:<12} --> auction {} already finalized: {}",
                    "Sweeper", auction_id, e
                ),
                Err(e) => error!(
                    "{:<12} --> failed to close auction {}: {}",
                    "Sweeper", auction_id, e
                ),
            }
        }
    }
}

// endregion: --- Closing Sweeper
