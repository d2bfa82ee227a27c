/// Auction store: each auction is a single point of serialization.
/// A transition runs as one atomic unit under that auction's own lock, so two
/// racing bids can never both pass validation against the same stale state.
/// Unrelated auctions never contend.
// region:    --- Imports
use crate::error::AuctionError;
use crate::model::{Auction, AuctionStatus, Bid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

// endregion: --- Imports

// region:    --- Auction Entry

/// One auction together with its bid history. Guarded as a unit, so a bid
/// append and the highest-bid update are indivisible.
pub struct AuctionEntry {
    pub auction: Auction,
    /// Accepted bids in acceptance order.
    pub bids: Vec<Bid>,
}

// endregion: --- Auction Entry

// region:    --- Auction Store

struct StoreInner {
    entries: HashMap<i64, Arc<Mutex<AuctionEntry>>>,
    /// flag_id -> id of its Active auction. Enforces at most one Active
    /// auction per flag; maintained on create and on terminal transitions.
    active_by_flag: HashMap<i64, i64>,
}

pub struct AuctionStore {
    inner: RwLock<StoreInner>,
    auction_seq: AtomicI64,
    bid_seq: AtomicI64,
}

impl AuctionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                entries: HashMap::new(),
                active_by_flag: HashMap::new(),
            }),
            auction_seq: AtomicI64::new(1),
            bid_seq: AtomicI64::new(1),
        }
    }

    /// Next bid id. Ids are globally monotonic; gaps from rejected bids are fine.
    pub fn next_bid_id(&self) -> i64 {
        self.bid_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a new Active auction. The uniqueness check against an existing
    /// Active auction for the same flag and the insert are one step under the
    /// store-level write lock.
    pub async fn create(
        &self,
        flag_id: i64,
        seller_id: i64,
        starting_price: Decimal,
        ends_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<Auction, AuctionError> {
        let mut inner = self.inner.write().await;
        if inner.active_by_flag.contains_key(&flag_id) {
            return Err(AuctionError::conflict(
                "there is already an active auction for this flag",
            ));
        }

        let id = self.auction_seq.fetch_add(1, Ordering::Relaxed);
        let auction = Auction {
            id,
            flag_id,
            seller_id,
            starting_price,
            current_highest_bid: None,
            highest_bidder_id: None,
            status: AuctionStatus::Active,
            ends_at,
            created_at,
        };
        inner.active_by_flag.insert(flag_id, id);
        inner.entries.insert(
            id,
            Arc::new(Mutex::new(AuctionEntry {
                auction: auction.clone(),
                bids: Vec::new(),
            })),
        );
        Ok(auction)
    }

    /// Apply a transition function to one auction under its exclusive lock.
    /// The closure is synchronous over the in-memory entry; no I/O happens
    /// inside the critical section. Returns `NotFound` for unknown auctions
    /// and propagates whatever the transition itself rejects.
    pub async fn atomic_update<T>(
        &self,
        auction_id: i64,
        f: impl FnOnce(&mut AuctionEntry) -> Result<T, AuctionError>,
    ) -> Result<T, AuctionError> {
        let entry = self
            .entry(auction_id)
            .await
            .ok_or_else(|| AuctionError::not_found(format!("auction {} not found", auction_id)))?;

        let (result, released_flag) = {
            let mut guard = entry.lock().await;
            let was_active = guard.auction.status == AuctionStatus::Active;
            let result = f(&mut guard);
            let left_active = result.is_ok()
                && was_active
                && guard.auction.status != AuctionStatus::Active;
            (result, left_active.then_some(guard.auction.flag_id))
        };

        // Terminal transition committed: free the flag for a new auction.
        // Done after the entry lock is released; the store lock and entry
        // locks are never held at the same time.
        if let Some(flag_id) = released_flag {
            let mut inner = self.inner.write().await;
            if inner.active_by_flag.get(&flag_id) == Some(&auction_id) {
                inner.active_by_flag.remove(&flag_id);
            }
        }
        result
    }

    pub async fn contains(&self, auction_id: i64) -> bool {
        self.inner.read().await.entries.contains_key(&auction_id)
    }

    /// Consistent snapshot of one auction and its bid history.
    pub async fn snapshot(&self, auction_id: i64) -> Option<(Auction, Vec<Bid>)> {
        let entry = self.entry(auction_id).await?;
        let guard = entry.lock().await;
        Some((guard.auction.clone(), guard.bids.clone()))
    }

    /// Snapshot of every auction with its bid count, ordered by `ends_at`
    /// ascending. Each row is a consistent snapshot of one auction; no
    /// cross-auction consistency is implied.
    pub async fn list(&self) -> Vec<(Auction, usize)> {
        let entries: Vec<_> = {
            let inner = self.inner.read().await;
            inner.entries.values().cloned().collect()
        };
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let guard = entry.lock().await;
            rows.push((guard.auction.clone(), guard.bids.len()));
        }
        rows.sort_by_key(|(auction, _)| auction.ends_at);
        rows
    }

    /// Ids of Active auctions whose deadline has passed, oldest deadline first.
    pub async fn expired_active(&self, now: DateTime<Utc>) -> Vec<i64> {
        let mut expired: Vec<(DateTime<Utc>, i64)> = Vec::new();
        for (auction, _) in self.list().await {
            if auction.status == AuctionStatus::Active && auction.ends_at <= now {
                expired.push((auction.ends_at, auction.id));
            }
        }
        expired.sort();
        expired.into_iter().map(|(_, id)| id).collect()
    }

    async fn entry(&self, auction_id: i64) -> Option<Arc<Mutex<AuctionEntry>>> {
        self.inner.read().await.entries.get(&auction_id).cloned()
    }
}

impl Default for AuctionStore {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Auction Store
