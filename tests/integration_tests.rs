use chrono::{Duration, Utc};
use flag_auction_service::bidding::commands::AuctionService;
use flag_auction_service::directory::{
    InMemoryOwnershipRegistry, InMemoryUserDirectory, UserDirectory,
};
use flag_auction_service::error::AuctionError;
use flag_auction_service::model::{AuctionStatus, Flag};
use flag_auction_service::query;
use flag_auction_service::scheduler::ClosingSweeper;
use flag_auction_service::store::AuctionStore;
use rust_decimal::Decimal;
use std::sync::Arc;

const SELLER_WALLET: &str = "0x00000000000000000000000000000000000000aa";
const BIDDER_WALLET: &str = "0x00000000000000000000000000000000000000bb";
const OTHER_WALLET: &str = "0x00000000000000000000000000000000000000cc";

const FLAG_ID: i64 = 1;

struct TestEnv {
    service: Arc<AuctionService>,
    users: Arc<InMemoryUserDirectory>,
    registry: Arc<InMemoryOwnershipRegistry>,
}

/// Build a service with one flag owned by the seller wallet.
async fn setup() -> TestEnv {
    let users = Arc::new(InMemoryUserDirectory::new());
    let registry = Arc::new(InMemoryOwnershipRegistry::new());
    registry
        .register_flag(Flag {
            id: FLAG_ID,
            name: "Springfield".to_string(),
        })
        .await;
    let seller = users.resolve_or_create(SELLER_WALLET).await.unwrap();
    registry.set_owner(FLAG_ID, seller.id).await;

    let service = Arc::new(AuctionService::new(
        Arc::new(AuctionStore::new()),
        users.clone() as Arc<dyn UserDirectory>,
        registry.clone(),
    ));
    TestEnv {
        service,
        users,
        registry,
    }
}

/// Amount in cents, e.g. dec(1001) == 10.01.
fn dec(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Move an auction's deadline into the past so close paths can run.
async fn expire_now(service: &AuctionService, auction_id: i64) {
    service
        .store()
        .atomic_update(auction_id, |entry| {
            entry.auction.ends_at = Utc::now() - Duration::seconds(1);
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_first_bid_must_strictly_exceed_starting_price() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();

    // Meeting the starting price is not enough.
    let err = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(1000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuctionError::Conflict {
            min_acceptable: Some(min),
            ..
        } if min == dec(1000)
    ));

    let bid = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(1001))
        .await
        .unwrap();
    assert_eq!(bid.amount, dec(1001));

    let (updated, bids) = env.service.store().snapshot(auction.id).await.unwrap();
    assert_eq!(updated.current_highest_bid, Some(dec(1001)));
    assert_eq!(updated.highest_bidder_id, Some(bid.bidder_id));
    assert_eq!(bids.len(), 1);
}

#[tokio::test]
async fn test_lower_racing_bid_sees_fresh_minimum() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    env.service
        .place_bid(auction.id, BIDDER_WALLET, dec(1001))
        .await
        .unwrap();

    // 15.00 serializes first; the 12.00 bid is then judged against it.
    env.service
        .place_bid(auction.id, OTHER_WALLET, dec(1500))
        .await
        .unwrap();
    let err = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(1200))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuctionError::Conflict {
            min_acceptable: Some(min),
            ..
        } if min == dec(1500)
    ));
}

#[tokio::test]
async fn test_concurrent_bids_single_winner() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(10000), 24)
        .await
        .unwrap();

    // 50 concurrent bids with distinct amounts and bidders.
    let mut handles = vec![];
    for i in 1..=50i64 {
        let service = Arc::clone(&env.service);
        let auction_id = auction.id;
        handles.push(tokio::spawn(async move {
            let wallet = format!("0x{:040x}", 0x1000 + i);
            let amount = dec(10000 + i * 100);
            service.place_bid(auction_id, &wallet, amount).await
        }));
    }

    let mut accepted: usize = 0;
    let mut rejected: usize = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => {
                assert!(e.is_conflict(), "unexpected rejection kind: {e}");
                rejected += 1;
            }
        }
    }
    assert!(accepted >= 1);
    assert_eq!(accepted + rejected, 50);

    let detail = query::handlers::get_auction_detail(
        env.service.store(),
        env.service.users(),
        auction.id,
    )
    .await
    .unwrap();

    // Exactly the accepted bids are recorded, strictly increasing in
    // acceptance order, and the highest is the recorded winner.
    assert_eq!(detail.bid_count, accepted);
    let mut amounts: Vec<Decimal> = detail.bids.iter().map(|b| b.amount).collect();
    amounts.reverse(); // history is newest first
    assert!(amounts.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(detail.current_highest_bid, amounts.last().copied());
    assert!(detail.highest_bidder.is_some());
}

#[tokio::test]
async fn test_seller_cannot_bid_on_own_auction() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();

    let err = env
        .service
        .place_bid(auction.id, SELLER_WALLET, dec(5000))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    // Case-insensitive wallet matching: same seller, different casing.
    let err = env
        .service
        .place_bid(auction.id, &SELLER_WALLET.to_uppercase(), dec(5000))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
}

#[tokio::test]
async fn test_cancel_only_without_bids() {
    let env = setup().await;

    // No bids: the seller can cancel, and the flag frees up again.
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    let cancelled = env
        .service
        .cancel_auction(auction.id, SELLER_WALLET)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AuctionStatus::Cancelled);

    // Bidding on a cancelled auction is a conflict.
    let err = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(2000))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // With a bid accepted, cancellation is refused for good.
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    env.service
        .place_bid(auction.id, BIDDER_WALLET, dec(1500))
        .await
        .unwrap();
    let err = env
        .service
        .cancel_auction(auction.id, SELLER_WALLET)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_cancel_requires_seller() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();

    // A different known wallet is rejected.
    env.users.resolve_or_create(OTHER_WALLET).await.unwrap();
    let err = env
        .service
        .cancel_auction(auction.id, OTHER_WALLET)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    // So is a wallet the directory has never seen.
    let err = env
        .service
        .cancel_auction(auction.id, "0x00000000000000000000000000000000000000ff")
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    // The seller with different casing succeeds.
    let cancelled = env
        .service
        .cancel_auction(auction.id, &SELLER_WALLET.to_uppercase())
        .await
        .unwrap();
    assert_eq!(cancelled.status, AuctionStatus::Cancelled);
}

#[tokio::test]
async fn test_close_awards_reputation_exactly_once() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    let bid = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(2000))
        .await
        .unwrap();

    // Too early: the deadline has not passed.
    let err = env.service.close_auction(auction.id).await.unwrap_err();
    assert!(err.is_conflict());

    expire_now(&env.service, auction.id).await;
    let closed = env.service.close_auction(auction.id).await.unwrap();
    assert_eq!(closed.status, AuctionStatus::Closed);
    assert_eq!(closed.highest_bidder_id, Some(bid.bidder_id));

    let winner = env.users.get(bid.bidder_id).await.unwrap();
    assert_eq!(winner.reputation_score, 15);

    // Second close is a conflict, not a silent success, and no double award.
    let err = env.service.close_auction(auction.id).await.unwrap_err();
    assert!(err.is_conflict());
    let winner = env.users.get(bid.bidder_id).await.unwrap();
    assert_eq!(winner.reputation_score, 15);
}

#[tokio::test]
async fn test_expired_auction_rejects_bids_until_swept() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    expire_now(&env.service, auction.id).await;

    // Past the deadline but not yet closed: no further bids, no auto-close.
    let err = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(5000))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    let (snapshot, _) = env.service.store().snapshot(auction.id).await.unwrap();
    assert_eq!(snapshot.status, AuctionStatus::Active);
}

#[tokio::test]
async fn test_sweeper_closes_expired_and_is_idempotent() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    let bid = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(2500))
        .await
        .unwrap();
    expire_now(&env.service, auction.id).await;

    ClosingSweeper::sweep_once(&env.service).await;
    let (closed, _) = env.service.store().snapshot(auction.id).await.unwrap();
    assert_eq!(closed.status, AuctionStatus::Closed);
    assert_eq!(
        env.users.get(bid.bidder_id).await.unwrap().reputation_score,
        15
    );

    // A second pass over the same auction is a no-op.
    ClosingSweeper::sweep_once(&env.service).await;
    assert_eq!(
        env.users.get(bid.bidder_id).await.unwrap().reputation_score,
        15
    );
}

#[tokio::test]
async fn test_single_active_auction_per_flag() {
    let env = setup().await;
    env.service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();

    let err = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(2000), 24)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_create_auction_validation() {
    let env = setup().await;

    // Duration outside [1, 168] hours.
    for duration in [0, 169] {
        let err = env
            .service
            .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), duration)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidArgument(_)));
    }

    // Non-positive starting price.
    let err = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, Decimal::ZERO, 24)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidArgument(_)));

    // Unknown flag.
    let err = env
        .service
        .create_auction(99, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotFound(_)));

    // Known flag, but the caller is not the owner.
    let err = env
        .service
        .create_auction(FLAG_ID, OTHER_WALLET, dec(1000), 24)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    // Ownership moved on: the old owner can no longer list it.
    let new_owner = env.users.resolve_or_create(OTHER_WALLET).await.unwrap();
    env.registry.set_owner(FLAG_ID, new_owner.id).await;
    let err = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
}

#[tokio::test]
async fn test_place_bid_validation() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();

    let err = env
        .service
        .place_bid(999, BIDDER_WALLET, dec(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotFound(_)));

    let err = env
        .service
        .place_bid(auction.id, BIDDER_WALLET, dec(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_list_auctions_ordering_and_filters() {
    let env = setup().await;
    env.registry
        .register_flag(Flag {
            id: 2,
            name: "Shelbyville".to_string(),
        })
        .await;
    let seller = env.users.resolve_or_create(SELLER_WALLET).await.unwrap();
    env.registry.set_owner(2, seller.id).await;

    // Flag 2 ends later than flag 1.
    let first = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    let second = env
        .service
        .create_auction(2, SELLER_WALLET, dec(1000), 48)
        .await
        .unwrap();
    env.service
        .place_bid(second.id, BIDDER_WALLET, dec(1500))
        .await
        .unwrap();

    let listed = query::handlers::list_auctions(env.service.store(), true, None).await;
    assert_eq!(
        listed.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert_eq!(listed[0].bid_count, 0);
    assert_eq!(listed[1].bid_count, 1);

    let only_second = query::handlers::list_auctions(env.service.store(), true, Some(2)).await;
    assert_eq!(only_second.len(), 1);
    assert_eq!(only_second[0].id, second.id);

    // Cancelled auctions drop out of the active view but not the full one.
    env.service
        .cancel_auction(first.id, SELLER_WALLET)
        .await
        .unwrap();
    let active = query::handlers::list_auctions(env.service.store(), true, None).await;
    assert_eq!(active.len(), 1);
    let all = query::handlers::list_auctions(env.service.store(), false, None).await;
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_auction_detail_history_newest_first() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    env.service
        .place_bid(auction.id, BIDDER_WALLET, dec(1100))
        .await
        .unwrap();
    env.service
        .place_bid(auction.id, OTHER_WALLET, dec(1200))
        .await
        .unwrap();
    env.service
        .place_bid(auction.id, BIDDER_WALLET, dec(1300))
        .await
        .unwrap();

    let detail = query::handlers::get_auction_detail(
        env.service.store(),
        env.service.users(),
        auction.id,
    )
    .await
    .unwrap();
    assert_eq!(detail.bid_count, 3);
    assert_eq!(
        detail.bids.iter().map(|b| b.amount).collect::<Vec<_>>(),
        vec![dec(1300), dec(1200), dec(1100)]
    );
    let highest = detail.highest_bidder.unwrap();
    assert_eq!(highest.wallet_address, BIDDER_WALLET);

    let err = query::handlers::get_auction_detail(env.service.store(), env.service.users(), 999)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotFound(_)));
}

#[tokio::test]
async fn test_flag_reusable_after_terminal_state() {
    let env = setup().await;
    let auction = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    expire_now(&env.service, auction.id).await;
    env.service.close_auction(auction.id).await.unwrap();

    // Closed auction freed the flag; a fresh one can be created.
    let next = env
        .service
        .create_auction(FLAG_ID, SELLER_WALLET, dec(1000), 24)
        .await
        .unwrap();
    assert_ne!(next.id, auction.id);
    assert_eq!(next.status, AuctionStatus::Active);
}
