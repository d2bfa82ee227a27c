// region:    --- Imports
use crate::bidding::commands::AuctionService;
use crate::config::AppConfig;
use crate::directory::{InMemoryOwnershipRegistry, InMemoryUserDirectory, UserDirectory};
use crate::model::Flag;
use crate::scheduler::ClosingSweeper;
use crate::store::AuctionStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
// endregion: --- Imports

// region:    --- Modules
mod bidding;
mod config;
mod directory;
mod error;
mod handlers;
mod model;
mod query;
mod scheduler;
mod store;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging init
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let cfg = AppConfig::from_env();
    info!("{:<12} --> starting with config: {:?}", "Main", cfg);

    // collaborators and store
    let users = Arc::new(InMemoryUserDirectory::new());
    let registry = Arc::new(InMemoryOwnershipRegistry::new());
    let store = Arc::new(AuctionStore::new());

    // demo catalog entries; catalog management itself is an external concern
    seed_demo_flags(&users, &registry).await?;

    let service = Arc::new(AuctionService::new(store, users, registry));

    // closing sweeper for expired auctions
    let sweeper = ClosingSweeper::new(Arc::clone(&service), cfg.sweep_interval);
    sweeper.start().await;

    // router
    let routes_all = handlers::router(service);

    // listener
    let listener = TcpListener::bind(&cfg.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    axum::serve(listener, routes_all.into_make_service()).await?;
    Ok(())
}

/// Register a couple of flags with a demo owner so the service is usable out
/// of the box. Real deployments feed the registry from the catalog pipeline.
async fn seed_demo_flags(
    users: &Arc<InMemoryUserDirectory>,
    registry: &Arc<InMemoryOwnershipRegistry>,
) -> Result<(), Box<dyn std::error::Error>> {
    let owner_wallet = std::env::var("DEMO_OWNER_WALLET")
        .unwrap_or_else(|_| "0x00000000000000000000000000000000000000d1".to_string());
    let owner = users.resolve_or_create(&owner_wallet).await?;

    for (id, name) in [(1, "Springfield"), (2, "Shelbyville")] {
        registry
            .register_flag(Flag {
                id,
                name: name.to_string(),
            })
            .await;
        registry.set_owner(id, owner.id).await;
    }
    info!(
        "{:<12} --> seeded demo flags for owner {}",
        "Main", owner.wallet_address
    );
    Ok(())
}
// endregion: --- Main
