pub mod bidding;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod model;
pub mod query;
pub mod scheduler;
pub mod store;
