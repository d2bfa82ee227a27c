use crate::error::AuctionError;
use crate::model::{Flag, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Maps wallet addresses to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a wallet to its user, creating the record on first sight.
    async fn resolve_or_create(&self, wallet_address: &str) -> Result<User, AuctionError>;

    /// Resolve a wallet without creating a record.
    async fn lookup(&self, wallet_address: &str) -> Option<User>;

    async fn get(&self, user_id: i64) -> Option<User>;

    async fn award_reputation(&self, user_id: i64, points: i64) -> Result<(), AuctionError>;
}

/// Source of truth for which user currently holds a flag.
#[async_trait]
pub trait OwnershipRegistry: Send + Sync {
    async fn flag_exists(&self, flag_id: i64) -> bool;

    async fn current_owner(&self, flag_id: i64) -> Option<i64>;
}

/// Wallets are matched case-insensitively.
fn normalize_wallet(wallet_address: &str) -> String {
    wallet_address.trim().to_lowercase()
}

#[derive(Default)]
struct DirectoryInner {
    by_wallet: HashMap<String, i64>,
    users: HashMap<i64, User>,
}

/// In-process user directory.
pub struct InMemoryUserDirectory {
    inner: RwLock<DirectoryInner>,
    seq: AtomicI64,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DirectoryInner::default()),
            seq: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn resolve_or_create(&self, wallet_address: &str) -> Result<User, AuctionError> {
        let wallet = normalize_wallet(wallet_address);
        if wallet.is_empty() {
            return Err(AuctionError::invalid("wallet address must not be empty"));
        }

        {
            let inner = self.inner.read().await;
            if let Some(id) = inner.by_wallet.get(&wallet) {
                return Ok(inner.users[id].clone());
            }
        }

        let mut inner = self.inner.write().await;
        // Re-check under the write lock; another caller may have created it.
        if let Some(id) = inner.by_wallet.get(&wallet) {
            return Ok(inner.users[id].clone());
        }
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        let user = User {
            id,
            wallet_address: wallet.clone(),
            username: None,
            reputation_score: 0,
            created_at: Utc::now(),
        };
        inner.by_wallet.insert(wallet, id);
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn lookup(&self, wallet_address: &str) -> Option<User> {
        let wallet = normalize_wallet(wallet_address);
        let inner = self.inner.read().await;
        let id = inner.by_wallet.get(&wallet)?;
        inner.users.get(id).cloned()
    }

    async fn get(&self, user_id: i64) -> Option<User> {
        self.inner.read().await.users.get(&user_id).cloned()
    }

    async fn award_reputation(&self, user_id: i64, points: i64) -> Result<(), AuctionError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AuctionError::not_found(format!("user {} not found", user_id)))?;
        user.reputation_score += points;
        Ok(())
    }
}

#[derive(Default)]
struct RegistryInner {
    flags: HashMap<i64, Flag>,
    owners: HashMap<i64, i64>,
}

/// In-process ownership registry.
pub struct InMemoryOwnershipRegistry {
    inner: RwLock<RegistryInner>,
}

impl InMemoryOwnershipRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub async fn register_flag(&self, flag: Flag) {
        self.inner.write().await.flags.insert(flag.id, flag);
    }

    pub async fn set_owner(&self, flag_id: i64, user_id: i64) {
        self.inner.write().await.owners.insert(flag_id, user_id);
    }
}

impl Default for InMemoryOwnershipRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OwnershipRegistry for InMemoryOwnershipRegistry {
    async fn flag_exists(&self, flag_id: i64) -> bool {
        self.inner.read().await.flags.contains_key(&flag_id)
    }

    async fn current_owner(&self, flag_id: i64) -> Option<i64> {
        self.inner.read().await.owners.get(&flag_id).copied()
    }
}
