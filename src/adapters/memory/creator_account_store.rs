//! In-memory CreatorAccountStore.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::creator_account_store::{CreatorAccount, CreatorAccountStore};

/// Map-backed creator account store.
#[derive(Default)]
pub struct InMemoryCreatorAccountStore {
    accounts: Arc<RwLock<HashMap<UserId, CreatorAccount>>>,
}

impl InMemoryCreatorAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fully onboarded account for a creator.
    pub async fn with_onboarded(self, creator_id: UserId) -> Self {
        let account = CreatorAccount {
            creator_id: creator_id.clone(),
            gateway_account_id: format!("acct_{}", creator_id),
            charges_enabled: true,
        };
        self.accounts.write().await.insert(creator_id, account);
        self
    }
}

#[async_trait]
impl CreatorAccountStore for InMemoryCreatorAccountStore {
    async fn get(&self, creator_id: &UserId) -> Result<Option<CreatorAccount>, DomainError> {
        Ok(self.accounts.read().await.get(creator_id).cloned())
    }

    async fn save(&self, account: CreatorAccount) -> Result<(), DomainError> {
        self.accounts
            .write()
            .await
            .insert(account.creator_id.clone(), account);
        Ok(())
    }
}
