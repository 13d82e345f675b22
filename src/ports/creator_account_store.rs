//! CreatorAccountStore port - payment onboarding state for creators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// A creator's connected payment account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorAccount {
    /// Creator who owns the account.
    pub creator_id: UserId,

    /// The gateway's connected-account id (acct_xxx format).
    pub gateway_account_id: String,

    /// Whether the gateway will accept charges routed to this account.
    pub charges_enabled: bool,
}

impl CreatorAccount {
    /// True if checkouts may route funds to this creator.
    pub fn is_onboarded(&self) -> bool {
        self.charges_enabled
    }
}

/// Port for reading creator payment-account state.
///
/// Onboarding itself happens out of band (gateway-hosted flow); this port
/// only answers whether it has completed.
#[async_trait]
pub trait CreatorAccountStore: Send + Sync {
    /// Find the connected account for a creator.
    async fn get(&self, creator_id: &UserId) -> Result<Option<CreatorAccount>, DomainError>;

    /// Insert or update a connected account.
    async fn save(&self, account: CreatorAccount) -> Result<(), DomainError>;
}
