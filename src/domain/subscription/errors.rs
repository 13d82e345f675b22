//! Subscription-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, ProgramId, SubscriptionId, UserId};

/// Errors raised by the subscription lifecycle and billing flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Subscription does not exist.
    NotFound(SubscriptionId),

    /// Client already has a live subscription (or pending checkout) for this
    /// program.
    AlreadySubscribed { client_id: UserId, program_id: ProgramId },

    /// Creator has not completed payment onboarding; checkout cannot route
    /// funds to them.
    OnboardingIncomplete(UserId),

    /// Attempted status change the state machine forbids.
    InvalidState { current: String, attempted: String },

    /// Caller does not own this subscription.
    Unauthorized { user_id: UserId, subscription_id: SubscriptionId },

    /// Payment gateway call failed.
    Gateway(String),

    /// Infrastructure error from the backing store.
    Infrastructure(String),
}

impl BillingError {
    pub fn not_found(id: SubscriptionId) -> Self {
        BillingError::NotFound(id)
    }

    pub fn already_subscribed(client_id: UserId, program_id: ProgramId) -> Self {
        BillingError::AlreadySubscribed {
            client_id,
            program_id,
        }
    }

    pub fn onboarding_incomplete(creator_id: UserId) -> Self {
        BillingError::OnboardingIncomplete(creator_id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn unauthorized(user_id: UserId, subscription_id: SubscriptionId) -> Self {
        BillingError::Unauthorized {
            user_id,
            subscription_id,
        }
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        BillingError::Gateway(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::AlreadySubscribed { .. } => ErrorCode::AlreadySubscribed,
            BillingError::OnboardingIncomplete(_) => ErrorCode::OnboardingIncomplete,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::Unauthorized { .. } => ErrorCode::Forbidden,
            BillingError::Gateway(_) => ErrorCode::GatewayUnavailable,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Whether a retry of the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Gateway(_) | BillingError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingError::NotFound(id) => write!(f, "Subscription not found: {}", id),
            BillingError::AlreadySubscribed {
                client_id,
                program_id,
            } => write!(
                f,
                "Client {} already has a subscription for program {}",
                client_id, program_id
            ),
            BillingError::OnboardingIncomplete(creator_id) => write!(
                f,
                "Creator {} has not completed payment onboarding",
                creator_id
            ),
            BillingError::InvalidState { current, attempted } => write!(
                f,
                "Cannot {} from status {}",
                attempted, current
            ),
            BillingError::Unauthorized {
                user_id,
                subscription_id,
            } => write!(
                f,
                "User {} does not own subscription {}",
                user_id, subscription_id
            ),
            BillingError::Gateway(msg) => write!(f, "Payment gateway error: {}", msg),
            BillingError::Infrastructure(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_taxonomy() {
        let sub_id = SubscriptionId::new();
        let user = UserId::new("client-1").unwrap();
        assert_eq!(
            BillingError::not_found(sub_id).code(),
            ErrorCode::SubscriptionNotFound
        );
        assert_eq!(
            BillingError::already_subscribed(user.clone(), ProgramId::new()).code(),
            ErrorCode::AlreadySubscribed
        );
        assert_eq!(
            BillingError::unauthorized(user, sub_id).code(),
            ErrorCode::Forbidden
        );
        assert_eq!(
            BillingError::gateway("timeout").code(),
            ErrorCode::GatewayUnavailable
        );
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(BillingError::gateway("timeout").is_retryable());
        assert!(BillingError::infrastructure("pool exhausted").is_retryable());
        assert!(!BillingError::not_found(SubscriptionId::new()).is_retryable());
        assert!(!BillingError::invalid_state("CANCELED", "confirm").is_retryable());
    }
}
