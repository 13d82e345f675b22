//! StartCheckoutHandler - opens a gateway checkout for a (client, program).
//!
//! The capacity slot is reserved optimistically BEFORE the gateway call, so a
//! program can never hand out more checkout sessions than it has open slots.
//! If the gateway call fails the reservation is rolled back and no row is
//! written; if the client never pays, the abandonment sweep reclaims the slot.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::BillingConfig;
use crate::domain::foundation::{DomainError, ProgramId, SubscriptionId, UserId};
use crate::domain::program::ProgramError;
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{
    CheckoutRequest, CreatorAccountStore, PaymentGateway, ProgramStore, SlotReservation,
    SubscriptionStore,
};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    /// Client initiating the purchase.
    pub client_id: UserId,
    /// Program being purchased.
    pub program_id: ProgramId,
}

/// Result of starting a checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    /// The provisional subscription row.
    pub subscription_id: SubscriptionId,
    /// The gateway's checkout session id.
    pub checkout_session_id: String,
    /// URL the client is redirected to.
    pub checkout_url: String,
}

/// Handler for starting checkouts.
pub struct StartCheckoutHandler {
    programs: Arc<dyn ProgramStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    creator_accounts: Arc<dyn CreatorAccountStore>,
    gateway: Arc<dyn PaymentGateway>,
    billing: BillingConfig,
}

impl StartCheckoutHandler {
    pub fn new(
        programs: Arc<dyn ProgramStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        creator_accounts: Arc<dyn CreatorAccountStore>,
        gateway: Arc<dyn PaymentGateway>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            programs,
            subscriptions,
            creator_accounts,
            gateway,
            billing,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, DomainError> {
        // 1. Program must exist and accept new clients
        let program = self
            .programs
            .get(cmd.program_id)
            .await?
            .ok_or_else(|| ProgramError::not_found(cmd.program_id))?;
        if !program.active {
            return Err(ProgramError::inactive(program.id).into());
        }

        // 2. Creator must be able to receive funds
        let account = self
            .creator_accounts
            .get(&program.creator_id)
            .await?
            .filter(|a| a.is_onboarded())
            .ok_or_else(|| BillingError::onboarding_incomplete(program.creator_id.clone()))?;

        // 3. One live subscription (or pending checkout) per (client, program)
        if self
            .subscriptions
            .find_blocking(&cmd.client_id, cmd.program_id)
            .await?
            .is_some()
        {
            return Err(
                BillingError::already_subscribed(cmd.client_id.clone(), cmd.program_id).into(),
            );
        }

        // 4. Reserve the slot before going to the gateway
        match self.programs.reserve_slot(program.id).await? {
            SlotReservation::Reserved => {}
            SlotReservation::Full => {
                return Err(ProgramError::capacity_exceeded(program.id).into())
            }
        }

        // 5. Open the checkout session; roll the reservation back on failure
        let subscription_id = SubscriptionId::new();
        let request = CheckoutRequest {
            price_id: program.gateway_price_id.clone(),
            creator_account_id: account.gateway_account_id.clone(),
            platform_fee_bps: self.billing.platform_fee_bps,
            trial_days: program.trial.effective_days(),
            success_url: self.billing.success_url.clone(),
            cancel_url: self.billing.cancel_url.clone(),
            metadata: HashMap::from([
                ("subscription_id".to_string(), subscription_id.to_string()),
                ("program_id".to_string(), program.id.to_string()),
                ("client_id".to_string(), cmd.client_id.to_string()),
            ]),
        };

        let session = match self.gateway.create_checkout_session(request).await {
            Ok(session) => session,
            Err(err) => {
                if let Err(release_err) = self.programs.release_slot(program.id).await {
                    error!(
                        program_id = %program.id,
                        error = %release_err,
                        "failed to roll back slot reservation after gateway error"
                    );
                }
                return Err(BillingError::gateway(err.to_string()).into());
            }
        };

        // 6. Persist the provisional row
        let subscription = Subscription::create_pending(
            subscription_id,
            cmd.client_id,
            program.id,
            program.creator_id,
            session.id.clone(),
        );
        if let Err(err) = self.subscriptions.save(subscription).await {
            if let Err(release_err) = self.programs.release_slot(program.id).await {
                error!(
                    program_id = %program.id,
                    error = %release_err,
                    "failed to roll back slot reservation after save error"
                );
            }
            return Err(err);
        }

        info!(
            subscription_id = %subscription_id,
            program_id = %program.id,
            checkout_session_id = %session.id,
            "checkout started"
        );

        Ok(StartCheckoutResult {
            subscription_id,
            checkout_session_id: session.id,
            checkout_url: session.url,
        })
    }
}
