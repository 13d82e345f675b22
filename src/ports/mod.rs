//! Ports - interfaces the application layer depends on.
//!
//! Adapters implement these traits; handlers only ever see the trait objects.

pub mod creator_account_store;
pub mod messaging_gateway;
pub mod payment_gateway;
pub mod program_store;
pub mod subscription_store;
pub mod webhook_event_store;

pub use creator_account_store::{CreatorAccount, CreatorAccountStore};
pub use messaging_gateway::{Channel, CreateChannelRequest, MessagingError, MessagingGateway};
pub use payment_gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode, PaymentGateway,
    SubscriptionSnapshot,
};
pub use program_store::{ProgramStore, SlotReservation};
pub use subscription_store::SubscriptionStore;
pub use webhook_event_store::{SaveResult, WebhookEventRecord, WebhookEventStore};
