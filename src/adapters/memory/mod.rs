//! In-memory adapters.
//!
//! Back the stores with maps behind tokio locks. Used for tests and local
//! development; the trait contracts (atomic reservation, first-writer-wins
//! event ledger) hold exactly as a database-backed adapter would provide them.

mod creator_account_store;
mod program_store;
mod subscription_store;
mod webhook_event_store;

pub use creator_account_store::InMemoryCreatorAccountStore;
pub use program_store::InMemoryProgramStore;
pub use subscription_store::InMemorySubscriptionStore;
pub use webhook_event_store::InMemoryWebhookEventStore;
