//! Chat provider adapter.

mod mock;
mod provider;

pub use mock::MockMessagingGateway;
pub use provider::ChatProvider;
