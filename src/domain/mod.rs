//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `program` - Sellable programs and capacity accounting
//! - `subscription` - Entitlement ledger: the billing state machine

pub mod foundation;
pub mod program;
pub mod subscription;
