//! Coachmarket - Marketplace subscription lifecycle and billing reconciliation.
//!
//! This crate implements the billing engine that keeps the payment gateway,
//! the local entitlement ledger, and provisioned messaging channels in
//! agreement under out-of-order, at-least-once webhook delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
