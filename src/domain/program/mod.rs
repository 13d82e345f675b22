//! Program domain - Sellable offerings and capacity accounting.
//!
//! A Program is a creator's recurring offering: a price reference at the
//! payment gateway, trial terms, and an optional client capacity. The
//! `current_clients` counter is maintained by construction (adjusted in the
//! same store operation as the transition that takes or returns a slot),
//! never recomputed by scanning.

mod aggregate;
mod errors;

pub use aggregate::{Program, TrialTerms};
pub use errors::ProgramError;
