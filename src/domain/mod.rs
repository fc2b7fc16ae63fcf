//! Domain models - core business types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Customer` - one arrival, carrying its one-shot outcome slot
//! - `PendingOutcome` - the customer's side of the outcome slot
//! - `CustomerId`, `Outcome`, `BarberState` - small shared types

pub mod customer;
pub mod types;

pub use customer::{Customer, PendingOutcome};
pub use types::{BarberState, CustomerId, Outcome};
