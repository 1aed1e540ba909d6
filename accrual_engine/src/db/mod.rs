//! #  Database management and control.
//!
//! This module defines the interface contract of the accrual engine database *backends* ([`traits`]) and hosts the
//! SQLite implementation ([`sqlite`]).
//!
//! Backends own durable state only: orders, their goods and reward rules. Every mutation that touches more than one
//! row runs inside a single transaction, and uniqueness of order numbers and reward match strings is enforced by the
//! storage layer itself.
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
