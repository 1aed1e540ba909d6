//! Accrual Engine
//!
//! The Accrual Engine computes loyalty accruals for purchase orders. Clients register orders together with the goods
//! that were bought, register reward rules that match goods descriptions, and poll for the accrual of an order once
//! it has been processed.
//!
//! The library is divided into the following sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. The [`AccrualDatabase`] trait
//!    defines the contract a backend has to fulfil. The data types used in the database live in [`db_types`] and are
//!    public.
//! 2. The public API ([`AccrualApi`]). It validates incoming orders and reward rules, owns the reward-rule cache and
//!    drives orders through the processing state machine.
//! 3. The reward [`matcher`], a pure function that turns a list of goods and a set of reward rules into an accrual.
//! 4. The [`events`] module, which hosts the background accrual processor. The boundary layer publishes a
//!    notification for every new order, and the processor advances registered orders in response.
//! 5. The [`admission`] controller, a per-client token bucket used to throttle read requests.
mod api;
mod db;

pub mod admission;
pub mod cache;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod matcher;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    accrual_api::AccrualApi,
    errors::{AccrualError, ErrorCategory},
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::AccrualDatabase;
