//! # Accrual engine public API
//!
//! [`accrual_api::AccrualApi`] is the entry point for the boundary layer and the background processor. It is created
//! by supplying a database backend that implements [`crate::AccrualDatabase`].
//!
//! ```rust,ignore
//! use accrual_engine::{AccrualApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/accrual.db", 25).await?;
//! // Loads every reward rule into the cache
//! let api = AccrualApi::initialize(db).await?;
//! let status = api.get_order(&"79927398713".parse()?).await?;
//! ```

pub mod accrual_api;
pub mod errors;
