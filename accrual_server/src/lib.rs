//! # Accrual server
//! This module hosts the HTTP boundary of the accrual engine. It is responsible for:
//! Accepting new orders and reward rules, and validating them.
//! Notifying the accrual processor when a new order has been registered.
//! Reporting the status and accrual of orders, while rate limiting clients that poll too eagerly.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/orders`: Register an order and its goods.
//! * `GET /api/orders/{number}`: Fetch the status (and, once processed, the accrual) of an order. Rate limited.
//! * `POST /api/goods`: Register a reward rule.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
