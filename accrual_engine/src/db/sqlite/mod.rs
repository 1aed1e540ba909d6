//! SQLite database module for the Accrual Engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
