//! Row decoding for the accrual tables.
//!
//! SQLite has no decimal type, so decimals are stored as canonical text and parsed back here.
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use crate::db_types::{Good, Order, RewardRule};

fn parse_decimal(column: &str, value: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(value)
        .map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let value: String = row.try_get(column)?;
    parse_decimal(column, &value)
}

fn optional_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let value: Option<String> = row.try_get(column)?;
    value.map(|v| parse_decimal(column, &v)).transpose()
}

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            number: row.try_get("number")?,
            status: row.try_get("status")?,
            accrual: optional_decimal(row, "accrual")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Good {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self { description: row.try_get("description")?, price: decimal(row, "price")? })
    }
}

impl<'r> FromRow<'r, SqliteRow> for RewardRule {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            match_key: row.try_get("match_key")?,
            reward: decimal(row, "reward")?,
            reward_type: row.try_get("reward_type")?,
        })
    }
}
