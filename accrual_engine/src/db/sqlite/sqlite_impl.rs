//! `SqliteDatabase` is the concrete SQLite implementation of the Accrual Engine backend.
//!
//! It implements the [`AccrualDatabase`] trait. Every operation that touches more than one row runs inside a single
//! transaction, so callers never observe a partially written order.
use std::fmt::Debug;

use log::*;
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, rewards};
use crate::{
    db_types::{Good, NewOrder, Order, OrderNumber, OrderStatus, RewardRule},
    AccrualDatabase,
    AccrualError,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({}, {:?})", self.url, self.pool)
    }
}

impl AccrualDatabase for SqliteDatabase {
    /// Stores the order and all of its goods in one atomic transaction. If the order number is already taken, nothing
    /// is written and the existing order (including its goods) is left untouched.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, AccrualError> {
        let mut tx = self.pool.begin().await?;
        let record = orders::insert_order(&order.number, &mut tx).await?;
        orders::insert_goods(&order.number, &order.goods, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {} and {} goods", record.number, record.id, order.goods.len());
        Ok(record)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, AccrualError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_goods_for_order(&self, number: &OrderNumber) -> Result<Vec<Good>, AccrualError> {
        let mut conn = self.pool.acquire().await?;
        let goods = orders::fetch_goods(number, &mut conn).await?;
        Ok(goods)
    }

    async fn insert_reward_rule(&self, rule: RewardRule) -> Result<RewardRule, AccrualError> {
        let mut tx = self.pool.begin().await?;
        let rule = rewards::insert_reward(rule, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Reward rule '{}' ({} {}) has been saved in the DB", rule.match_key, rule.reward, rule.reward_type);
        Ok(rule)
    }

    async fn fetch_reward_rules(&self) -> Result<Vec<RewardRule>, AccrualError> {
        let mut conn = self.pool.acquire().await?;
        let rules = rewards::fetch_rewards(&mut conn).await?;
        Ok(rules)
    }

    async fn claim_next_registered_order(&self) -> Result<Option<Order>, AccrualError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::claim_next_registered(&mut tx).await?;
        tx.commit().await?;
        if let Some(order) = &order {
            trace!("🗃️ Order {} claimed for processing", order.number);
        }
        Ok(order)
    }

    /// Moves a `PROCESSING` order into its terminal state. A zero (or missing) accrual marks the order as `INVALID`.
    async fn complete_order(&self, number: &OrderNumber, accrual: Option<Decimal>) -> Result<Order, AccrualError> {
        let (status, accrual) = match accrual {
            Some(a) if !a.is_zero() => (OrderStatus::Processed, Some(a)),
            _ => (OrderStatus::Invalid, None),
        };
        let mut tx = self.pool.begin().await?;
        let order = orders::update_processing_order(number, status, accrual, &mut tx)
            .await?
            .ok_or_else(|| AccrualError::OrderNotFound(number.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {number} is now {status}");
        Ok(order)
    }

    async fn reset_stalled_orders(&self) -> Result<u64, AccrualError> {
        let mut conn = self.pool.acquire().await?;
        let count = orders::reset_processing_orders(&mut conn).await?;
        if count > 0 {
            info!("🗃️ {count} stalled orders were returned to the REGISTERED state");
        }
        Ok(count)
    }

    async fn close(&mut self) -> Result<(), AccrualError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), AccrualError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AccrualError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database schema is up to date");
        Ok(())
    }
}
