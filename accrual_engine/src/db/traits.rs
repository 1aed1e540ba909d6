use rust_decimal::Decimal;

use crate::{
    db_types::{Good, NewOrder, Order, OrderNumber, RewardRule},
    AccrualError,
};

/// The behaviour a backend needs to expose in order to be used by [`crate::AccrualApi`].
#[allow(async_fn_in_trait)]
pub trait AccrualDatabase: Clone {
    /// Stores the order and all of its goods in a single atomic transaction. The new order is `REGISTERED`.
    ///
    /// Fails with [`AccrualError::OrderAlreadyExists`] if the order number is taken. In that case nothing is written.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, AccrualError>;

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, AccrualError>;

    async fn fetch_goods_for_order(&self, number: &OrderNumber) -> Result<Vec<Good>, AccrualError>;

    /// Stores a validated reward rule. Fails with [`AccrualError::RewardAlreadyExists`] if the match string is taken.
    async fn insert_reward_rule(&self, rule: RewardRule) -> Result<RewardRule, AccrualError>;

    async fn fetch_reward_rules(&self) -> Result<Vec<RewardRule>, AccrualError>;

    /// Atomically selects one `REGISTERED` order, marks it as `PROCESSING` and commits the change.
    ///
    /// Concurrent callers never receive the same order. Returns `None` if no order is waiting.
    async fn claim_next_registered_order(&self) -> Result<Option<Order>, AccrualError>;

    /// Moves a `PROCESSING` order into its terminal state: `PROCESSED` with the given accrual, or `INVALID` (accrual
    /// unset) when `accrual` is `None`.
    ///
    /// Fails with [`AccrualError::OrderNotFound`] if the order is not currently `PROCESSING`.
    async fn complete_order(&self, number: &OrderNumber, accrual: Option<Decimal>) -> Result<Order, AccrualError>;

    /// Returns every order that is stuck in `PROCESSING` to `REGISTERED`. Returns the number of orders reset.
    ///
    /// Only call this while no processor is running.
    async fn reset_stalled_orders(&self) -> Result<u64, AccrualError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), AccrualError> {
        Ok(())
    }
}
