use std::fmt::Debug;

use log::*;

use crate::{
    cache::RewardCache,
    db_types::{NewOrder, NewRewardRule, Order, OrderAccrual, OrderNumber, RewardRule},
    matcher::compute_accrual,
    AccrualDatabase,
    AccrualError,
};

/// `AccrualApi` is the entry point for everything the boundary layer and the background processor do with orders and
/// reward rules.
///
/// It wraps a storage backend and the process-wide [`RewardCache`]. Cloning the API is cheap, and all clones share the
/// same cache.
#[derive(Clone)]
pub struct AccrualApi<B> {
    db: B,
    rules: RewardCache,
}

impl<B> Debug for AccrualApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualApi ({} cached reward rules)", self.rules.len())
    }
}

impl<B> AccrualApi<B> {
    pub fn new(db: B, rules: RewardCache) -> Self {
        Self { db, rules }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// The reward rules that are currently visible to the matcher.
    pub fn reward_rules(&self) -> Vec<RewardRule> {
        self.rules.snapshot()
    }
}

impl<B> AccrualApi<B>
where B: AccrualDatabase
{
    /// Creates the API and warms the reward cache with every rule in the database.
    pub async fn initialize(db: B) -> Result<Self, AccrualError> {
        let rules = db.fetch_reward_rules().await?;
        let cache = RewardCache::new();
        cache.load(rules);
        info!("🔄️ Reward cache loaded with {} rules", cache.len());
        Ok(Self::new(db, cache))
    }

    /// Registers a new order and its goods.
    ///
    /// Fails with [`AccrualError::OrderAlreadyExists`] if the order number is taken, in which case the existing order
    /// is not modified.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, AccrualError> {
        order.validate()?;
        let order = self.db.insert_order(order).await?;
        info!("🔄️ Order {} registered", order.number);
        Ok(order)
    }

    pub async fn get_order(&self, number: &OrderNumber) -> Result<OrderAccrual, AccrualError> {
        self.db
            .fetch_order(number)
            .await?
            .map(|order| order.accrual_view())
            .ok_or_else(|| AccrualError::OrderNotFound(number.clone()))
    }

    /// Validates and stores a reward rule. The rule only becomes visible to the matcher once it has been committed.
    pub async fn create_reward_rule(&self, rule: NewRewardRule) -> Result<RewardRule, AccrualError> {
        let rule = RewardRule::try_from(rule)?;
        let rule = self.db.insert_reward_rule(rule).await?;
        if !self.rules.insert(rule.clone()) {
            warn!("🔄️ Reward rule '{}' was committed but a rule with that match string was already cached", rule.match_key);
        }
        info!("🔄️ Reward rule '{}' created: {} {}", rule.match_key, rule.reward, rule.reward_type);
        Ok(rule)
    }

    /// Claims the oldest `REGISTERED` order, computes its accrual and moves it into a terminal state.
    ///
    /// The claim is committed before any matching happens. If anything fails after that, the order stays
    /// `PROCESSING` until [`AccrualApi::recover_stalled_orders`] returns it to the queue.
    ///
    /// Returns [`AccrualError::NoRegisteredOrder`] when there is nothing to do.
    pub async fn process_next_registered_order(&self) -> Result<Order, AccrualError> {
        let order = self.db.claim_next_registered_order().await?.ok_or(AccrualError::NoRegisteredOrder)?;
        trace!("🔄️ Processing order {}", order.number);
        let goods = self.db.fetch_goods_for_order(&order.number).await?;
        let rules = self.rules.snapshot();
        let accrual = compute_accrual(&goods, &rules);
        let order = self.db.complete_order(&order.number, Some(accrual)).await?;
        debug!("🔄️ Order {} processed. Status: {}. Accrual: {accrual}", order.number, order.status);
        Ok(order)
    }

    /// Returns orders that were left `PROCESSING` (e.g. by a crash) to the `REGISTERED` state.
    ///
    /// Only call this when no processor is running, otherwise in-flight orders may be processed twice.
    pub async fn recover_stalled_orders(&self) -> Result<u64, AccrualError> {
        self.db.reset_stalled_orders().await
    }
}
