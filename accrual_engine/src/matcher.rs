//! The reward matcher.
//!
//! Every reward rule whose match string occurs in a good's description contributes to the accrual: flat-point rules
//! add their reward once per matching good, percentage rules add `price * reward / 100`. A good may match several
//! rules; all of their contributions are summed. Accumulation is exact, and no rounding is applied, so any matching
//! good with a non-zero price yields a non-zero accrual.
use rust_decimal::Decimal;

use crate::db_types::{Good, RewardRule};

pub fn compute_accrual(goods: &[Good], rules: &[RewardRule]) -> Decimal {
    let total = goods
        .iter()
        .flat_map(|good| {
            rules.iter().filter(move |rule| rule.matches(good)).map(move |rule| rule.contribution(good.price))
        })
        .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c));
    total.normalize()
}
