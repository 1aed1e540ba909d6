use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::{helpers::is_valid_order_number, AccrualError};

const ONE_HUNDRED_PERCENT: Decimal = Decimal::ONE_HUNDRED;

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The identity of an order. A numeric string that passes the Luhn checksum.
///
/// Deserialization does not validate the number. Use [`OrderNumber::from_str`] (or `parse`) when the value comes from
/// an untrusted source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for OrderNumber {
    type Err = AccrualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_order_number(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(AccrualError::InvalidOrderNumber(s.to_string()))
        }
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     OrderStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// The order has been accepted and is waiting for the processor.
    Registered,
    /// The processor has claimed the order and is computing the accrual.
    Processing,
    /// No reward rule matched any of the goods. Terminal.
    Invalid,
    /// The accrual has been computed. Terminal.
    Processed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    /// Only processed orders expose their accrual to readers.
    pub fn exposes_accrual(&self) -> bool {
        matches!(self, OrderStatus::Processed)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Registered => write!(f, "REGISTERED"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Invalid => write!(f, "INVALID"),
            OrderStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

//--------------------------------------        Good           ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Good {
    pub description: String,
    pub price: Decimal,
}

impl Good {
    pub fn new<S: Into<String>>(description: S, price: Decimal) -> Self {
        Self { description: description.into(), price }
    }
}

//--------------------------------------      NewOrder         ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number: OrderNumber,
    pub goods: Vec<Good>,
}

impl NewOrder {
    pub fn new(number: OrderNumber, goods: Vec<Good>) -> Self {
        Self { number, goods }
    }

    /// Checks the invariants that cannot be expressed in the type itself.
    pub fn validate(&self) -> Result<(), AccrualError> {
        match self.goods.iter().find(|g| g.price < Decimal::ZERO) {
            Some(g) => Err(AccrualError::InvalidOrder(format!(
                "Good '{}' has a negative price ({})",
                g.description, g.price
            ))),
            None => Ok(()),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// An order record, as stored in the database. The goods are stored separately.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub number: OrderNumber,
    pub status: OrderStatus,
    /// The stored accrual. Use [`Order::accrual_view`] to get the value as clients should see it.
    pub accrual: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Read-time projection of the order: the accrual is only reported once the order is `PROCESSED`.
    pub fn accrual_view(&self) -> OrderAccrual {
        let accrual = if self.status.exposes_accrual() { self.accrual } else { None };
        OrderAccrual { order: self.number.clone(), status: self.status, accrual }
    }
}

/// The status of an order as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAccrual {
    pub order: OrderNumber,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

//--------------------------------------     RewardKind        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum RewardKind {
    /// The reward is a percentage of the price of every matching good.
    #[serde(rename = "%")]
    #[sqlx(rename = "%")]
    Percentage,
    /// The reward is a flat number of points for every matching good.
    #[serde(rename = "pt")]
    #[sqlx(rename = "pt")]
    Points,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardKind::Percentage => "%",
            RewardKind::Points => "pt",
        }
    }
}

impl Display for RewardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = AccrualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "%" => Ok(Self::Percentage),
            "pt" => Ok(Self::Points),
            s => Err(AccrualError::InvalidRewardRule(format!("Unknown reward type: '{s}'"))),
        }
    }
}

//--------------------------------------    NewRewardRule      ---------------------------------------------------------
/// A reward rule as submitted by a client. It becomes a [`RewardRule`] once it has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRewardRule {
    #[serde(rename = "match")]
    pub match_key: String,
    pub reward: Decimal,
    pub reward_type: String,
}

impl NewRewardRule {
    pub fn new<S: Into<String>>(match_key: S, reward: Decimal, reward_type: &str) -> Self {
        Self { match_key: match_key.into(), reward, reward_type: reward_type.to_string() }
    }
}

//--------------------------------------      RewardRule       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardRule {
    #[serde(rename = "match")]
    pub match_key: String,
    pub reward: Decimal,
    pub reward_type: RewardKind,
}

impl RewardRule {
    pub fn new<S: Into<String>>(match_key: S, reward: Decimal, reward_type: RewardKind) -> Self {
        Self { match_key: match_key.into(), reward, reward_type }
    }

    pub fn matches(&self, good: &Good) -> bool {
        good.description.contains(self.match_key.as_str())
    }

    /// The amount this rule contributes for a single matching good with the given price.
    pub fn contribution(&self, price: Decimal) -> Decimal {
        match self.reward_type {
            RewardKind::Points => self.reward,
            RewardKind::Percentage => price.saturating_mul(self.reward) / ONE_HUNDRED_PERCENT,
        }
    }
}

impl TryFrom<NewRewardRule> for RewardRule {
    type Error = AccrualError;

    fn try_from(rule: NewRewardRule) -> Result<Self, Self::Error> {
        if rule.match_key.is_empty() {
            return Err(AccrualError::InvalidRewardRule("The match string cannot be empty".into()));
        }
        if rule.reward < Decimal::ZERO {
            return Err(AccrualError::InvalidRewardRule(format!("The reward cannot be negative ({})", rule.reward)));
        }
        let reward_type = rule.reward_type.parse()?;
        Ok(Self { match_key: rule.match_key, reward: rule.reward, reward_type })
    }
}
