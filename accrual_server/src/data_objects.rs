use std::fmt::Display;

use accrual_engine::db_types::Good;
use serde::{Deserialize, Serialize};

/// The body of `POST /api/orders`. The order number is validated by the handler, not during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub order: String,
    #[serde(default)]
    pub goods: Vec<Good>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}
