use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{db_types::RewardRule, AccrualError};

/// Inserts a validated reward rule. The `match_key` column is unique, so a duplicate match string fails with
/// [`AccrualError::RewardAlreadyExists`].
pub async fn insert_reward(rule: RewardRule, conn: &mut SqliteConnection) -> Result<RewardRule, AccrualError> {
    sqlx::query_as(
        r#"
            INSERT INTO rewards (match_key, reward, reward_type) VALUES ($1, $2, $3)
            RETURNING match_key, reward, reward_type;
        "#,
    )
    .bind(rule.match_key.as_str())
    .bind(rule.reward.to_string())
    .bind(rule.reward_type)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccrualError::RewardAlreadyExists(rule.match_key.clone())
        } else {
            AccrualError::from(e)
        }
    })
}

pub async fn fetch_rewards(conn: &mut SqliteConnection) -> Result<Vec<RewardRule>, sqlx::Error> {
    let rules = sqlx::query_as("SELECT match_key, reward, reward_type FROM rewards ORDER BY id").fetch_all(conn).await?;
    Ok(rules)
}
