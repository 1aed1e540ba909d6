use log::trace;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{Good, Order, OrderNumber, OrderStatus},
    AccrualError,
};

/// Inserts a new `REGISTERED` order row. This is not atomic with respect to the goods. Embed this call, together with
/// [`insert_goods`], inside a transaction and pass `&mut tx` as the connection argument.
///
/// Uniqueness of the order number is enforced by the table constraint, so two concurrent inserts of the same number
/// cannot both succeed.
pub async fn insert_order(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Order, AccrualError> {
    sqlx::query_as("INSERT INTO orders (number) VALUES ($1) RETURNING *")
        .bind(number.as_str())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccrualError::OrderAlreadyExists(number.clone())
            } else {
                AccrualError::from(e)
            }
        })
}

pub async fn insert_goods(
    number: &OrderNumber,
    goods: &[Good],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for good in goods {
        sqlx::query("INSERT INTO goods (order_number, description, price) VALUES ($1, $2, $3)")
            .bind(number.as_str())
            .bind(good.description.as_str())
            .bind(good.price.to_string())
            .execute(&mut *conn)
            .await?;
    }
    trace!("📝️ {} goods inserted for order {number}", goods.len());
    Ok(())
}

pub async fn fetch_order(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the goods of the order in the order they were submitted.
pub async fn fetch_goods(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Vec<Good>, sqlx::Error> {
    let goods = sqlx::query_as("SELECT description, price FROM goods WHERE order_number = $1 ORDER BY id")
        .bind(number.as_str())
        .fetch_all(conn)
        .await?;
    Ok(goods)
}

/// Marks the oldest `REGISTERED` order as `PROCESSING` and returns it.
///
/// Selection and update happen in one statement, so an order can only ever be claimed once.
pub async fn claim_next_registered(conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = (SELECT id FROM orders WHERE status = $2 ORDER BY id LIMIT 1) AND status = $2
            RETURNING *;
        "#,
    )
    .bind(OrderStatus::Processing)
    .bind(OrderStatus::Registered)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves a `PROCESSING` order into `new_status`, storing the accrual. Returns `None` if the order is not
/// `PROCESSING`.
pub async fn update_processing_order(
    number: &OrderNumber,
    new_status: OrderStatus,
    accrual: Option<Decimal>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE number = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(new_status)
    .bind(accrual.map(|a| a.to_string()))
    .bind(number.as_str())
    .bind(OrderStatus::Processing)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn reset_processing_orders(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE status = $2")
        .bind(OrderStatus::Registered)
        .bind(OrderStatus::Processing)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
