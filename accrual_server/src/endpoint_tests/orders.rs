use accrual_engine::{
    db_types::{OrderNumber, OrderStatus},
    AccrualDatabase,
};
use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};

use super::helpers::{post_json, TestContext};

const ORDER: &str = "79927398713";

fn bork_order() -> String {
    json!({"order": ORDER, "goods": [{"description": "Bork Washer", "price": 800}]}).to_string()
}

#[actix_web::test]
async fn register_order() {
    let mut ctx = TestContext::new().await;
    let res = ctx.send(post_json("/api/orders", &bork_order())).await;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["success"], json!(true));
    let event = ctx.events.try_recv().expect("A notification should have been published");
    assert_eq!(event.order.number.as_str(), ORDER);
    assert_eq!(event.order.status, OrderStatus::Registered);
}

#[actix_web::test]
async fn register_duplicate_order() {
    let mut ctx = TestContext::new().await;
    let res = ctx
        .send_all(vec![
            post_json("/api/orders", &bork_order()),
            post_json("/api/orders", &json!({"order": ORDER, "goods": []}).to_string()),
        ])
        .await;
    assert_eq!(res[0].status, StatusCode::ACCEPTED);
    assert_eq!(res[1].status, StatusCode::CONFLICT);
    assert_eq!(res[1].body, r#"{"error":"Order 79927398713 already exists"}"#);
    assert!(ctx.events.try_recv().is_ok());
    assert!(ctx.events.try_recv().is_err(), "Only one notification should have been published");
    let number: OrderNumber = ORDER.parse().unwrap();
    let goods = ctx.state.api.db().fetch_goods_for_order(&number).await.unwrap();
    assert_eq!(goods.len(), 1);
    assert_eq!(goods[0].description, "Bork Washer");
}

#[actix_web::test]
async fn register_order_with_bad_number() {
    let ctx = TestContext::new().await;
    let res = ctx.send(post_json("/api/orders", &json!({"order": "79927398710", "goods": []}).to_string())).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, r#"{"error":"Could not read request body: Order number is invalid: '79927398710'"}"#);
}

#[actix_web::test]
async fn register_order_with_bad_body() {
    let ctx = TestContext::new().await;
    let res = ctx.send(post_json("/api/orders", r#"{"order": 79927398713"#)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = ctx.send(post_json("/api/orders", r#"{"goods": []}"#)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = json!({"order": ORDER, "goods": [{"description": "Chair", "price": -1}]}).to_string();
    let res = ctx.send(post_json("/api/orders", &body)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_registered_order() {
    let ctx = TestContext::new().await;
    let res = ctx
        .send_all(vec![post_json("/api/orders", &bork_order()), TestRequest::get().uri("/api/orders/79927398713")])
        .await;
    assert_eq!(res[1].status, StatusCode::OK);
    assert_eq!(res[1].body, r#"{"order":"79927398713","status":"REGISTERED"}"#);
}

#[actix_web::test]
async fn fetch_processed_order() {
    let ctx = TestContext::new().await;
    let rule = json!({"match": "Bork", "reward": 10, "reward_type": "%"}).to_string();
    let res = ctx.send_all(vec![post_json("/api/goods", &rule), post_json("/api/orders", &bork_order())]).await;
    assert_eq!(res[0].status, StatusCode::OK);
    assert_eq!(res[1].status, StatusCode::ACCEPTED);
    ctx.state.api.process_next_registered_order().await.unwrap();
    let res = ctx.send(TestRequest::get().uri("/api/orders/79927398713")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"order":"79927398713","status":"PROCESSED","accrual":80}"#);
}

#[actix_web::test]
async fn fetch_invalid_order_hides_accrual() {
    let ctx = TestContext::new().await;
    let order = json!({"order": ORDER, "goods": [{"description": "Teapot", "price": 12.5}]}).to_string();
    ctx.send(post_json("/api/orders", &order)).await;
    ctx.state.api.process_next_registered_order().await.unwrap();
    let res = ctx.send(TestRequest::get().uri("/api/orders/79927398713")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"order":"79927398713","status":"INVALID"}"#);
}

#[actix_web::test]
async fn fetch_unknown_order() {
    let ctx = TestContext::new().await;
    let res = ctx.send(TestRequest::get().uri("/api/orders/4561261212345467")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn fetch_malformed_order_number() {
    let ctx = TestContext::new().await;
    for uri in ["/api/orders/79927398710", "/api/orders/abc"] {
        let res = ctx.send(TestRequest::get().uri(uri)).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[actix_web::test]
async fn health_check() {
    let ctx = TestContext::new().await;
    let res = ctx.send(TestRequest::get().uri("/health")).await;
    assert_eq!(res.status, StatusCode::OK);
}
