use actix_web::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use super::helpers::{post_json, TestContext};

#[actix_web::test]
async fn register_reward_rule() {
    let ctx = TestContext::new().await;
    let rule = json!({"match": "Bork", "reward": 7.25, "reward_type": "pt"}).to_string();
    let res = ctx.send(post_json("/api/goods", &rule)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"success":true,"message":"Reward rule for 'Bork' created"}"#);
    let rules = ctx.state.api.reward_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].reward, Decimal::new(725, 2));
}

#[actix_web::test]
async fn register_duplicate_reward_rule() {
    let ctx = TestContext::new().await;
    let res = ctx
        .send_all(vec![
            post_json("/api/goods", &json!({"match": "Bork", "reward": 10, "reward_type": "%"}).to_string()),
            post_json("/api/goods", &json!({"match": "Bork", "reward": 5, "reward_type": "pt"}).to_string()),
        ])
        .await;
    assert_eq!(res[0].status, StatusCode::OK);
    assert_eq!(res[1].status, StatusCode::CONFLICT);
    assert_eq!(res[1].body, r#"{"error":"A reward rule for 'Bork' already exists"}"#);
    let rules = ctx.state.api.reward_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].reward, Decimal::from(10));
}

#[actix_web::test]
async fn register_invalid_reward_rules() {
    let ctx = TestContext::new().await;
    let bodies = [
        json!({"match": "", "reward": 10, "reward_type": "%"}).to_string(),
        json!({"match": "Bork", "reward": -1, "reward_type": "%"}).to_string(),
        json!({"match": "Bork", "reward": 10, "reward_type": "usd"}).to_string(),
        json!({"match": "Bork", "reward_type": "%"}).to_string(),
        "not json".to_string(),
    ];
    for body in bodies {
        let res = ctx.send(post_json("/api/goods", &body)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{body} should be rejected");
    }
    assert!(ctx.state.api.reward_rules().is_empty());
}
