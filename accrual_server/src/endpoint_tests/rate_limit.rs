use std::{net::SocketAddr, time::Duration};

use accrual_engine::admission::AdmissionConfig;
use actix_web::{
    http::{header::RETRY_AFTER, StatusCode},
    test::TestRequest,
};

use super::helpers::{post_json, TestContext};

fn get_order_from(peer: &str) -> TestRequest {
    let peer: SocketAddr = peer.parse().unwrap();
    TestRequest::get().uri("/api/orders/79927398713").peer_addr(peer)
}

async fn limited_context() -> TestContext {
    // No refill, so the outcome does not depend on how quickly the requests are made
    let config = AdmissionConfig { rate: 0.0, burst: 3, retry_after: Duration::from_secs(60) };
    TestContext::with_admission(config).await
}

#[actix_web::test]
async fn burst_is_rate_limited() {
    let ctx = limited_context().await;
    let requests = (0..5).map(|_| get_order_from("10.0.0.1:5000")).collect();
    let res = ctx.send_all(requests).await;
    for r in &res[..3] {
        assert_eq!(r.status, StatusCode::NOT_FOUND);
    }
    for r in &res[3..] {
        assert_eq!(r.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(r.headers.get(RETRY_AFTER).unwrap(), "60");
    }
}

#[actix_web::test]
async fn other_clients_are_unaffected() {
    let ctx = limited_context().await;
    let mut requests = (0..4).map(|_| get_order_from("10.0.0.1:5000")).collect::<Vec<_>>();
    requests.push(get_order_from("10.0.0.2:5000"));
    let res = ctx.send_all(requests).await;
    assert_eq!(res[3].status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res[4].status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn only_order_lookups_are_rate_limited() {
    let ctx = limited_context().await;
    let mut requests = (0..3).map(|_| get_order_from("10.0.0.1:5000")).collect::<Vec<_>>();
    let order = r#"{"order": "79927398713", "goods": []}"#;
    requests.push(post_json("/api/orders", order).peer_addr("10.0.0.1:5000".parse().unwrap()));
    requests.push(TestRequest::get().uri("/health").peer_addr("10.0.0.1:5000".parse().unwrap()));
    requests.push(get_order_from("10.0.0.1:5000"));
    let res = ctx.send_all(requests).await;
    assert_eq!(res[3].status, StatusCode::ACCEPTED);
    assert_eq!(res[4].status, StatusCode::OK);
    assert_eq!(res[5].status, StatusCode::TOO_MANY_REQUESTS);
}
