use accrual_engine::{
    admission::{AdmissionConfig, AdmissionController},
    events::{EventProducer, OrderCreatedEvent},
    test_utils::{prepare_test_env, random_db_url},
    AccrualApi,
};
use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use tokio::sync::mpsc;

use crate::{
    config::{ProxyConfig, RequestTimeout},
    server::AppState,
};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// A fully wired application backed by a fresh SQLite database. Notifications are captured in `events` instead of
/// being sent to a processor.
pub struct TestContext {
    pub state: AppState,
    pub events: mpsc::Receiver<OrderCreatedEvent>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_admission(AdmissionConfig::default()).await
    }

    pub async fn with_admission(config: AdmissionConfig) -> Self {
        let _ = env_logger::try_init();
        let db = prepare_test_env(&random_db_url()).await;
        let api = AccrualApi::initialize(db).await.expect("Error initializing the accrual API");
        let (sender, events) = mpsc::channel(16);
        let state = AppState {
            api,
            notifier: EventProducer::new(sender),
            admission: web::Data::new(AdmissionController::new(config)),
            timeout: RequestTimeout::default(),
            proxy: ProxyConfig::default(),
        };
        Self { state, events }
    }

    pub async fn send(&self, req: TestRequest) -> TestResponse {
        self.send_all(vec![req]).await.remove(0)
    }

    /// Sends the requests, in order, to a single service instance.
    pub async fn send_all(&self, requests: Vec<TestRequest>) -> Vec<TestResponse> {
        let app = App::new().configure(|cfg| self.state.configure(cfg));
        let service = test::init_service(app).await;
        let mut responses = Vec::with_capacity(requests.len());
        for req in requests {
            debug!("Making request");
            let res = test::try_call_service(&service, req.to_request()).await;
            responses.push(into_test_response(res).await);
        }
        responses
    }
}

async fn into_test_response<B: MessageBody>(res: Result<ServiceResponse<B>, actix_web::Error>) -> TestResponse {
    match res {
        Ok(res) => {
            let status = res.status();
            let headers = res.headers().clone();
            let body = test::read_body(res).await;
            TestResponse { status, headers, body: String::from_utf8_lossy(&body).into_owned() }
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let headers = res.headers().clone();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            TestResponse { status, headers, body: String::from_utf8_lossy(&body).into_owned() }
        },
    }
}

pub fn post_json(path: &str, body: &str) -> TestRequest {
    TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body.to_string())
}
