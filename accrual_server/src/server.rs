use std::time::Duration;

use accrual_engine::{
    admission::AdmissionController,
    events::{AccrualProcessor, EventProducer, OrderCreatedEvent},
    AccrualApi,
    AccrualDatabase,
    SqliteDatabase,
};
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use tokio::sync::oneshot;

use crate::{
    config::{ProxyConfig, RequestTimeout, ServerConfig},
    errors::ServerError,
    routes::{health, json_config, OrderAccrualRoute, RegisterOrderRoute, RegisterRewardRuleRoute},
};

/// Everything the request handlers share. Cloned into every worker; the admission controller and the reward cache
/// are shared by all clones.
#[derive(Clone)]
pub struct AppState {
    pub api: AccrualApi<SqliteDatabase>,
    pub notifier: EventProducer<OrderCreatedEvent>,
    pub admission: web::Data<AdmissionController>,
    pub timeout: RequestTimeout,
    pub proxy: ProxyConfig,
}

impl AppState {
    pub fn configure(&self, cfg: &mut ServiceConfig) {
        cfg.app_data(web::Data::new(self.api.clone()))
            .app_data(web::Data::new(self.notifier.clone()))
            .app_data(self.admission.clone())
            .app_data(web::Data::new(self.timeout))
            .app_data(web::Data::new(self.proxy))
            .app_data(json_config())
            .service(health)
            .service(RegisterOrderRoute::<SqliteDatabase>::new())
            .service(OrderAccrualRoute::<SqliteDatabase>::new())
            .service(RegisterRewardRuleRoute::<SqliteDatabase>::new());
    }
}

/// Starts the accrual engine and the HTTP server, and runs until the server is stopped.
///
/// On the way up, the schema is migrated, the reward cache is warmed and orders that were left `PROCESSING` by an
/// earlier run are returned to the queue. On the way down, the accrual processor is stopped after the HTTP server and
/// given the chance to finish its in-flight cycles.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let api = AccrualApi::initialize(db).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let recovered = api.recover_stalled_orders().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if recovered > 0 {
        info!("🚀️ {recovered} orders from a previous run were returned to the processing queue");
    }

    let mut db = api.db().clone();
    let processor = AccrualProcessor::new(api.clone(), config.notification_buffer, config.sweep_interval);
    let notifier = processor.subscribe();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let worker = tokio::spawn(processor.run(async move {
        let _ = shutdown_rx.await;
    }));

    let state = AppState {
        api,
        notifier,
        admission: web::Data::new(AdmissionController::new(config.admission)),
        timeout: RequestTimeout(config.request_timeout),
        proxy: config.proxy,
    };
    let srv = create_server_instance(&config, state)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));

    info!("🚀️ HTTP server has stopped. Shutting down the accrual processor");
    let _ = shutdown_tx.send(());
    if let Err(e) = worker.await {
        error!("🚀️ The accrual processor did not shut down cleanly. {e}");
    }
    if let Err(e) = db.close().await {
        warn!("🚀️ Could not close the database cleanly. {e}");
    }
    result
}

pub fn create_server_instance(config: &ServerConfig, state: AppState) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("accrual::access_log"))
            .configure(|cfg| state.configure(cfg))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
