//! Per-client rate limiting middleware.
//!
//! This middleware can be placed on any route or service. It looks up the shared
//! [`AdmissionController`] in the app data, identifies the client (see [`client_identity`]) and rejects the request
//! with `429 Too Many Requests` and a `Retry-After` header when the client's bucket is empty.
//!
//! If no admission controller has been registered, requests pass through unthrottled.
use std::{pin::Pin, rc::Rc};

use accrual_engine::admission::AdmissionController;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{config::ProxyConfig, errors::ServerError, helpers::client_identity};

#[derive(Debug, Default)]
pub struct RateLimitMiddlewareFactory;

impl RateLimitMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitMiddlewareService { service: Rc::new(service) })
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let Some(controller) = req.app_data::<web::Data<AdmissionController>>().cloned() else {
                warn!("🚦️ No admission controller has been configured. The request is not rate limited");
                return service.call(req).await;
            };
            let proxy = req.app_data::<web::Data<ProxyConfig>>().map(|c| *c.get_ref()).unwrap_or_default();
            let identity = client_identity(req.request(), &proxy);
            match controller.allow(&identity) {
                Ok(()) => service.call(req).await,
                Err(limited) => {
                    info!("🚦️ Rejected request to {} from {identity}. {limited}", req.path());
                    Err(ServerError::RateLimited(limited.retry_after.as_secs()).into())
                },
            }
        })
    }
}
