//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every storage call is therefore awaited, and bounded by the
//! configured [`RequestTimeout`], so a slow database fails the request instead of hanging the caller.
use std::{future::Future, str::FromStr};

use accrual_engine::{
    db_types::{NewOrder, NewRewardRule, OrderNumber},
    events::{EventProducer, OrderCreatedEvent},
    AccrualApi,
    AccrualDatabase,
    AccrualError,
};
use actix_web::{get, web, HttpResponse, Responder};
use log::*;

use crate::{
    config::RequestTimeout,
    data_objects::{JsonResponse, NewOrderRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where throttled)  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::RateLimitMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Runs a storage call, failing with [`ServerError::RequestTimeout`] if it does not complete in time.
pub async fn with_timeout<T, F>(timeout: &RequestTimeout, call: F) -> Result<T, ServerError>
where F: Future<Output = Result<T, AccrualError>> {
    match tokio::time::timeout(timeout.0, call).await {
        Ok(result) => result.map_err(ServerError::from),
        Err(_) => {
            warn!("💻️ A storage call did not complete within {:?}", timeout.0);
            Err(ServerError::RequestTimeout)
        },
    }
}

/// Turns JSON extraction failures into a `400 Bad Request` with the usual error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not deserialize request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(register_order => Post "/api/orders" impl AccrualDatabase);
/// Route handler for registering a new order
///
/// The order number must pass the Luhn check. The order is stored together with its goods, after which a notification
/// is published so that the accrual processor picks it up. Responds with `202 Accepted`, since the accrual is computed
/// asynchronously.
pub async fn register_order<B: AccrualDatabase>(
    api: web::Data<AccrualApi<B>>,
    notifier: web::Data<EventProducer<OrderCreatedEvent>>,
    timeout: web::Data<RequestTimeout>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ServerError> {
    let NewOrderRequest { order, goods } = body.into_inner();
    trace!("💻️ Received new order {order} with {} goods", goods.len());
    let number = OrderNumber::from_str(&order).map_err(|e| {
        debug!("💻️ Rejected order. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let order = with_timeout(&timeout, api.create_order(NewOrder::new(number, goods))).await?;
    let message = format!("Order {} has been accepted for processing", order.number);
    notifier.publish_event(OrderCreatedEvent::new(order)).await;
    Ok(HttpResponse::Accepted().json(JsonResponse::success(message)))
}

route!(order_accrual => Get "/api/orders/{number}" impl AccrualDatabase where throttled);
/// Route handler for fetching the status of an order
///
/// The accrual is only included once the order has been processed. This route is rate limited per client.
pub async fn order_accrual<B: AccrualDatabase>(
    path: web::Path<String>,
    api: web::Data<AccrualApi<B>>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, ServerError> {
    let number = path.into_inner();
    trace!("💻️ GET order {number}");
    let number = OrderNumber::from_str(&number).map_err(|e| {
        debug!("💻️ {e}");
        ServerError::InvalidOrderNumber(number)
    })?;
    let order = with_timeout(&timeout, api.get_order(&number)).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Rewards  ----------------------------------------------------
route!(register_reward_rule => Post "/api/goods" impl AccrualDatabase);
/// Route handler for registering a reward rule
///
/// The rule applies to every good whose description contains the `match` string, including goods of orders that are
/// already registered but not yet processed.
pub async fn register_reward_rule<B: AccrualDatabase>(
    api: web::Data<AccrualApi<B>>,
    timeout: web::Data<RequestTimeout>,
    body: web::Json<NewRewardRule>,
) -> Result<HttpResponse, ServerError> {
    let rule = body.into_inner();
    trace!("💻️ Received new reward rule for '{}'", rule.match_key);
    let rule = with_timeout(&timeout, api.create_reward_rule(rule)).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Reward rule for '{}' created", rule.match_key))))
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use actix_web::{http::StatusCode, ResponseError};

    use super::*;

    #[tokio::test]
    async fn slow_storage_calls_time_out() {
        let timeout = RequestTimeout(Duration::from_millis(10));
        let err = with_timeout(&timeout, std::future::pending::<Result<(), AccrualError>>()).await.unwrap_err();
        assert!(matches!(err, ServerError::RequestTimeout));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let ok = with_timeout(&timeout, async { Ok::<_, AccrualError>(42) }).await.unwrap();
        assert_eq!(ok, 42);
    }
}
