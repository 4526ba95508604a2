//! Admission middleware - gates requests on the identifier's quota.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
    web,
};
use futures::future::LocalBoxFuture;
use std::future::{Ready, ready};

use quotagate_core::AdmissionGate;
use quotagate_core::Decision;
use quotagate_core::ports::Clock;

use super::error::AppError;

/// Query parameter carrying the identifier unless configured otherwise.
pub const DEFAULT_IDENTIFIER_PARAM: &str = "user";

struct Inner {
    gate: AdmissionGate,
    clock: Arc<dyn Clock>,
    identifier_param: String,
}

impl Inner {
    /// A missing or malformed query yields the empty identifier.
    fn identifier(&self, req: &ServiceRequest) -> String {
        web::Query::<HashMap<String, String>>::from_query(req.query_string())
            .ok()
            .and_then(|query| query.into_inner().remove(&self.identifier_param))
            .unwrap_or_default()
    }
}

/// Admission middleware factory.
#[derive(Clone)]
pub struct AdmissionMiddleware {
    inner: Arc<Inner>,
}

impl AdmissionMiddleware {
    /// `identifier_param` names the query parameter carrying the identifier.
    pub fn new(
        gate: AdmissionGate,
        clock: Arc<dyn Clock>,
        identifier_param: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate,
                clock,
                identifier_param: identifier_param.into(),
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdmissionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionMiddlewareService {
            service: Rc::new(service),
            inner: self.inner.clone(),
        }))
    }
}

pub struct AdmissionMiddlewareService<S> {
    service: Rc<S>,
    inner: Arc<Inner>,
}

impl<S, B> Service<ServiceRequest> for AdmissionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let identifier = inner.identifier(&req);
            let decision = inner.gate.decide(&identifier, inner.clock.now()).await;

            match decision {
                Decision::Allow { limit, remaining } => {
                    let mut res = service.call(req).await?;
                    let headers = res.headers_mut();
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-limit"),
                        HeaderValue::from(limit),
                    );
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                }
                Decision::Deny(reason) => {
                    let response = AppError::from(reason).error_response();
                    let (http_req, _payload) = req.into_parts();
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::time::Duration;

    use quotagate_core::ports::{Admission, ManualClock, QuotaStore};
    use quotagate_core::{Policy, PolicyRegistry, QuotaStoreError};
    use quotagate_infra::InMemoryWindowCounter;
    use quotagate_shared::{ErrorCode, ErrorResponse};

    struct FailingStore;

    #[async_trait]
    impl QuotaStore for FailingStore {
        async fn try_admit(
            &self,
            _identifier: &str,
            _now: DateTime<Utc>,
            _policy: &Policy,
        ) -> Result<Admission, QuotaStoreError> {
            Err(QuotaStoreError::Increment("READONLY replica".to_string()))
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    fn gate(store: Arc<dyn QuotaStore>) -> AdmissionGate {
        let policies =
            PolicyRegistry::from_entries([("user_a", 5, Duration::from_secs(10))]).unwrap();
        AdmissionGate::new(Arc::new(policies), store)
    }

    fn middleware(store: Arc<dyn QuotaStore>, clock: Arc<ManualClock>) -> AdmissionMiddleware {
        AdmissionMiddleware::new(gate(store), clock, DEFAULT_IDENTIFIER_PARAM)
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_fixed_window_scenario() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mw = middleware(Arc::new(InMemoryWindowCounter::new()), clock.clone());
        let app = test::init_service(
            App::new().service(web::resource("/api").wrap(mw).route(web::get().to(ok))),
        )
        .await;

        for i in 0..5u32 {
            let req = test::TestRequest::get().uri("/api?user=user_a").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            let remaining = res.headers().get("x-ratelimit-remaining").unwrap();
            assert_eq!(remaining, (4 - i).to_string().as_str());
        }

        let req = test::TestRequest::get().uri("/api?user=user_a").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: ErrorResponse = test::read_body_json(res).await;
        assert_eq!(body.error, ErrorCode::RateLimitExceeded);

        clock.advance(TimeDelta::seconds(11));
        let req = test::TestRequest::get().uri("/api?user=user_a").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_missing_identifier_is_bad_request() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mw = middleware(Arc::new(FailingStore), clock);
        let app = test::init_service(
            App::new().service(web::resource("/api").wrap(mw).route(web::get().to(ok))),
        )
        .await;

        for uri in ["/api", "/api?user=", "/api?other=user_a"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
            let body: ErrorResponse = test::read_body_json(res).await;
            assert_eq!(body.error, ErrorCode::UserIdRequired);
        }
    }

    #[actix_web::test]
    async fn test_unconfigured_identifier_is_forbidden() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mw = middleware(Arc::new(InMemoryWindowCounter::new()), clock);
        let app = test::init_service(
            App::new().service(web::resource("/api").wrap(mw).route(web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get().uri("/api?user=user_b").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: ErrorResponse = test::read_body_json(res).await;
        assert_eq!(body.error, ErrorCode::NotConfigRateLimitForThisUser);
    }

    #[actix_web::test]
    async fn test_store_failure_fails_closed() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mw = middleware(Arc::new(FailingStore), clock);
        let app = test::init_service(
            App::new().service(web::resource("/api").wrap(mw).route(web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get().uri("/api?user=user_a").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = test::read_body_json(res).await;
        assert_eq!(body.error, ErrorCode::IncreaseRateLimitFailed);
        assert!(body.detail.is_none());
    }

    #[actix_web::test]
    async fn test_custom_identifier_param() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mw = AdmissionMiddleware::new(
            gate(Arc::new(InMemoryWindowCounter::new())),
            clock,
            "client",
        );
        let app = test::init_service(
            App::new().service(web::resource("/api").wrap(mw).route(web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get().uri("/api?client=user_a").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
