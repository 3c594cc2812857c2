//! Rate limiting middleware, keyed by client IP.

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use folio_core::ports::{RateLimitResult, RateLimiter};

use crate::middleware::error::AppError;

/// Rate limiting middleware factory. Without a limiter every request passes.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Option<Arc<dyn RateLimiter>>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let Some(limiter) = self.limiter.clone() else {
            return Box::pin(async move { Ok::<_, Error>(service.call(req).await?.map_into_left_body()) });
        };

        let key = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            let result = match limiter.check(&key).await {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::error!(error = %e, "Rate limiter error, failing open");
                    None
                }
            };

            match result {
                Some(result) if !result.allowed => {
                    tracing::warn!(client = %key, "Rate limit exceeded");
                    let mut response =
                        AppError::TooManyRequests(result.retry_after_secs()).error_response();
                    insert_limit_headers(response.headers_mut(), &result);

                    let (http_req, _payload) = req.into_parts();
                    Ok::<_, Error>(ServiceResponse::new(http_req, response).map_into_right_body())
                }
                result => {
                    let mut res = service.call(req).await?;
                    if let Some(result) = result {
                        insert_limit_headers(res.headers_mut(), &result);
                    }
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

fn insert_limit_headers(headers: &mut actix_web::http::header::HeaderMap, result: &RateLimitResult) {
    let values = [
        ("x-ratelimit-limit", result.limit as u64),
        ("x-ratelimit-remaining", result.remaining as u64),
        ("x-ratelimit-reset", result.retry_after_secs()),
    ];
    for (name, value) in values {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
}
