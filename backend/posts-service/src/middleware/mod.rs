/// HTTP middleware utilities for posts-service
///
/// Provides cookie session authentication, the `Viewer` extractor and
/// request metrics.
pub mod permissions;

pub use permissions::*;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::db::Store;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::security::SessionTokens;

// =====================================================================
// Session authentication
// =====================================================================

/// The logged-in user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
}

/// Actix middleware that resolves the session cookie to a `Viewer`.
///
/// Requests without a valid session pass through anonymously; views that
/// need a user extract `Viewer`, which redirects to the login page.
#[derive(Clone)]
pub struct SessionAuth {
    tokens: Arc<SessionTokens>,
    store: Arc<dyn Store>,
}

impl SessionAuth {
    pub fn new(tokens: Arc<SessionTokens>, store: Arc<dyn Store>) -> Self {
        Self { tokens, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct SessionAuthService<S> {
    service: Rc<S>,
    tokens: Arc<SessionTokens>,
    store: Arc<dyn Store>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        let claims = req
            .cookie(self.tokens.cookie_name())
            .and_then(|cookie| match self.tokens.validate(cookie.value()) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    tracing::debug!("ignoring session cookie: {}", e);
                    None
                }
            });

        Box::pin(async move {
            if let Some(user_id) = claims.as_ref().and_then(|c| c.user_id()) {
                match store.get_user(user_id).await {
                    Ok(Some(user)) => {
                        req.extensions_mut().insert(Viewer {
                            id: user.id,
                            username: user.username,
                        });
                    }
                    Ok(None) => tracing::debug!(user_id, "session names a deleted user"),
                    Err(e) => tracing::warn!("Session user lookup failed: {}", e),
                }
            }

            service.call(req).await
        })
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(req.extensions().get::<Viewer>().cloned().ok_or_else(|| {
            let next = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());
            AppError::LoginRequired(next)
        }))
    }
}

// =====================================================================
// Metrics middleware
// =====================================================================

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed = start.elapsed();

            if let Ok(response) = &res {
                let route = response
                    .request()
                    .match_pattern()
                    .unwrap_or_else(|| "unmatched".to_string());
                let status = response.status().as_u16().to_string();
                HTTP_REQUEST_DURATION_SECONDS
                    .with_label_values(&[method.as_str(), route.as_str(), status.as_str()])
                    .observe(elapsed.as_secs_f64());
            }

            tracing::debug!(%method, %path, elapsed_ms = elapsed.as_millis() as u64, "request completed");
            res
        })
    }
}
