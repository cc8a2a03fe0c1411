//! HTTP rendering of denied requests.
//!
//! [`HttpThrottleLayer`] answers denied requests itself with a plain-text response built
//! from a [`Rejection`] (403 `Rate Limit Exceeded` unless configured otherwise). Allowed
//! requests reach the inner service and its response is returned unchanged.

use crate::counter::Counter;
use crate::limiter::{Decision, Limiter};
use crate::telemetry::TelemetrySink;
use futures::future::BoxFuture;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Default rejection body.
pub const DEFAULT_MESSAGE: &str = "Rate Limit Exceeded";

/// Status and message used to render a denied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    status: StatusCode,
    message: String,
}

impl Default for Rejection {
    fn default() -> Self {
        Self::forbidden()
    }
}

impl Rejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// `403 Forbidden`, the historical default for throttled requests.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, DEFAULT_MESSAGE)
    }

    /// `429 Too Many Requests`.
    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, DEFAULT_MESSAGE)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Build the plain-text rejection response.
    pub fn render<B: From<String>>(&self) -> Response<B> {
        let mut response = Response::new(B::from(self.message.clone()));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}

/// A layer that throttles an HTTP service and renders rejections itself.
pub struct HttpThrottleLayer<L> {
    limiter: Arc<L>,
    rejection: Rejection,
}

impl<L> HttpThrottleLayer<L> {
    /// Throttle with the default `403 Rate Limit Exceeded` rejection.
    pub fn new(limiter: L) -> Self {
        Self::from_shared(Arc::new(limiter))
    }

    /// Share an existing limiter (and therefore its counters) between layers.
    pub fn from_shared(limiter: Arc<L>) -> Self {
        Self { limiter, rejection: Rejection::default() }
    }

    /// Render denials with `rejection` instead of the default.
    pub fn with_rejection(mut self, rejection: Rejection) -> Self {
        self.rejection = rejection;
        self
    }
}

impl<L> Clone for HttpThrottleLayer<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), rejection: self.rejection.clone() }
    }
}

impl<L: fmt::Debug> fmt::Debug for HttpThrottleLayer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpThrottleLayer")
            .field("limiter", &self.limiter)
            .field("rejection", &self.rejection)
            .finish()
    }
}

impl<S, L> Layer<S> for HttpThrottleLayer<L> {
    type Service = HttpThrottleService<S, L>;

    fn layer(&self, service: S) -> Self::Service {
        HttpThrottleService {
            inner: service,
            limiter: self.limiter.clone(),
            rejection: Arc::new(self.rejection.clone()),
        }
    }
}

/// HTTP middleware service produced by [`HttpThrottleLayer`].
pub struct HttpThrottleService<S, L> {
    inner: S,
    limiter: Arc<L>,
    rejection: Arc<Rejection>,
}

impl<S: Clone, L> Clone for HttpThrottleService<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            rejection: self.rejection.clone(),
        }
    }
}

impl<S: fmt::Debug, L: fmt::Debug> fmt::Debug for HttpThrottleService<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpThrottleService")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .field("rejection", &self.rejection)
            .finish()
    }
}

impl<S, ReqBody, ResBody, K, T> Service<Request<ReqBody>>
    for HttpThrottleService<S, Limiter<Request<ReqBody>, K, T>>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: From<String> + Send + 'static,
    K: Counter<Request<ReqBody>> + 'static,
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let limiter = self.limiter.clone();
        let rejection = self.rejection.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (decision, req) = limiter.check(req).await;
            match decision {
                Decision::Allow => inner.call(req).await,
                Decision::Deny => Ok(rejection.render()),
            }
        })
    }
}
