use crate::counter::Counter;
use crate::limiter::{Decision, Limiter};
use crate::request::ClientRequest;
use crate::telemetry::TelemetrySink;
use crate::ThrottleError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that puts a [`Limiter`] in front of a service.
///
/// Denied requests never reach the inner service; they fail with
/// [`ThrottleError::RateLimited`]. For HTTP services that should answer with a rendered
/// response instead, see [`HttpThrottleLayer`](crate::HttpThrottleLayer).
pub struct ThrottleLayer<L> {
    limiter: Arc<L>,
}

impl<L> ThrottleLayer<L> {
    /// Create a new throttle layer.
    pub fn new(limiter: L) -> Self {
        Self { limiter: Arc::new(limiter) }
    }

    /// Share an existing limiter (and therefore its counters) between layers.
    pub fn from_shared(limiter: Arc<L>) -> Self {
        Self { limiter }
    }
}

impl<L> Clone for ThrottleLayer<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone() }
    }
}

impl<L: fmt::Debug> fmt::Debug for ThrottleLayer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleLayer").field("limiter", &self.limiter).finish()
    }
}

impl<S, L> Layer<S> for ThrottleLayer<L> {
    type Service = ThrottleService<S, L>;

    fn layer(&self, service: S) -> Self::Service {
        ThrottleService { inner: service, limiter: self.limiter.clone() }
    }
}

/// Middleware service that enforces admission decisions.
pub struct ThrottleService<S, L> {
    inner: S,
    limiter: Arc<L>,
}

impl<S: Clone, L> Clone for ThrottleService<S, L> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), limiter: self.limiter.clone() }
    }
}

impl<S: fmt::Debug, L: fmt::Debug> fmt::Debug for ThrottleService<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleService")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl<S, L> ThrottleService<S, L> {
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, R, K, T> Service<R> for ThrottleService<S, Limiter<R, K, T>>
where
    S: Service<R> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    R: ClientRequest + Send + 'static,
    K: Counter<R> + 'static,
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = ThrottleError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(ThrottleError::Inner)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let limiter = self.limiter.clone();
        // Keep the clone here and move out the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (decision, req) = limiter.check(req).await;
            match decision {
                Decision::Allow => inner.call(req).await.map_err(ThrottleError::Inner),
                Decision::Deny => Err(ThrottleError::RateLimited),
            }
        })
    }
}
