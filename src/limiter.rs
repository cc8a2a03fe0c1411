//! Admission gate.
//!
//! Evaluation order for one request:
//! 1. Skip predicate: if it matches, admit. Nothing else is evaluated.
//! 2. Whitelist: if it matches, admit.
//! 3. Blacklist: if it matches, deny.
//! 4. Otherwise ask the [`Counter`].
//!
//! On denial the rejection callback (if any) runs once with the request. Every decision is
//! reported to the telemetry sink as a [`ThrottleEvent`].
//!
//! Everything that reads the request (predicates, key and quota, the callback) runs
//! synchronously; only the counter's cache round-trip and the sink are awaited. The
//! request is therefore never borrowed across an await, and [`Limiter::check`] stays
//! `Send` for request types that are `Send` but not `Sync`.
//!
//! Example
//! ```rust
//! use throttlegate::{ClientRequest, Decision, InMemoryCache, Limiter, ThrottleOptions};
//!
//! struct Req(&'static str);
//! impl ClientRequest for Req {
//!     fn client_addr(&self) -> String { self.0.to_string() }
//!     fn path(&self) -> &str { "/" }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let options = ThrottleOptions::<Req>::builder().max(2).build().unwrap();
//! let limiter = Limiter::monthly(options, InMemoryCache::new());
//!
//! assert_eq!(limiter.evaluate(&Req("1.2.3.4")).await, Decision::Allow);
//! assert_eq!(limiter.evaluate(&Req("1.2.3.4")).await, Decision::Allow);
//! assert_eq!(limiter.evaluate(&Req("1.2.3.4")).await, Decision::Deny);
//! assert_eq!(limiter.evaluate(&Req("5.6.7.8")).await, Decision::Allow);
//! # });
//! ```

use crate::cache::CounterCache;
use crate::clock::Clock;
use crate::counter::{Counter, TimeWindow, Unlimited};
use crate::options::ThrottleOptions;
use crate::request::ClientRequest;
use crate::telemetry::{emit_best_effort, AdmissionOutcome, NullSink, TelemetrySink, ThrottleEvent};
use crate::window::{Daily, Hourly, Minute, Monthly, Window, WindowZone};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Outcome of one admission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Forward the request to the inner service.
    Allow,
    /// Reject the request without calling the inner service.
    Deny,
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<AdmissionOutcome> for Decision {
    fn from(outcome: AdmissionOutcome) -> Self {
        if outcome.is_allowed() {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Work left after the synchronous checks.
enum Stage<T> {
    Decided(AdmissionOutcome),
    Count(T),
}

/// Admission gate combining the bypass predicates with a [`Counter`].
pub struct Limiter<R, K, T = NullSink> {
    options: Arc<ThrottleOptions<R>>,
    counter: K,
    sink: T,
}

impl<R, K: fmt::Debug, T> fmt::Debug for Limiter<R, K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter")
            .field("options", &self.options)
            .field("counter", &self.counter)
            .field("sink", &"<sink>")
            .finish()
    }
}

impl<R, K> Limiter<R, K, NullSink> {
    /// Assemble a gate from options and any counter. The counter is expected to derive its
    /// keys from the same options.
    pub fn from_parts(options: impl Into<Arc<ThrottleOptions<R>>>, counter: K) -> Self {
        Self { options: options.into(), counter, sink: NullSink }
    }
}

impl<R> Limiter<R, Unlimited, NullSink> {
    /// Gate with no counting: only skip, whitelist and blacklist can affect the decision.
    pub fn unlimited(options: impl Into<Arc<ThrottleOptions<R>>>) -> Self {
        Self::from_parts(options, Unlimited)
    }
}

impl<R, W, C> Limiter<R, TimeWindow<R, W, C>, NullSink>
where
    W: Window,
    C: CounterCache,
{
    /// Gate counting over `window` in `cache`, sharing `options` with its counter.
    pub fn new(options: ThrottleOptions<R>, window: W, cache: C) -> Self {
        let options = Arc::new(options);
        let counter = TimeWindow::new(options.clone(), window, cache);
        Self { options, counter, sink: NullSink }
    }
}

impl<R, C: CounterCache> Limiter<R, TimeWindow<R, Minute, C>, NullSink> {
    /// Per-minute quota (default 60).
    pub fn minute(options: ThrottleOptions<R>, cache: C) -> Self {
        Self::new(options, Minute, cache)
    }
}

impl<R, C: CounterCache> Limiter<R, TimeWindow<R, Hourly, C>, NullSink> {
    /// Per-hour quota (default 3600).
    pub fn hourly(options: ThrottleOptions<R>, cache: C) -> Self {
        Self::new(options, Hourly, cache)
    }
}

impl<R, C: CounterCache> Limiter<R, TimeWindow<R, Daily, C>, NullSink> {
    /// Per-day quota (default 86400).
    pub fn daily(options: ThrottleOptions<R>, cache: C) -> Self {
        Self::new(options, Daily, cache)
    }
}

impl<R, C: CounterCache> Limiter<R, TimeWindow<R, Monthly, C>, NullSink> {
    /// Per-month quota (default 100000).
    pub fn monthly(options: ThrottleOptions<R>, cache: C) -> Self {
        Self::new(options, Monthly, cache)
    }
}

impl<R, W, C, T> Limiter<R, TimeWindow<R, W, C>, T>
where
    W: Window,
    C: CounterCache,
{
    /// Override the clock used to label windows.
    pub fn with_clock<K: Clock + 'static>(self, clock: K) -> Self {
        Self { options: self.options, counter: self.counter.with_clock(clock), sink: self.sink }
    }

    /// Label windows in `zone` instead of local time.
    pub fn with_zone(self, zone: WindowZone) -> Self {
        Self { options: self.options, counter: self.counter.with_zone(zone), sink: self.sink }
    }
}

impl<R, K, T> Limiter<R, K, T> {
    /// Report decisions to `sink` instead of the current one.
    pub fn with_sink<S>(self, sink: S) -> Limiter<R, K, S> {
        Limiter { options: self.options, counter: self.counter, sink }
    }

    pub fn options(&self) -> &Arc<ThrottleOptions<R>> {
        &self.options
    }

    pub fn counter(&self) -> &K {
        &self.counter
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }
}

impl<R, K, T> Limiter<R, K, T>
where
    R: ClientRequest,
    K: Counter<R>,
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    /// Decide whether `request` may proceed.
    ///
    /// Never fails: cache errors are absorbed by the counter.
    pub async fn evaluate(&self, request: &R) -> Decision {
        self.run(request).await.0
    }

    /// Decide for an owned request and hand it back for forwarding.
    ///
    /// The returned future is `Send` whenever `R: Send`, which is what middleware needs
    /// for request bodies that are not `Sync`.
    pub async fn check(&self, request: R) -> (Decision, R) {
        self.run(request).await
    }

    async fn run<Q: Borrow<R>>(&self, request: Q) -> (Decision, Q) {
        let client = request.borrow().client_addr();
        let path = request.borrow().path().to_string();
        let stage = self.stage(request.borrow());

        let outcome = match stage {
            Stage::Decided(outcome) => outcome,
            Stage::Count(ticket) => {
                if self.counter.count(ticket).await {
                    AdmissionOutcome::Admitted
                } else {
                    AdmissionOutcome::Rejected
                }
            }
        };

        if !outcome.is_allowed() {
            tracing::info!(client = %client, path = %path, outcome = %outcome, "request throttled");
            self.options.notify_rate_limited(request.borrow());
        }

        emit_best_effort(self.sink.clone(), ThrottleEvent::new(client, path, outcome)).await;

        (outcome.into(), request)
    }

    fn stage(&self, request: &R) -> Stage<K::Ticket> {
        if self.options.should_skip(request) {
            return Stage::Decided(AdmissionOutcome::Skipped);
        }
        if self.whitelisted(request) {
            return Stage::Decided(AdmissionOutcome::Whitelisted);
        }
        if self.blacklisted(request) {
            return Stage::Decided(AdmissionOutcome::Blacklisted);
        }
        Stage::Count(self.counter.prepare(request))
    }

    /// Whether `request` bypasses counting as whitelisted.
    pub fn whitelisted(&self, request: &R) -> bool {
        self.options.whitelisted(request)
    }

    /// Whether `request` is denied outright as blacklisted.
    pub fn blacklisted(&self, request: &R) -> bool {
        self.options.blacklisted(request)
    }

    /// Rate-limit subject for `request`.
    pub fn client_identifier(&self, request: &R) -> String {
        self.options.client_identifier(request)
    }

    /// Base counting key for `request`, before any window label.
    pub fn cache_key(&self, request: &R) -> String {
        self.options.cache_key(request)
    }
}
