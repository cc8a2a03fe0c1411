//! Fixed-window request counting.
//!
//! Counting happens in two steps so that the request is never borrowed across an await:
//! - [`Counter::prepare`] runs synchronously against the request. For a [`TimeWindow`] it
//!   derives the key (base key from the options, plus `":<label>"` for calendar windows)
//!   and resolves the quota for this request.
//! - [`Counter::count`] talks to the cache. A missing value or any read error counts as
//!   zero; the count is incremented and admitted if `count <= quota`. The new count is
//!   written back, and if the write fails the request is admitted regardless of the quota
//!   (fail-open): a cache outage must never block traffic.
//!
//! The read-increment-write sequence is not atomic. Concurrent requests for the same key
//! can read the same prior count and under-count the window; exact counting under load is
//! the cache backend's job, not the counter's.

use crate::cache::CounterCache;
use crate::clock::{Clock, SystemClock};
use crate::options::ThrottleOptions;
use crate::request::ClientRequest;
use crate::window::{Daily, Hourly, Minute, Monthly, Unwindowed, Window, WindowZone};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Counting capability the admission gate delegates to.
#[async_trait]
pub trait Counter<R>: Send + Sync {
    /// Everything [`count`](Counter::count) needs, resolved from the request up front.
    type Ticket: Send;

    /// Resolve the per-request inputs. Called once per counted request.
    fn prepare(&self, request: &R) -> Self::Ticket;

    /// Record one request and decide whether it fits in its quota.
    async fn count(&self, ticket: Self::Ticket) -> bool;

    /// Quota used when the options configure none.
    fn default_quota(&self) -> u64;
}

/// Counter that admits everything. Useful for gates that only whitelist/blacklist.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl<R> Counter<R> for Unlimited {
    type Ticket = ();

    fn prepare(&self, _request: &R) {}

    async fn count(&self, _ticket: ()) -> bool {
        true
    }

    fn default_quota(&self) -> u64 {
        u64::MAX
    }
}

/// Key and quota for one counted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTicket {
    /// Counting key, including the window label.
    pub key: String,
    /// Highest count admitted in the window.
    pub quota: u64,
}

/// Fixed-bucket counter over a [`Window`], backed by a [`CounterCache`].
pub struct TimeWindow<R, W, C> {
    options: Arc<ThrottleOptions<R>>,
    window: W,
    cache: C,
    clock: Arc<dyn Clock>,
    zone: WindowZone,
}

impl<R, W: fmt::Debug, C> fmt::Debug for TimeWindow<R, W, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeWindow")
            .field("options", &self.options)
            .field("window", &self.window)
            .field("cache", &"<cache>")
            .field("clock", &self.clock)
            .field("zone", &self.zone)
            .finish()
    }
}

impl<R, W, C> TimeWindow<R, W, C>
where
    W: Window,
    C: CounterCache,
{
    /// Create a counter using the system clock, labelling windows in local time.
    pub fn new(options: impl Into<Arc<ThrottleOptions<R>>>, window: W, cache: C) -> Self {
        Self {
            options: options.into(),
            window,
            cache,
            clock: Arc::new(SystemClock),
            zone: WindowZone::default(),
        }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<K: Clock + 'static>(mut self, clock: K) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Label windows in `zone` instead of local time.
    pub fn with_zone(mut self, zone: WindowZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn options(&self) -> &Arc<ThrottleOptions<R>> {
        &self.options
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn zone(&self) -> WindowZone {
        self.zone
    }

    /// Quota for `request`: the configured `max`, else the window default.
    /// Resolved afresh on every call.
    pub fn max_per_window(&self, request: &R) -> u64 {
        self.options.max_option(request).unwrap_or_else(|| self.window.default_quota())
    }
}

impl<R, W, C> TimeWindow<R, W, C>
where
    R: ClientRequest,
    W: Window,
    C: CounterCache,
{
    /// Counting key for `request` in the window containing "now".
    pub fn cache_key(&self, request: &R) -> String {
        let base = self.options.cache_key(request);
        match self.window.label(self.zone.wall_time(self.clock.now())) {
            Some(label) => format!("{}:{}", base, label),
            None => base,
        }
    }

    /// Prepare and count `request` in one go.
    pub async fn allowed(&self, request: &R) -> bool {
        let ticket = self.prepare(request);
        self.count(ticket).await
    }
}

impl<R, C: CounterCache> TimeWindow<R, Unwindowed, C> {
    /// Counter whose key never rolls over.
    pub fn unwindowed(options: impl Into<Arc<ThrottleOptions<R>>>, cache: C) -> Self {
        Self::new(options, Unwindowed, cache)
    }
}

impl<R, C: CounterCache> TimeWindow<R, Minute, C> {
    /// Per-minute counter (default quota 60).
    pub fn minute(options: impl Into<Arc<ThrottleOptions<R>>>, cache: C) -> Self {
        Self::new(options, Minute, cache)
    }
}

impl<R, C: CounterCache> TimeWindow<R, Hourly, C> {
    /// Per-hour counter (default quota 3600).
    pub fn hourly(options: impl Into<Arc<ThrottleOptions<R>>>, cache: C) -> Self {
        Self::new(options, Hourly, cache)
    }
}

impl<R, C: CounterCache> TimeWindow<R, Daily, C> {
    /// Per-day counter (default quota 86400).
    pub fn daily(options: impl Into<Arc<ThrottleOptions<R>>>, cache: C) -> Self {
        Self::new(options, Daily, cache)
    }
}

impl<R, C: CounterCache> TimeWindow<R, Monthly, C> {
    /// Per-month counter (default quota 100000).
    pub fn monthly(options: impl Into<Arc<ThrottleOptions<R>>>, cache: C) -> Self {
        Self::new(options, Monthly, cache)
    }
}

#[async_trait]
impl<R, W, C> Counter<R> for TimeWindow<R, W, C>
where
    R: ClientRequest,
    W: Window,
    C: CounterCache,
{
    type Ticket = WindowTicket;

    fn prepare(&self, request: &R) -> WindowTicket {
        WindowTicket { key: self.cache_key(request), quota: self.max_per_window(request) }
    }

    async fn count(&self, ticket: WindowTicket) -> bool {
        let WindowTicket { key, quota } = ticket;

        let prior = match self.cache.get(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "throttle cache read failed; counting from zero");
                0
            }
        };
        let count = prior.saturating_add(1);
        let allowed = count <= quota;

        if let Err(error) = self.cache.set(&key, count).await {
            tracing::warn!(
                key = %key,
                count,
                quota,
                error = %error,
                "throttle cache write failed; admitting request"
            );
            return true;
        }

        tracing::debug!(key = %key, count, quota, allowed, "window counted");
        allowed
    }

    fn default_quota(&self) -> u64 {
        self.window.default_quota()
    }
}
