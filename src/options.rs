//! Throttle configuration and per-request policy resolution.
//!
//! Every knob that may depend on the request is a [`Dynamic`]: either a fixed value or a
//! closure evaluated against the request each time it is needed. Nothing resolved here is
//! cached on the options; the same options may answer differently for two requests.
//!
//! Example
//! ```rust
//! use throttlegate::{ClientRequest, ThrottleOptions};
//!
//! struct Req { ip: &'static str, path: &'static str }
//! impl ClientRequest for Req {
//!     fn client_addr(&self) -> String { self.ip.to_string() }
//!     fn path(&self) -> &str { self.path }
//! }
//!
//! let options = ThrottleOptions::<Req>::builder()
//!     .max_with(|req| if req.path.starts_with("/api") { 100 } else { 30 })
//!     .key_prefix("ratelimit")
//!     .skip_throttling(|req| req.path == "/healthz")
//!     .build()
//!     .unwrap();
//!
//! let req = Req { ip: "1.2.3.4", path: "/api/users" };
//! assert_eq!(options.cache_key(&req), "ratelimit:1.2.3.4");
//! assert_eq!(options.max_option(&req), Some(100));
//! ```

use crate::request::ClientRequest;
use std::fmt;
use std::sync::Arc;

/// Shared predicate over a request.
pub type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Side-effecting hook invoked with a rejected request.
pub type Callback<R> = Arc<dyn Fn(&R) + Send + Sync>;

/// A configuration value that is either fixed or computed from the request.
pub enum Dynamic<R, T> {
    /// Same value for every request.
    Static(T),
    /// Evaluated against each request.
    Computed(Arc<dyn Fn(&R) -> T + Send + Sync>),
}

impl<R, T> Dynamic<R, T> {
    /// Wrap a closure as a computed value.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&R) -> T + Send + Sync + 'static,
    {
        Dynamic::Computed(Arc::new(f))
    }

    /// Resolve the value for `request`.
    pub fn resolve(&self, request: &R) -> T
    where
        T: Clone,
    {
        match self {
            Dynamic::Static(value) => value.clone(),
            Dynamic::Computed(f) => f(request),
        }
    }

    /// True for the `Computed` variant.
    pub fn is_computed(&self) -> bool {
        matches!(self, Dynamic::Computed(_))
    }
}

impl<R, T> From<T> for Dynamic<R, T> {
    fn from(value: T) -> Self {
        Dynamic::Static(value)
    }
}

impl<R, T: Clone> Clone for Dynamic<R, T> {
    fn clone(&self) -> Self {
        match self {
            Dynamic::Static(value) => Dynamic::Static(value.clone()),
            Dynamic::Computed(f) => Dynamic::Computed(f.clone()),
        }
    }
}

impl<R, T: fmt::Debug> fmt::Debug for Dynamic<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Dynamic::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// Immutable throttle configuration shared by the gate and the counter.
pub struct ThrottleOptions<R> {
    max: Option<Dynamic<R, u64>>,
    key: Option<Arc<dyn Fn(&R) -> String + Send + Sync>>,
    key_prefix: Option<String>,
    client_identifier: Option<Dynamic<R, String>>,
    skip_throttling: Option<Predicate<R>>,
    whitelist: Option<Predicate<R>>,
    blacklist: Option<Predicate<R>>,
    rate_limit_exceeded_callback: Option<Callback<R>>,
}

impl<R> fmt::Debug for ThrottleOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleOptions")
            .field("max", &self.max)
            .field("key", &self.key.as_ref().map(|_| "<fn>"))
            .field("key_prefix", &self.key_prefix)
            .field("client_identifier", &self.client_identifier)
            .field("skip_throttling", &self.skip_throttling.as_ref().map(|_| "<predicate>"))
            .field("whitelist", &self.whitelist.as_ref().map(|_| "<predicate>"))
            .field("blacklist", &self.blacklist.as_ref().map(|_| "<predicate>"))
            .field(
                "rate_limit_exceeded_callback",
                &self.rate_limit_exceeded_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl<R> Default for ThrottleOptions<R> {
    fn default() -> Self {
        Self {
            max: None,
            key: None,
            key_prefix: None,
            client_identifier: None,
            skip_throttling: None,
            whitelist: None,
            blacklist: None,
            rate_limit_exceeded_callback: None,
        }
    }
}

impl<R> ThrottleOptions<R> {
    /// Construct a new builder with every option unset.
    pub fn builder() -> ThrottleOptionsBuilder<R> {
        ThrottleOptionsBuilder::new()
    }

    /// The configured key prefix, if any.
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Resolve the configured quota. `None` when no `max` was configured, in which case the
    /// window's default applies.
    pub fn max_option(&self, request: &R) -> Option<u64> {
        self.max.as_ref().map(|max| max.resolve(request))
    }

    /// True when the skip predicate is configured and matches `request`.
    pub fn should_skip(&self, request: &R) -> bool {
        self.skip_throttling.as_ref().is_some_and(|skip| skip(request))
    }

    /// Whitelist override point; false unless a whitelist predicate is configured.
    pub fn whitelisted(&self, request: &R) -> bool {
        self.whitelist.as_ref().is_some_and(|allow| allow(request))
    }

    /// Blacklist override point; false unless a blacklist predicate is configured.
    pub fn blacklisted(&self, request: &R) -> bool {
        self.blacklist.as_ref().is_some_and(|deny| deny(request))
    }

    /// Invoke the rejection callback, if any.
    pub(crate) fn notify_rate_limited(&self, request: &R) {
        if let Some(callback) = &self.rate_limit_exceeded_callback {
            callback(request);
        }
    }
}

impl<R: ClientRequest> ThrottleOptions<R> {
    /// The rate-limit subject for `request`: the configured identifier, or the client
    /// address when none is configured.
    pub fn client_identifier(&self, request: &R) -> String {
        match &self.client_identifier {
            Some(identifier) => identifier.resolve(request),
            None => request.client_addr(),
        }
    }

    /// Base counting key for `request`.
    ///
    /// A `key` override is returned verbatim and bypasses the prefix. Otherwise the client
    /// identifier is used, as `"<prefix>:<identifier>"` when a prefix is configured.
    pub fn cache_key(&self, request: &R) -> String {
        if let Some(key) = &self.key {
            return key(request);
        }
        let identifier = self.client_identifier(request);
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, identifier),
            None => identifier,
        }
    }
}

/// Errors produced while building throttle options.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A configured key prefix must not be empty.
    #[error("key_prefix must not be empty")]
    EmptyKeyPrefix,
    /// A static client identifier must not be empty.
    #[error("client_identifier must not be empty")]
    EmptyClientIdentifier,
}

/// Builder for [`ThrottleOptions`].
pub struct ThrottleOptionsBuilder<R> {
    options: ThrottleOptions<R>,
}

impl<R> Default for ThrottleOptionsBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ThrottleOptionsBuilder<R> {
    /// Create a builder with every option unset.
    pub fn new() -> Self {
        Self { options: ThrottleOptions::default() }
    }

    /// Fixed quota per window.
    pub fn max(mut self, max: u64) -> Self {
        self.options.max = Some(Dynamic::Static(max));
        self
    }

    /// Quota computed per request (e.g. by API tier). Re-evaluated on every request.
    pub fn max_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> u64 + Send + Sync + 'static,
    {
        self.options.max = Some(Dynamic::computed(f));
        self
    }

    /// Replace key derivation entirely. The key prefix is not applied to the result.
    pub fn key<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.options.key = Some(Arc::new(f));
        self
    }

    /// Prefix joined to the client identifier as `"<prefix>:<identifier>"`.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.key_prefix = Some(prefix.into());
        self
    }

    /// Fixed rate-limit subject shared by every request.
    pub fn client_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.options.client_identifier = Some(Dynamic::Static(identifier.into()));
        self
    }

    /// Rate-limit subject computed per request (e.g. from an API key header).
    pub fn client_identifier_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.options.client_identifier = Some(Dynamic::computed(f));
        self
    }

    /// Unconditional bypass. Takes priority over whitelist, blacklist and counting.
    pub fn skip_throttling<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.options.skip_throttling = Some(Arc::new(f));
        self
    }

    /// Requests matching this predicate are always admitted.
    pub fn whitelist<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.options.whitelist = Some(Arc::new(f));
        self
    }

    /// Requests matching this predicate (and not whitelisted) are always denied.
    pub fn blacklist<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.options.blacklist = Some(Arc::new(f));
        self
    }

    /// Hook invoked with each denied request. Its outcome never changes the decision.
    pub fn on_rate_limit_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.options.rate_limit_exceeded_callback = Some(Arc::new(f));
        self
    }

    /// Validate and build the options.
    pub fn build(self) -> Result<ThrottleOptions<R>, BuildError> {
        if self.options.key_prefix.as_deref().is_some_and(str::is_empty) {
            return Err(BuildError::EmptyKeyPrefix);
        }
        if let Some(Dynamic::Static(identifier)) = &self.options.client_identifier {
            if identifier.is_empty() {
                return Err(BuildError::EmptyClientIdentifier);
            }
        }
        Ok(self.options)
    }
}
