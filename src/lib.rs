#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # throttlegate
//!
//! Request admission control for tower services: per-client quotas counted over fixed
//! calendar windows, with skip, whitelist and blacklist overrides.
//!
//! ## Features
//!
//! - **Fixed windows**: per-minute, hourly, daily and monthly buckets keyed by client
//! - **Dynamic policy**: quota, key and client identifier may be computed per request
//! - **Fail-open counting**: a failing cache never blocks traffic
//! - **Pluggable storage** via the async [`CounterCache`] port
//! - **Tower middleware**: [`ThrottleLayer`] for any request type, [`HttpThrottleLayer`]
//!   for `http` services with a rendered 403/429 response
//! - **Telemetry**: every decision reported to a tower-based sink
//!
//! ## Quick Start
//!
//! ```rust
//! use throttlegate::{HttpThrottleLayer, InMemoryCache, Limiter, ThrottleOptions};
//! use tower::{service_fn, Layer, ServiceExt};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let options = ThrottleOptions::<http::Request<String>>::builder()
//!     .max(1000)
//!     .skip_throttling(|req| req.uri().path() == "/healthz")
//!     .build()
//!     .unwrap();
//! let limiter = Limiter::hourly(options, InMemoryCache::new());
//!
//! let app = HttpThrottleLayer::new(limiter).layer(service_fn(|_req: http::Request<String>| async {
//!     Ok::<_, std::convert::Infallible>(http::Response::new(String::from("ok")))
//! }));
//!
//! let response = app.oneshot(http::Request::new(String::new())).await.unwrap();
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```

pub mod cache;
pub mod clock;
pub mod counter;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod options;
pub mod prelude;
pub mod rejection;
pub mod request;
pub mod telemetry;
pub mod window;

// Re-exports
pub use cache::{CacheError, CounterCache, InMemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{Counter, TimeWindow, Unlimited, WindowTicket};
pub use error::ThrottleError;
pub use limiter::{Decision, Limiter};
pub use middleware::{ThrottleLayer, ThrottleService};
pub use options::{BuildError, Dynamic, ThrottleOptions, ThrottleOptionsBuilder};
pub use rejection::{HttpThrottleLayer, HttpThrottleService, Rejection};
pub use request::ClientRequest;
pub use window::{
    Daily, Hourly, Minute, Monthly, ParseWindowError, Unwindowed, Window, WindowKind, WindowZone,
};
