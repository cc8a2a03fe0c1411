//! Convenient re-exports for common throttlegate types.
pub use crate::{
    cache::{CacheError, CounterCache, InMemoryCache},
    counter::{Counter, TimeWindow},
    limiter::{Decision, Limiter},
    middleware::ThrottleLayer,
    options::ThrottleOptions,
    rejection::{HttpThrottleLayer, Rejection},
    request::ClientRequest,
    window::{Daily, Hourly, Minute, Monthly, WindowKind, WindowZone},
    ThrottleError,
};
