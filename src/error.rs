//! Error types surfaced by the throttling middleware
use std::fmt;

/// Error returned by [`ThrottleService`](crate::ThrottleService).
///
/// Cache failures never show up here: the counter absorbs them and turns them into
/// admission outcomes. The only throttle-originated variant is the rejection itself.
#[derive(Debug, Clone)]
pub enum ThrottleError<E> {
    /// The request was denied by the admission gate; the inner service was not called.
    RateLimited,
    /// The inner service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for ThrottleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ThrottleError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited => None,
        }
    }
}

impl<E> ThrottleError<E> {
    /// Check if the request was rejected by the gate.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);
    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for DummyError {}

    #[test]
    fn rate_limited_display() {
        let err: ThrottleError<io::Error> = ThrottleError::RateLimited;
        assert_eq!(err.to_string(), "rate limit exceeded");
        assert!(err.is_rate_limited());
        assert!(!err.is_inner());
        assert!(err.source().is_none());
    }

    #[test]
    fn inner_display_is_transparent() {
        let err = ThrottleError::Inner(DummyError("backend down"));
        assert_eq!(err.to_string(), "backend down");
        assert!(err.source().is_some());
    }

    #[test]
    fn into_inner_extracts_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err = ThrottleError::Inner(io_err);
        let extracted = err.into_inner().unwrap();
        assert_eq!(extracted.to_string(), "test");

        let limited: ThrottleError<DummyError> = ThrottleError::RateLimited;
        assert!(limited.as_inner().is_none());
        assert!(limited.into_inner().is_none());
    }
}
