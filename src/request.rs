//! Read-only request view consumed by the admission gate.
//!
//! The gate only needs two facts about a request: where it came from and what it asked
//! for. Anything else (headers, auth tokens, API tiers) is reached by user-supplied
//! closures that receive the concrete request type.

use std::net::SocketAddr;

/// Minimal view of an inbound request.
pub trait ClientRequest {
    /// Address of the client that sent the request; the default rate-limit subject.
    fn client_addr(&self) -> String;

    /// Request path, without the query string.
    fn path(&self) -> &str;
}

impl<T: ClientRequest + ?Sized> ClientRequest for &T {
    fn client_addr(&self) -> String {
        (**self).client_addr()
    }

    fn path(&self) -> &str {
        (**self).path()
    }
}

/// Client address used when an HTTP request carries no usable origin information.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolution order: peer `SocketAddr` extension, first `X-Forwarded-For` hop,
/// `X-Real-IP`, then [`UNKNOWN_CLIENT`].
impl<B> ClientRequest for http::Request<B> {
    fn client_addr(&self) -> String {
        if let Some(addr) = self.extensions().get::<SocketAddr>() {
            return addr.ip().to_string();
        }

        if let Some(forwarded) = self.headers().get("x-forwarded-for") {
            if let Ok(value) = forwarded.to_str() {
                if let Some(first) = value.split(',').next().map(str::trim) {
                    if !first.is_empty() {
                        return first.to_string();
                    }
                }
            }
        }

        if let Some(real_ip) = self.headers().get("x-real-ip") {
            if let Ok(value) = real_ip.to_str() {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }

        UNKNOWN_CLIENT.to_string()
    }

    fn path(&self) -> &str {
        self.uri().path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_extension_wins() {
        let mut req = http::Request::builder()
            .uri("/foo/bar?x=1")
            .header("x-forwarded-for", "9.9.9.9")
            .body(())
            .unwrap();
        req.extensions_mut().insert("1.2.3.4:5555".parse::<SocketAddr>().unwrap());

        assert_eq!(req.client_addr(), "1.2.3.4");
        assert_eq!(req.path(), "/foo/bar");
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let req = http::Request::builder()
            .uri("/")
            .header("x-forwarded-for", " 10.0.0.1 , 172.16.0.1")
            .body(())
            .unwrap();
        assert_eq!(req.client_addr(), "10.0.0.1");
    }

    #[test]
    fn real_ip_then_unknown() {
        let req = http::Request::builder().uri("/").header("x-real-ip", "8.8.4.4").body(()).unwrap();
        assert_eq!(req.client_addr(), "8.8.4.4");

        let bare = http::Request::builder().uri("/").body(()).unwrap();
        assert_eq!(bare.client_addr(), UNKNOWN_CLIENT);
    }
}
