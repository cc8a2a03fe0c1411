//! Run with `cargo run --example monthly_quota`.
//!
//! An HTTP handler behind a monthly quota of three requests per client. The fourth
//! request from the same address gets the rendered `403 Rate Limit Exceeded`.

use http::{Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use throttlegate::telemetry::LogSink;
use throttlegate::{HttpThrottleLayer, InMemoryCache, Limiter, ThrottleOptions};
use tower::{service_fn, Layer, ServiceExt};
use tracing_subscriber::EnvFilter;

fn request(addr: &str, path: &str) -> Request<String> {
    let mut req = Request::builder().uri(path).body(String::new()).unwrap();
    req.extensions_mut().insert(addr.parse::<SocketAddr>().unwrap());
    req
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let options = ThrottleOptions::<Request<String>>::builder()
        .max(3)
        .key_prefix("demo")
        .skip_throttling(|req| req.uri().path() == "/healthz")
        .on_rate_limit_exceeded(|req| {
            tracing::warn!(path = %req.uri().path(), "client exhausted its monthly quota");
        })
        .build()
        .unwrap();
    let limiter = Limiter::monthly(options, InMemoryCache::new()).with_sink(LogSink);

    let app = HttpThrottleLayer::new(limiter).layer(service_fn(|req: Request<String>| async move {
        Ok::<_, Infallible>(Response::new(format!("hello from {}", req.uri().path())))
    }));

    for i in 1..=5 {
        let response = app.clone().oneshot(request("203.0.113.7:40000", "/api")).await.unwrap();
        println!("request {}: {} {}", i, response.status(), response.body());
    }

    let health = app.clone().oneshot(request("203.0.113.7:40000", "/healthz")).await.unwrap();
    println!("healthz: {}", health.status());

    let other = app.oneshot(request("198.51.100.2:40000", "/api")).await.unwrap();
    println!("other client: {}", other.status());
}
