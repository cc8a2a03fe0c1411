//! Compile-time prelude coverage test.
use throttlegate::prelude::*;
use tower::service_fn;
use tower_layer::Layer;
use tower_service::Service;

#[derive(Clone)]
struct Req;

impl ClientRequest for Req {
    fn client_addr(&self) -> String {
        "127.0.0.1".to_string()
    }

    fn path(&self) -> &str {
        "/"
    }
}

#[tokio::test]
async fn prelude_reexports_core_types() {
    let options = ThrottleOptions::<Req>::builder().max(5).build().expect("valid options");
    let limiter = Limiter::new(options, WindowKind::Minute, InMemoryCache::new());
    assert_eq!(limiter.evaluate(&Req).await, Decision::Allow);

    let mut svc = ThrottleLayer::new(limiter).layer(service_fn(|_req: Req| async {
        Ok::<_, std::io::Error>(())
    }));
    svc.call(Req).await.expect("service call failed");

    let _rejection = Rejection::default();
    let _windows = (Minute, Hourly, Daily, Monthly);
}
