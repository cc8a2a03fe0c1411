use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::future::Ready;
use throttlegate::{ClientRequest, InMemoryCache, Limiter, ThrottleLayer, ThrottleOptions, Unwindowed};
use tower::{Service, ServiceBuilder};

#[derive(Clone)]
struct BenchRequest {
    ip: &'static str,
}

impl ClientRequest for BenchRequest {
    fn client_addr(&self) -> String {
        self.ip.to_string()
    }

    fn path(&self) -> &str {
        "/bench"
    }
}

// Returns immediately so the benchmark measures the gate, not the handler.
#[derive(Clone)]
struct EchoService;

impl Service<BenchRequest> for EchoService {
    type Response = &'static str;
    type Error = std::io::Error;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: BenchRequest) -> Self::Future {
        futures::future::ready(Ok(req.ip))
    }
}

fn admission_within_quota(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let options = ThrottleOptions::<BenchRequest>::builder().max(u64::MAX).build().unwrap();
    let layer = ThrottleLayer::new(Limiter::hourly(options, InMemoryCache::new()));
    let svc = ServiceBuilder::new().layer(layer).service(EchoService);

    c.bench_function("throttle_hourly_admitted", |b| {
        b.to_async(&rt).iter(|| async {
            let mut local_svc = svc.clone();
            let _ = black_box(local_svc.call(black_box(BenchRequest { ip: "1.2.3.4" }))).await;
        });
    });
}

fn admission_over_quota(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let options = ThrottleOptions::<BenchRequest>::builder().max(0).build().unwrap();
    let layer = ThrottleLayer::new(Limiter::new(options, Unwindowed, InMemoryCache::new()));
    let svc = ServiceBuilder::new().layer(layer).service(EchoService);

    c.bench_function("throttle_unwindowed_rejected", |b| {
        b.to_async(&rt).iter(|| async {
            let mut local_svc = svc.clone();
            let _ = black_box(local_svc.call(black_box(BenchRequest { ip: "1.2.3.4" }))).await;
        });
    });
}

fn whitelist_bypass(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let options = ThrottleOptions::<BenchRequest>::builder()
        .whitelist(|req| req.ip.starts_with("10."))
        .build()
        .unwrap();
    let limiter = Limiter::daily(options, InMemoryCache::new());

    c.bench_function("throttle_whitelisted", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(limiter.evaluate(black_box(&BenchRequest { ip: "10.0.0.1" })).await);
        });
    });
}

criterion_group!(benches, admission_within_quota, admission_over_quota, whitelist_bypass);
criterion_main!(benches);
