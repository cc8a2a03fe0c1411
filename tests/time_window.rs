mod common;

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use common::TestRequest;
use throttlegate::{
    Counter, Daily, Hourly, InMemoryCache, Limiter, ManualClock, Minute, Monthly, ThrottleOptions,
    TimeWindow, Unwindowed, Window, WindowKind, WindowZone,
};

fn clock_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().expect("valid instant"))
}

#[tokio::test]
async fn monthly_quota_rolls_over_with_the_calendar() {
    let clock = clock_at(2024, 1, 1, 0, 0);
    let options = ThrottleOptions::<TestRequest>::builder().max(3).build().unwrap();
    let limiter = Limiter::monthly(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(WindowZone::Utc);
    let req = TestRequest::get("/foo");

    for _ in 0..3 {
        assert!(limiter.evaluate(&req).await.is_allowed());
    }
    assert!(!limiter.evaluate(&req).await.is_allowed());

    // Later in the same month the bucket is still full.
    clock.set(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).single().unwrap());
    assert!(!limiter.evaluate(&req).await.is_allowed());

    clock.set(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single().unwrap());
    assert!(limiter.evaluate(&req).await.is_allowed());

    let cache = limiter.counter().cache();
    assert_eq!(cache.peek("1.2.3.4:2024-01"), Some(5));
    assert_eq!(cache.peek("1.2.3.4:2024-02"), Some(1));
}

#[tokio::test]
async fn exhausted_previous_month_does_not_leak_into_current() {
    let clock = clock_at(2024, 4, 30, 12, 0);
    let options = ThrottleOptions::<TestRequest>::builder().max(3).build().unwrap();
    let limiter = Limiter::monthly(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(WindowZone::Utc);
    let req = TestRequest::get("/foo");

    for _ in 0..4 {
        limiter.evaluate(&req).await;
    }
    assert!(!limiter.evaluate(&req).await.is_allowed());

    clock.advance(Duration::days(1));
    assert!(limiter.evaluate(&req).await.is_allowed());
}

#[tokio::test]
async fn hourly_and_minute_windows_label_keys() {
    let clock = clock_at(2024, 5, 14, 9, 30);
    let options = ThrottleOptions::<TestRequest>::builder().key_prefix("api").build().unwrap();

    let hourly = TimeWindow::hourly(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(WindowZone::Utc);
    assert_eq!(hourly.cache_key(&TestRequest::get("/")), "api:1.2.3.4:2024-05-14T09");

    let options = ThrottleOptions::<TestRequest>::builder().build().unwrap();
    let minute = TimeWindow::minute(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(WindowZone::Utc);
    assert_eq!(minute.cache_key(&TestRequest::get("/")), "1.2.3.4:2024-05-14T09:30");

    clock.advance(Duration::minutes(1));
    assert_eq!(minute.cache_key(&TestRequest::get("/")), "1.2.3.4:2024-05-14T09:31");
}

#[tokio::test]
async fn daily_window_resets_at_midnight_utc() {
    let clock = clock_at(2024, 5, 14, 23, 59);
    let options = ThrottleOptions::<TestRequest>::builder().max(1).build().unwrap();
    let limiter = Limiter::daily(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(WindowZone::Utc);
    let req = TestRequest::get("/foo");

    assert!(limiter.evaluate(&req).await.is_allowed());
    assert!(!limiter.evaluate(&req).await.is_allowed());

    clock.advance(Duration::minutes(1));
    assert!(limiter.evaluate(&req).await.is_allowed());
}

#[test]
fn window_defaults_apply_without_max() {
    let req = TestRequest::get("/foo");
    let options = ThrottleOptions::<TestRequest>::default;

    assert_eq!(TimeWindow::unwindowed(options(), InMemoryCache::new()).max_per_window(&req), 0);
    assert_eq!(TimeWindow::new(options(), Minute, InMemoryCache::new()).max_per_window(&req), 60);
    assert_eq!(TimeWindow::new(options(), Hourly, InMemoryCache::new()).max_per_window(&req), 3_600);
    assert_eq!(TimeWindow::new(options(), Daily, InMemoryCache::new()).max_per_window(&req), 86_400);
    assert_eq!(
        TimeWindow::new(options(), Monthly, InMemoryCache::new()).max_per_window(&req),
        100_000
    );
}

#[test]
fn configured_max_overrides_window_default() {
    let req = TestRequest::get("/foo");
    let options = ThrottleOptions::<TestRequest>::builder().max(300).build().unwrap();
    let counter = TimeWindow::new(options, Hourly, InMemoryCache::new());
    assert_eq!(counter.max_per_window(&req), 300);
    assert_eq!(Counter::<TestRequest>::default_quota(&counter), 3_600);
}

#[tokio::test]
async fn unwindowed_without_max_denies_everything() {
    let options = ThrottleOptions::<TestRequest>::default();
    let limiter = Limiter::new(options, Unwindowed, InMemoryCache::new());
    assert!(!limiter.evaluate(&TestRequest::get("/foo")).await.is_allowed());
}

#[tokio::test]
async fn window_kind_selects_a_window_at_runtime() {
    let kind: WindowKind = "daily".parse().expect("known window");
    assert_eq!(kind.default_quota(), 86_400);

    let clock = clock_at(2024, 5, 14, 9, 30);
    let options = ThrottleOptions::<TestRequest>::builder().max(2).build().unwrap();
    let limiter = Limiter::new(options, kind, InMemoryCache::new())
        .with_clock(clock)
        .with_zone(WindowZone::Utc);
    let req = TestRequest::get("/foo");

    limiter.evaluate(&req).await;
    assert_eq!(limiter.counter().cache().peek("1.2.3.4:2024-05-14"), Some(1));
}

#[tokio::test]
async fn monthly_window_rolls_at_local_midnight_for_an_offset_zone() {
    // 2024-05-31T14:00Z is midnight on June 1st at UTC+10.
    let clock = clock_at(2024, 5, 31, 13, 0);
    let east = WindowZone::Fixed(FixedOffset::east_opt(10 * 3600).expect("valid offset"));
    let options = ThrottleOptions::<TestRequest>::builder().max(1).build().unwrap();
    let limiter = Limiter::monthly(options, InMemoryCache::new())
        .with_clock(clock.clone())
        .with_zone(east);
    let req = TestRequest::get("/foo");

    // 23:00 on May 31st local time: May's bucket.
    assert!(limiter.evaluate(&req).await.is_allowed());
    assert!(!limiter.evaluate(&req).await.is_allowed());

    // Still May 31st in UTC, but June locally: a fresh bucket.
    clock.advance(Duration::hours(1));
    assert!(limiter.evaluate(&req).await.is_allowed());

    let cache = limiter.counter().cache();
    assert_eq!(cache.peek("1.2.3.4:2024-05"), Some(2));
    assert_eq!(cache.peek("1.2.3.4:2024-06"), Some(1));
}

#[test]
fn windows_label_in_local_time_by_default() {
    let options = ThrottleOptions::<TestRequest>::default();
    let counter = TimeWindow::monthly(options, InMemoryCache::new());
    assert_eq!(counter.zone(), WindowZone::Local);
}
