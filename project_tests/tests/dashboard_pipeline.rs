//! End-to-end load cycles through the public `lib_dashboard` API, on a paused
//! clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};

use lib_dashboard::sources::mock::MockDataSource;
use lib_dashboard::{
    Dashboard, DashboardOptions, DataSource, Domain, SourceId, TransportError,
};

fn dashboard(source: impl DataSource + 'static) -> Dashboard {
    Dashboard::with_source(Arc::new(source), DashboardOptions::default())
}

/// Fails the first `failures` calls of every source, then serves the mock
/// payloads without latency.
struct FlakySource {
    failures: usize,
    calls: Mutex<HashMap<SourceId, usize>>,
}

impl FlakySource {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DataSource for FlakySource {
    async fn fetch(&self, source: SourceId) -> Result<Value, TransportError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(source).or_insert(0);
            *count += 1;
            *count
        };
        if call <= self.failures {
            return Err(TransportError::Status(503));
        }
        Ok(MockDataSource::payload(source))
    }
}

#[tokio::test(start_paused = true)]
async fn failing_domain_is_isolated_and_reported() {
    let dashboard = dashboard(MockDataSource::new().with_failure(SourceId::UserStats));

    dashboard.load_all().await;

    let state = dashboard.state().state();
    assert!(state.data.sales.is_some());
    assert!(state.data.business.is_some());
    assert!(state.data.users.is_none());
    assert_eq!(state.error(Domain::Users), Some("users.stats unavailable"));
    assert!(!state.loading.any());

    let report = dashboard.performance_metrics();
    assert_eq!(report.system.loaded_modules, 2);
    assert_eq!(report.system.success_rate, 66.67);
    assert_eq!(report.data.errors, 1);
    assert!(report.business.is_none());
    assert!(!report.operational.healthy);
    assert_eq!(report.operational.status, "Issues detected");
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_absorbed_by_retries() {
    let dashboard = dashboard(FlakySource::new(2));
    let started = Instant::now();

    dashboard.load_all().await;

    // Two backoffs: 500ms after attempt 1, 1000ms after attempt 2.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500));
    assert!(elapsed < Duration::from_millis(1600));

    let report = dashboard.performance_metrics();
    assert!(report.operational.healthy);
    assert_eq!(report.operational.status, "Healthy");
    assert!(report.data.integrity);
    assert!(report.business.is_some());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_status() {
    let dashboard = dashboard(FlakySource::new(3));

    dashboard.load_all().await;

    let state = dashboard.state().state();
    for domain in Domain::ALL {
        assert_eq!(state.error(domain), Some("HTTP 503"));
    }
    assert_eq!(dashboard.cache().stats().size, 0);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_supersedes_a_running_cycle() {
    let dashboard = dashboard(MockDataSource::new());
    let published = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&published);
    let _sub = dashboard.state().subscribe(move |snapshot| {
        if snapshot.last_updated.is_some() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    tokio::join!(dashboard.load_all(), async {
        sleep(Duration::from_millis(200)).await;
        dashboard.force_refresh().await;
    });

    let state = dashboard.state().state();
    assert_eq!(state.data.loaded_count(), 3);
    assert_eq!(state.error_count(), 0);
    assert!(!state.loading.any());
    // Only the refreshed cycle publishes data.
    assert_eq!(published.load(Ordering::SeqCst), 3);

    let stats = dashboard.cache().stats();
    assert_eq!(stats.misses, 6);
    assert!(dashboard.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_change_notifies_subscribers_once() {
    let dashboard = dashboard(MockDataSource::new());
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    let _sub = dashboard.state().subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    dashboard.load_all().await;
    // One set_loading and one set_data per domain.
    assert_eq!(notifications.load(Ordering::SeqCst), 6);

    dashboard.load_all().await;
    // Cache hits publish without a loading transition.
    assert_eq!(notifications.load(Ordering::SeqCst), 9);
}

#[tokio::test(start_paused = true)]
async fn report_serializes_in_camel_case() {
    let dashboard = dashboard(MockDataSource::new());
    dashboard.load_all().await;

    let json = serde_json::to_value(dashboard.performance_metrics()).unwrap();

    assert_eq!(json["system"]["totalModules"], 3);
    assert_eq!(json["system"]["successRate"], 100.0);
    assert_eq!(json["data"]["integrity"], true);
    assert!(json["business"]["avgRevenuePerUser"].is_number());
    assert_eq!(json["operational"]["status"], "Healthy");
}
