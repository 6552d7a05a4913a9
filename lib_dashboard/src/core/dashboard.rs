//! # Dashboard Orchestrator
//!
//! Drives one load cycle per domain and repeats it on a fixed interval:
//!
//! 1. A fresh cached record is published as is.
//! 2. Otherwise the domain is marked loading and its two sources are fetched
//!    concurrently, each through the request registry and the retry policy.
//! 3. The payloads are decoded and run through the pipeline.
//! 4. The derived record is written to the cache and published.
//!
//! Any failure ends up as the domain's error message in the state store. The
//! three domains of a cycle run concurrently on the caller's task and fail
//! independently; nothing inside a cycle is spawned.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::cache::{TtlCache, DEFAULT_TTL};
use crate::core::loading::LoadingTracker;
use crate::core::metrics::{self, PerformanceReport};
use crate::core::registry::RequestRegistry;
use crate::core::state::{Domain, StateStore};
use crate::retrieve::resilient::{fetch_with_retry, FetchError, RetryPolicy};
use crate::sources::payloads::{ActivityPoint, DailySales, Kpis, Product, RegionRecord, UserStats};
use crate::sources::{DataSource, SourceId};
use crate::transforms::records::DomainRecord;
use crate::transforms::{
    process_business_data, process_sales_data, process_user_data, TransformError,
};

/// One minute.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub refresh_interval: Duration,
    /// Only used by [`Dashboard::with_source`]; an injected cache keeps its own.
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cache_ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a domain failed to load. The `Display` output is what ends up in
/// `DashboardState::errors`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Invalid {origin} payload: {reason}")]
    Payload { origin: SourceId, reason: String },
    #[error(transparent)]
    Transform(#[from] TransformError),
}

pub struct Dashboard {
    source: Arc<dyn DataSource>,
    cache: Arc<TtlCache<DomainRecord>>,
    state: Arc<StateStore>,
    requests: Arc<RequestRegistry>,
    loading: Arc<LoadingTracker>,
    options: DashboardOptions,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn DataSource>,
        cache: Arc<TtlCache<DomainRecord>>,
        state: Arc<StateStore>,
        requests: Arc<RequestRegistry>,
        loading: Arc<LoadingTracker>,
        options: DashboardOptions,
    ) -> Self {
        Self {
            source,
            cache,
            state,
            requests,
            loading,
            options,
        }
    }

    /// Builds a dashboard with fresh components around `source`.
    pub fn with_source(source: Arc<dyn DataSource>, options: DashboardOptions) -> Self {
        Self::new(
            source,
            Arc::new(TtlCache::new(options.cache_ttl)),
            Arc::new(StateStore::new()),
            Arc::new(RequestRegistry::new()),
            Arc::new(LoadingTracker::new()),
            options,
        )
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    pub fn cache(&self) -> &Arc<TtlCache<DomainRecord>> {
        &self.cache
    }

    pub fn requests(&self) -> &Arc<RequestRegistry> {
        &self.requests
    }

    pub fn loading(&self) -> &Arc<LoadingTracker> {
        &self.loading
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    /// Loads every domain concurrently. Completes once all three have settled.
    pub async fn load_all(&self) {
        tokio::join!(
            self.load_domain(Domain::Sales),
            self.load_domain(Domain::Users),
            self.load_domain(Domain::Business),
        );
    }

    pub async fn load_domain(&self, domain: Domain) {
        if let Some(record) = self.cache.get(domain.cache_key()) {
            log::debug!("Serving {} data from cache", domain);
            self.state.set_data(record);
            return;
        }

        self.state.set_loading(domain, true);

        match self.fetch_domain(domain).await {
            Ok(Some(record)) => {
                self.cache.set(domain.cache_key(), record.clone());
                self.state.set_data(record);
                log::info!("Loaded {} data", domain);
            }
            Ok(None) => {
                log::debug!("Load of {} data was cancelled", domain);
                // A successor still running owns the flag.
                let successor = SourceId::for_domain(domain)
                    .iter()
                    .any(|source| self.requests.is_in_flight(source.as_str()));
                if !successor {
                    self.state.set_loading(domain, false);
                }
            }
            Err(err) => {
                log::error!("Failed to load {} data: {}", domain, err);
                self.state.set_error(domain, err.to_string());
            }
        }
    }

    /// Cancels in-flight requests, empties the cache and reloads everything.
    pub async fn force_refresh(&self) {
        log::info!("Forcing a full refresh");
        self.requests.cancel_all();
        self.cache.clear();
        self.load_all().await;
    }

    pub fn performance_metrics(&self) -> PerformanceReport {
        metrics::compute(&self.state.state(), &self.cache.stats(), chrono::Utc::now())
    }

    /// Runs a load cycle immediately and then once per refresh interval until
    /// `shutdown` fires. A cycle that overruns the interval delays the next
    /// one instead of stacking up.
    ///
    /// Returns immediately if the refresh interval is zero.
    pub async fn run(&self, shutdown: CancellationToken) {
        if self.options.refresh_interval.is_zero() {
            log::error!("Refresh interval must be non-zero, refresh loop not started");
            return;
        }

        log::info!(
            "Dashboard refresh loop started (every {}s)",
            self.options.refresh_interval.as_secs_f64()
        );

        let mut ticker = tokio::time::interval(self.options.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.load_all() => {}
            }
        }

        self.requests.cancel_all();
        for domain in Domain::ALL {
            if self.state.state().loading.get(domain) {
                self.state.set_loading(domain, false);
            }
        }
        log::info!("Dashboard refresh loop stopped");
    }

    // Ok(None) when either fetch was superseded or cancelled.
    async fn fetch_domain(&self, domain: Domain) -> Result<Option<DomainRecord>, LoadError> {
        let [first, second] = SourceId::for_domain(domain);
        let (a, b) = tokio::try_join!(self.fetch_source(first), self.fetch_source(second))?;
        let (Some(a), Some(b)) = (a, b) else {
            return Ok(None);
        };

        let record = match domain {
            Domain::Sales => DomainRecord::Sales(process_sales_data(
                decode::<DailySales>(first, a)?,
                &decode::<Vec<Product>>(second, b)?,
            )?),
            Domain::Users => DomainRecord::Users(process_user_data(
                decode::<UserStats>(first, a)?,
                &decode::<Vec<ActivityPoint>>(second, b)?,
            )?),
            Domain::Business => DomainRecord::Business(process_business_data(
                &decode::<Kpis>(first, a)?,
                &decode::<Vec<RegionRecord>>(second, b)?,
            )?),
        };
        Ok(Some(record))
    }

    async fn fetch_source(&self, source: SourceId) -> Result<Option<Value>, FetchError> {
        let _busy = self.loading.track(source.as_str());
        let data_source = &self.source;
        let policy = &self.options.retry;

        self.requests
            .start(source.as_str(), |cancel| async move {
                fetch_with_retry(move |_| data_source.fetch(source), policy, &cancel).await
            })
            .await
    }
}

fn decode<T: DeserializeOwned>(origin: SourceId, value: Value) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|e| LoadError::Payload {
        origin,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::resilient::TransportError;
    use crate::sources::mock::MockDataSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    fn dashboard(source: impl DataSource + 'static) -> Dashboard {
        Dashboard::with_source(Arc::new(source), DashboardOptions::default())
    }

    /// Never answers for `Kpis`, serves everything else immediately.
    struct HangingKpis;

    #[async_trait]
    impl DataSource for HangingKpis {
        async fn fetch(&self, source: SourceId) -> Result<Value, TransportError> {
            if source == SourceId::Kpis {
                std::future::pending::<()>().await;
            }
            Ok(MockDataSource::payload(source))
        }
    }

    /// Serves a payload the pipeline cannot decode for `UserStats`.
    struct MalformedUsers;

    #[async_trait]
    impl DataSource for MalformedUsers {
        async fn fetch(&self, source: SourceId) -> Result<Value, TransportError> {
            if source == SourceId::UserStats {
                return Ok(serde_json::json!({ "total": "many" }));
            }
            Ok(MockDataSource::payload(source))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn load_all_runs_domains_concurrently() {
        let dash = dashboard(MockDataSource::new());
        let started = Instant::now();

        dash.load_all().await;

        // Slowest pair is business (900ms); sequential loading would take ~2.3s.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(900));
        assert!(elapsed < Duration::from_millis(1000));

        let state = dash.state().state();
        assert_eq!(state.data.loaded_count(), 3);
        assert_eq!(state.error_count(), 0);
        assert!(!state.loading.any());
        assert!(dash.requests().is_empty());
        assert_eq!(dash.loading().active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_cycle_is_served_from_cache() {
        let dash = dashboard(MockDataSource::new());
        dash.load_all().await;

        let started = Instant::now();
        dash.load_all().await;

        assert!(started.elapsed() < Duration::from_millis(1));
        let stats = dash.cache().stats();
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.keys, vec!["business-data", "sales-data", "user-data"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_source_only_fails_its_domain() {
        let dash = dashboard(MockDataSource::new().with_failure(SourceId::UserStats));

        dash.load_all().await;

        let state = dash.state().state();
        assert!(state.data.sales.is_some());
        assert!(state.data.business.is_some());
        assert!(state.data.users.is_none());
        assert_eq!(state.error(Domain::Users), Some("users.stats unavailable"));
        assert!(!state.loading.users);
        assert!(!dash.cache().stats().keys.contains(&"user-data".to_string()));

        let report = dash.performance_metrics();
        assert_eq!(report.system.success_rate, 66.67);
        assert!(!report.operational.healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_source_times_out_without_retry() {
        let dash = dashboard(HangingKpis);
        let started = Instant::now();

        dash.load_domain(Domain::Business).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(5000));
        assert!(elapsed < Duration::from_millis(5100));
        assert_eq!(
            dash.state().state().error(Domain::Business),
            Some("Request timed out after 5000ms")
        );
        assert!(dash.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_names_its_source() {
        let dash = dashboard(MalformedUsers);

        dash.load_domain(Domain::Users).await;

        let state = dash.state().state();
        let error = state.error(Domain::Users).unwrap();
        assert!(error.starts_with("Invalid users.stats payload:"), "{error}");
        assert!(dash.cache().stats().keys.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn force_refresh_refetches_and_keeps_counters() {
        let dash = dashboard(MockDataSource::new());
        dash.load_all().await;

        let started = Instant::now();
        dash.force_refresh().await;

        assert!(started.elapsed() >= Duration::from_millis(900));
        let stats = dash.cache().stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 6);
        assert_eq!(stats.size, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_load_does_not_publish() {
        let dash = dashboard(MockDataSource::new());
        let published = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&published);
        let _sub = dash.state().subscribe(move |snapshot| {
            if snapshot.data.sales.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::join!(
            dash.load_domain(Domain::Sales),
            async {
                sleep(Duration::from_millis(100)).await;
                dash.load_domain(Domain::Sales).await;
            },
            async {
                // The first load is gone by now, its successor is still running.
                sleep(Duration::from_millis(300)).await;
                assert!(dash.requests().is_in_flight("sales.daily"));
                assert!(dash.loading().is_active("sales.daily"));
                assert!(dash.loading().is_active("sales.top-products"));
                assert!(dash.state().state().loading.sales);
            }
        );

        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert!(dash.loading().snapshot().is_empty());
        let state = dash.state().state();
        assert!(!state.loading.sales);
        assert_eq!(state.error(Domain::Sales), None);
    }

    #[tokio::test(start_paused = true)]
    async fn run_refreshes_until_shutdown() {
        let options = DashboardOptions {
            refresh_interval: Duration::from_secs(10),
            ..DashboardOptions::default()
        };
        let dash = Arc::new(Dashboard::with_source(
            Arc::new(MockDataSource::new()),
            options,
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let dash = Arc::clone(&dash);
            let shutdown = shutdown.clone();
            async move { dash.run(shutdown).await }
        });

        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(dash.state().state().data.loaded_count(), 3);
        assert_eq!(dash.cache().stats().hits, 3);

        shutdown.cancel();
        handle.await.unwrap();
        assert!(dash.requests().is_empty());
        assert!(!dash.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_refresh_interval_does_not_start_the_loop() {
        let options = DashboardOptions {
            refresh_interval: Duration::ZERO,
            ..DashboardOptions::default()
        };
        let dash = Dashboard::with_source(Arc::new(MockDataSource::new()), options);

        // Not cancelled: the call must return on its own.
        dash.run(CancellationToken::new()).await;

        let state = dash.state().state();
        assert_eq!(state.data.loaded_count(), 0);
        assert!(!state.loading.any());
        assert_eq!(dash.cache().stats().misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_cycle_clears_loading() {
        let dash = Arc::new(dashboard(MockDataSource::new()));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let dash = Arc::clone(&dash);
            let shutdown = shutdown.clone();
            async move { dash.run(shutdown).await }
        });

        sleep(Duration::from_millis(300)).await;
        assert!(dash.state().is_loading());

        shutdown.cancel();
        handle.await.unwrap();

        let state = dash.state().state();
        assert!(!state.loading.any());
        assert_eq!(state.data.loaded_count(), 0);
        assert!(dash.requests().is_empty());
        assert_eq!(dash.loading().active_count(), 0);
    }
}
