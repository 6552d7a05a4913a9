//! # Performance Report
//!
//! Derives a health/performance summary from a state snapshot and the cache
//! statistics. Computing a report has no side effects; it is rebuilt on every
//! request.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::core::cache::CacheStats;
use crate::core::round_to;
use crate::core::state::{DashboardState, Domain};

pub const STATUS_HEALTHY: &str = "Healthy";
pub const STATUS_ISSUES: &str = "Issues detected";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub total_modules: usize,
    pub loaded_modules: usize,
    /// Percentage of loaded domains, two decimals.
    pub success_rate: f64,
    pub total_cache_hits: u64,
    pub total_cache_misses: u64,
    pub cache_hit_rate: f64,
    /// Seconds, one decimal. `None` until something was published.
    pub time_since_last_update: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub freshness: String,
    pub integrity: bool,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetrics {
    pub avg_revenue_per_user: f64,
    /// Mean regional growth.
    pub avg_growth: f64,
    /// Deviation of KPI revenue from its target, in percent. `None` for a zero
    /// target.
    pub kpi_deviation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalStatus {
    pub healthy: bool,
    pub status: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub system: SystemMetrics,
    pub data: DataQuality,
    /// Present only when every domain has data.
    pub business: Option<BusinessMetrics>,
    pub operational: OperationalStatus,
}

/// Builds the report for `state` as seen at `now`.
pub fn compute(
    state: &DashboardState,
    cache: &CacheStats,
    now: DateTime<Utc>,
) -> PerformanceReport {
    let total_modules = Domain::ALL.len();
    let loaded_modules = state.data.loaded_count();
    let success_rate = round_to(loaded_modules as f64 / total_modules as f64 * 100.0, 2);
    let errors = state.error_count();

    let time_since_last_update = state.last_updated.map(|at| {
        let elapsed = (now - at).num_milliseconds().max(0) as f64 / 1000.0;
        round_to(elapsed, 1)
    });

    let freshness = match time_since_last_update {
        Some(seconds) => format!("{:.1} sec ago", seconds),
        None => "No data yet".to_string(),
    };

    let integrity = loaded_modules > 0
        && Domain::ALL
            .iter()
            .filter_map(|d| state.data.is_populated(*d))
            .all(|populated| populated);

    let healthy = errors == 0 && success_rate == 100.0;

    PerformanceReport {
        system: SystemMetrics {
            total_modules,
            loaded_modules,
            success_rate,
            total_cache_hits: cache.hits,
            total_cache_misses: cache.misses,
            cache_hit_rate: cache.hit_rate,
            time_since_last_update,
        },
        data: DataQuality {
            freshness,
            integrity,
            errors,
        },
        business: business_metrics(state),
        operational: OperationalStatus {
            healthy,
            status: if healthy { STATUS_HEALTHY } else { STATUS_ISSUES }.to_string(),
            last_updated: state
                .last_updated
                .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        },
    }
}

fn business_metrics(state: &DashboardState) -> Option<BusinessMetrics> {
    let (sales, users, business) = (
        state.data.sales.as_ref()?,
        state.data.users.as_ref()?,
        state.data.business.as_ref()?,
    );

    let active = users.stats.active;
    let avg_revenue_per_user = if active == 0 {
        0.0
    } else {
        round_to(sales.total() / active as f64, 2)
    };

    let revenue = business.kpis.kpis.revenue;
    let kpi_deviation = (revenue.target != 0.0)
        .then(|| round_to((revenue.current - revenue.target) / revenue.target * 100.0, 2));

    Some(BusinessMetrics {
        avg_revenue_per_user,
        avg_growth: round_to(business.summary.average_growth, 2),
        kpi_deviation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::StateStore;
    use crate::sources::mock::sample_record;
    use chrono::Duration;

    fn stats(hits: u64, misses: u64, hit_rate: f64) -> CacheStats {
        CacheStats {
            size: 0,
            keys: Vec::new(),
            hits,
            misses,
            hit_rate,
        }
    }

    fn loaded_store(domains: &[Domain]) -> StateStore {
        let store = StateStore::new();
        for domain in domains {
            store.set_data(sample_record(*domain).unwrap());
        }
        store
    }

    #[test]
    fn empty_state_has_no_data_yet() {
        let store = StateStore::new();
        let report = compute(&store.state(), &stats(0, 0, 0.0), Utc::now());

        assert_eq!(report.system.loaded_modules, 0);
        assert_eq!(report.system.success_rate, 0.0);
        assert_eq!(report.system.time_since_last_update, None);
        assert_eq!(report.data.freshness, "No data yet");
        assert!(!report.data.integrity);
        assert_eq!(report.business, None);
        assert!(!report.operational.healthy);
        assert_eq!(report.operational.last_updated, "N/A");
    }

    #[test]
    fn all_domains_loaded_is_healthy() {
        let store = loaded_store(&Domain::ALL);
        let state = store.state();
        let now = state.last_updated.unwrap() + Duration::milliseconds(2_340);

        let report = compute(&state, &stats(3, 3, 0.5), now);

        assert_eq!(report.system.success_rate, 100.0);
        assert_eq!(report.system.time_since_last_update, Some(2.3));
        assert_eq!(report.data.freshness, "2.3 sec ago");
        assert!(report.data.integrity);
        assert_eq!(report.data.errors, 0);
        assert!(report.operational.healthy);
        assert_eq!(report.operational.status, STATUS_HEALTHY);
        assert_eq!(report.system.cache_hit_rate, 0.5);
    }

    #[test]
    fn a_single_error_is_not_healthy() {
        let store = loaded_store(&Domain::ALL);
        store.set_error(Domain::Users, "HTTP 503");

        let report = compute(&store.state(), &stats(0, 0, 0.0), Utc::now());

        assert_eq!(report.system.success_rate, 100.0);
        assert_eq!(report.data.errors, 1);
        assert!(!report.operational.healthy);
        assert_eq!(report.operational.status, STATUS_ISSUES);
    }

    #[test]
    fn partial_load_rate_and_no_business_section() {
        let store = loaded_store(&[Domain::Sales, Domain::Business]);
        let report = compute(&store.state(), &stats(0, 2, 0.0), Utc::now());

        assert_eq!(report.system.loaded_modules, 2);
        assert_eq!(report.system.success_rate, 66.67);
        assert!(report.data.integrity);
        assert_eq!(report.business, None);
        assert!(!report.operational.healthy);
    }

    #[test]
    fn business_metrics_from_reference_records() {
        let store = loaded_store(&Domain::ALL);
        let report = compute(&store.state(), &stats(0, 0, 0.0), Utc::now());
        let business = report.business.unwrap();

        // 15420 / 8940
        assert!((business.avg_revenue_per_user - 1.72).abs() < 1e-9);
        // (154200 - 160000) / 160000, rounded either side of -3.625
        assert!((business.kpi_deviation.unwrap() + 3.625).abs() < 0.01);
        assert!((business.avg_growth - 14.625).abs() < 0.01);
    }

    #[test]
    fn clock_skew_never_goes_negative() {
        let store = loaded_store(&[Domain::Sales]);
        let state = store.state();
        let before = state.last_updated.unwrap() - Duration::seconds(5);

        let report = compute(&state, &stats(0, 0, 0.0), before);

        assert_eq!(report.system.time_since_last_update, Some(0.0));
    }
}
