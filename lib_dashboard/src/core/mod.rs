//! # Core Engine Module
//!
//! The in-memory side of the dashboard. Every component here is built once at
//! startup and handed to the [`Dashboard`](dashboard::Dashboard) behind an
//! `Arc`; none of them is a global.
//!
//! ## Core Components:
//!
//! - **`observers`**: a synchronous subscriber list shared by the state store
//!   and the loading tracker.
//! - **`loading`**: counts named operations that are currently in flight.
//! - **`registry`**: in-flight requests keyed by id, with supersession.
//! - **`cache`**: key/value store with a fixed time-to-live and hit/miss stats.
//! - **`state`**: the observable `DashboardState`.
//! - **`dashboard`**: the orchestrator that wires the above to a data source.
//! - **`metrics`**: the derived performance/health report.
//!
//! Mutexes in these components guard plain data only. They are never held
//! across an `.await` and never while a listener runs.

/// Time-to-live cache with hit/miss accounting.
pub mod cache;
/// The orchestrator driving fetch, transform, cache and publish.
pub mod dashboard;
/// Named busy-operation tracker.
pub mod loading;
/// Performance and health report computed from a state snapshot.
pub mod metrics;
/// Synchronous, snapshot-based subscriber lists.
pub mod observers;
/// In-flight request registry with cancellation.
pub mod registry;
/// The observable dashboard state store.
pub mod state;

/// Rounds `value` to `decimals` places, half away from zero.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounding_matches_display_precision() {
        assert_eq!(round_to(200.0 / 3.0, 2), 66.67);
        assert_eq!(round_to(0.5, 2), 0.5);
        assert_eq!(round_to(12.34, 1), 12.3);
        assert_eq!(round_to(0.0, 2), 0.0);
    }
}
