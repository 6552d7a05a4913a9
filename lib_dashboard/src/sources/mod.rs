//! # Data Sources Module
//!
//! The only network boundary of the dashboard. Each domain is fed by two
//! sources; the core sees them through the [`DataSource`] trait and treats the
//! returned JSON as opaque until the orchestrator decodes it into the models in
//! [`payloads`].
//!
//! ## Contained Modules:
//!
//! - **`payloads`**: serde models of the raw source payloads.
//! - **`mock`**: an in-process source with fixed payloads and simulated latency.
//! - **`http`** (feature `retrieve`): maps every source to an endpoint of an
//!   [`ApiClient`](crate::retrieve::ky_http::ApiClient).

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::state::Domain;
use crate::retrieve::resilient::TransportError;

/// HTTP-backed data source.
#[cfg(feature = "retrieve")]
pub mod http;
/// In-process data source with the reference payloads.
pub mod mock;
/// Raw payload models.
pub mod payloads;

/// One logical remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    DailySales,
    TopProducts,
    UserStats,
    UserActivity,
    Kpis,
    RegionalData,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::DailySales,
        SourceId::TopProducts,
        SourceId::UserStats,
        SourceId::UserActivity,
        SourceId::Kpis,
        SourceId::RegionalData,
    ];

    /// Stable key, also used as the request-registry id and loading key.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::DailySales => "sales.daily",
            SourceId::TopProducts => "sales.top-products",
            SourceId::UserStats => "users.stats",
            SourceId::UserActivity => "users.activity",
            SourceId::Kpis => "business.kpis",
            SourceId::RegionalData => "business.regions",
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            SourceId::DailySales | SourceId::TopProducts => Domain::Sales,
            SourceId::UserStats | SourceId::UserActivity => Domain::Users,
            SourceId::Kpis | SourceId::RegionalData => Domain::Business,
        }
    }

    /// The two sources a domain load needs, in pipeline argument order.
    pub fn for_domain(domain: Domain) -> [SourceId; 2] {
        match domain {
            Domain::Sales => [SourceId::DailySales, SourceId::TopProducts],
            Domain::Users => [SourceId::UserStats, SourceId::UserActivity],
            Domain::Business => [SourceId::Kpis, SourceId::RegionalData],
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous provider of raw payloads.
///
/// One call is one attempt; retries, timeouts and cancellation are applied by
/// the caller. Implementations must be cancel-safe: the returned future may be
/// dropped at any suspension point.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, source: SourceId) -> Result<Value, TransportError>;
}
