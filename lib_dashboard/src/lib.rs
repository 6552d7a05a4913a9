//! # lib_dashboard
//!
//! Client-side orchestration for the sales/users/business dashboard: resilient
//! fetching, a TTL cache, pure transformations into derived metrics and an
//! observable state store that presentation layers subscribe to.
//!
//! The HTTP client lives behind the `retrieve` feature; everything else is
//! always compiled.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Cache, state, registries and the orchestrating `Dashboard`.
pub mod core;
/// Retry/timeout discipline and the HTTP client.
pub mod retrieve;
/// The data-source interface, raw payload models and the bundled sources.
pub mod sources;
/// Pure transformations from raw payloads to derived records.
pub mod transforms;

// --- Public API Re-exports ---
pub use crate::core::cache::{CacheStats, TtlCache};
pub use crate::core::dashboard::{Dashboard, DashboardOptions, LoadError};
pub use crate::core::loading::LoadingTracker;
pub use crate::core::metrics::PerformanceReport;
pub use crate::core::observers::Subscription;
pub use crate::core::registry::RequestRegistry;
pub use crate::core::state::{DashboardState, Domain, StateSnapshot, StateStore};
pub use retrieve::resilient::{fetch_with_retry, FetchError, RetryPolicy, TransportError};
pub use sources::{DataSource, SourceId};
pub use transforms::records::DomainRecord;
