//! # Data Retrieval Module
//!
//! Everything that touches the network boundary lives here.
//!
//! ## Contained Modules:
//!
//! - **`resilient`**: the retry/timeout/cancellation loop shared by every
//!   fetch, together with the `TransportError` / `FetchError` taxonomy.
//! - **`ky_http`** (feature `retrieve`): a `reqwest` based `ApiClient` that
//!   routes each call through `resilient`, tracks it in a `LoadingTracker`
//!   and can supersede requests through a `RequestRegistry`.

/// Bounded retries with linear backoff and a hard per-attempt timeout.
pub mod resilient;

/// Generic HTTP API client built on the resilient fetch loop.
#[cfg(feature = "retrieve")]
pub mod ky_http;
