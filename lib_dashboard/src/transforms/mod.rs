//! # Transformation Pipeline
//!
//! Pure functions turning raw source payloads into the derived records the
//! dashboard publishes.
//!
//! - **`transformers`**: single-purpose building blocks (`enrich_products`,
//!   `calculate_metrics`, `prepare_chart_data`, `aggregate_regions`).
//! - **`pipeline`**: one entry point per domain combining its two payloads.
//! - **`records`**: the derived record types.

/// Per-domain processing entry points.
pub mod pipeline;
/// Derived record types.
pub mod records;
/// Pure transformation building blocks.
pub mod transformers;

pub use pipeline::{process_business_data, process_sales_data, process_user_data};
pub use transformers::TransformError;
