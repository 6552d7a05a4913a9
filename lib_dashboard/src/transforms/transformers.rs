//! Pure building blocks of the pipeline. No I/O, no clocks, no shared state:
//! the same input always yields the same output, bit for bit.
//!
//! Ratios are guarded instead of producing `NaN`/`inf`: a zero denominator is
//! reported as [`TransformError::ZeroDenominator`].

use thiserror::Error;

use crate::sources::payloads::{ActivityPoint, DailySales, Kpis, Product, RegionRecord};
use crate::transforms::records::{
    ChartData, ChartDataset, DerivedKpis, EnrichedKpis, EnrichedProduct, Performance,
    RegionAggregate,
};

pub const ACTIVITY_LABEL: &str = "Active Users";
pub const ACTIVITY_BORDER_COLOR: &str = "#3b82f6";
pub const ACTIVITY_BACKGROUND_COLOR: &str = "rgba(59, 130, 246, 0.1)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("cannot compute {metric}: {denominator} is zero")]
    ZeroDenominator {
        metric: &'static str,
        denominator: String,
    },
    #[error("cannot compute {metric}: no {input} supplied")]
    EmptyInput {
        metric: &'static str,
        input: &'static str,
    },
}

pub fn performance_for(growth: f64) -> Performance {
    if growth > 10.0 {
        Performance::High
    } else if growth > 0.0 {
        Performance::Medium
    } else {
        Performance::Low
    }
}

/// Annotates each product with revenue per unit, a performance bucket and its
/// contribution to the day's total sales.
pub fn enrich_products(
    products: &[Product],
    daily: &DailySales,
) -> Result<Vec<EnrichedProduct>, TransformError> {
    products
        .iter()
        .map(|product| {
            if product.units == 0 {
                return Err(TransformError::ZeroDenominator {
                    metric: "revenue per unit",
                    denominator: format!("units of product '{}'", product.name),
                });
            }
            if daily.total == 0.0 {
                return Err(TransformError::ZeroDenominator {
                    metric: "contribution",
                    denominator: "daily sales total".to_string(),
                });
            }

            Ok(EnrichedProduct {
                revenue_per_unit: product.sales / product.units as f64,
                performance: performance_for(product.growth),
                contribution: (product.sales / daily.total) * 100.0,
                product: product.clone(),
            })
        })
        .collect()
}

/// Adds conversion value and the mean growth of revenue, conversion and
/// retention.
pub fn calculate_metrics(kpis: &Kpis) -> EnrichedKpis {
    EnrichedKpis {
        derived: DerivedKpis {
            conversion_value: kpis.revenue.current * kpis.conversion.current / 100.0,
            growth_score: (kpis.revenue.growth + kpis.conversion.growth + kpis.retention.growth)
                / 3.0,
        },
        kpis: kpis.clone(),
    }
}

pub fn prepare_chart_data(activity: &[ActivityPoint]) -> ChartData {
    ChartData {
        labels: activity.iter().map(|point| point.hour.clone()).collect(),
        datasets: vec![ChartDataset {
            label: ACTIVITY_LABEL.to_string(),
            data: activity.iter().map(|point| point.active).collect(),
            border_color: ACTIVITY_BORDER_COLOR.to_string(),
            background_color: ACTIVITY_BACKGROUND_COLOR.to_string(),
        }],
    }
}

/// Sums revenue and growth in input order.
pub fn aggregate_regions(regions: &[RegionRecord]) -> RegionAggregate {
    regions.iter().fold(
        RegionAggregate {
            total_revenue: 0.0,
            total_growth: 0.0,
            regions: Vec::with_capacity(regions.len()),
        },
        |mut acc, region| {
            acc.total_revenue += region.revenue;
            acc.total_growth += region.growth;
            acc.regions.push(region.clone());
            acc
        },
    )
}

/// First bucket with the highest active count.
pub fn peak_activity(activity: &[ActivityPoint]) -> Option<&ActivityPoint> {
    activity.iter().fold(None, |peak: Option<&ActivityPoint>, current| match peak {
        Some(best) if current.active <= best.active => Some(best),
        _ => Some(current),
    })
}
