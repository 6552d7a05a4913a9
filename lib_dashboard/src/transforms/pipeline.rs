//! Per-domain composition of the transformers.

use crate::sources::payloads::{ActivityPoint, DailySales, Kpis, Product, RegionRecord, UserStats};
use crate::transforms::records::{
    BusinessRecord, BusinessSummary, SalesRecord, UserInsights, UserRecord,
};
use crate::transforms::transformers::{
    aggregate_regions, calculate_metrics, enrich_products, peak_activity, prepare_chart_data,
    TransformError,
};

pub fn process_sales_data(
    daily: DailySales,
    products: &[Product],
) -> Result<SalesRecord, TransformError> {
    let products = enrich_products(products, &daily)?;
    Ok(SalesRecord { daily, products })
}

pub fn process_user_data(
    stats: UserStats,
    activity: &[ActivityPoint],
) -> Result<UserRecord, TransformError> {
    if stats.total == 0 {
        return Err(TransformError::ZeroDenominator {
            metric: "engagement rate",
            denominator: "total users".to_string(),
        });
    }

    let insights = UserInsights {
        peak_hour: peak_activity(activity).cloned(),
        engagement_rate: (stats.active as f64 / stats.total as f64) * 100.0,
    };

    Ok(UserRecord {
        activity: prepare_chart_data(activity),
        insights,
        stats,
    })
}

pub fn process_business_data(
    kpis: &Kpis,
    regions: &[RegionRecord],
) -> Result<BusinessRecord, TransformError> {
    if regions.is_empty() {
        return Err(TransformError::EmptyInput {
            metric: "average regional growth",
            input: "regions",
        });
    }

    let aggregated = aggregate_regions(regions);
    let growth_sum: f64 = aggregated.regions.iter().map(|r| r.growth).sum();
    let summary = BusinessSummary {
        total_revenue: aggregated.total_revenue,
        average_growth: growth_sum / aggregated.regions.len() as f64,
    };

    Ok(BusinessRecord {
        kpis: calculate_metrics(kpis),
        regions: aggregated,
        summary,
    })
}
