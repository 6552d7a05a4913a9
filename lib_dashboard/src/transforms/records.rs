//! Derived records produced by the pipeline. They are rebuilt on every run and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::core::state::Domain;
use crate::sources::payloads::{ActivityPoint, DailySales, Kpis, Product, RegionRecord, UserStats};

/// Growth bucket of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Performance {
    /// growth > 10
    High,
    /// 0 < growth ≤ 10
    Medium,
    /// growth ≤ 0
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub revenue_per_unit: f64,
    pub performance: Performance,
    /// Share of the day's total sales, in percent.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRecord {
    pub daily: DailySales,
    pub products: Vec<EnrichedProduct>,
}

impl SalesRecord {
    pub fn total(&self) -> f64 {
        self.daily.total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub border_color: String,
    pub background_color: String,
}

/// Chart-ready series: one label per bucket, datasets aligned with the labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInsights {
    /// Busiest bucket; `None` when no activity was reported.
    pub peak_hour: Option<ActivityPoint>,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub stats: UserStats,
    pub activity: ChartData,
    pub insights: UserInsights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKpis {
    pub conversion_value: f64,
    pub growth_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedKpis {
    #[serde(flatten)]
    pub kpis: Kpis,
    pub derived: DerivedKpis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionAggregate {
    pub total_revenue: f64,
    pub total_growth: f64,
    pub regions: Vec<RegionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub total_revenue: f64,
    pub average_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub kpis: EnrichedKpis,
    pub regions: RegionAggregate,
    pub summary: BusinessSummary,
}

/// The record of any one domain, as cached and published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "record", rename_all = "lowercase")]
pub enum DomainRecord {
    Sales(SalesRecord),
    Users(UserRecord),
    Business(BusinessRecord),
}

impl DomainRecord {
    pub fn domain(&self) -> Domain {
        match self {
            DomainRecord::Sales(_) => Domain::Sales,
            DomainRecord::Users(_) => Domain::Users,
            DomainRecord::Business(_) => Domain::Business,
        }
    }

    /// Whether the record carries any rows worth showing.
    pub fn is_populated(&self) -> bool {
        match self {
            DomainRecord::Sales(sales) => !sales.products.is_empty(),
            DomainRecord::Users(users) => !users.activity.labels.is_empty(),
            DomainRecord::Business(business) => !business.regions.regions.is_empty(),
        }
    }
}
