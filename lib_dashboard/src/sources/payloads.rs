//! Raw payload models, exactly as the data sources return them (camelCase JSON).

use serde::{Deserialize, Serialize};

/// Daily sales summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    /// ISO date (`YYYY-MM-DD`).
    pub date: String,
    pub total: f64,
    pub transactions: u64,
    pub average: f64,
    pub growth: f64,
}

/// One entry of the top-products list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub sales: f64,
    pub units: u64,
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub new_today: u64,
    pub churn_rate: f64,
    pub satisfaction: f64,
}

/// Active users in one time bucket (`hour` is a label such as `"16:00"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPoint {
    pub hour: String,
    pub active: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMetric {
    pub current: f64,
    pub target: f64,
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub revenue: KpiMetric,
    pub conversion: KpiMetric,
    pub retention: KpiMetric,
    pub acquisition: KpiMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    pub region: String,
    pub revenue: f64,
    pub growth: f64,
    pub market_share: f64,
}
