//! # Mock Data Source
//!
//! Serves the reference payloads of every source after a fixed, per-source
//! latency. Individual sources can be made to fail, which is how demos and
//! tests exercise the per-domain error path.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::core::state::Domain;
use crate::retrieve::resilient::TransportError;
use crate::sources::payloads::{
    ActivityPoint, DailySales, KpiMetric, Kpis, Product, RegionRecord, UserStats,
};
use crate::sources::{DataSource, SourceId};
use crate::transforms::pipeline::{process_business_data, process_sales_data, process_user_data};
use crate::transforms::records::DomainRecord;
use crate::transforms::transformers::TransformError;

#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    failing: HashSet<SourceId>,
    instant: bool,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call to `source` fail with a transport error.
    pub fn with_failure(mut self, source: SourceId) -> Self {
        self.failing.insert(source);
        self
    }

    /// Skips the simulated latency.
    pub fn without_latency(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn latency(source: SourceId) -> Duration {
        let millis = match source {
            SourceId::DailySales => 600,
            SourceId::TopProducts => 800,
            SourceId::UserStats => 700,
            SourceId::UserActivity => 500,
            SourceId::Kpis => 900,
            SourceId::RegionalData => 750,
        };
        Duration::from_millis(millis)
    }

    pub fn payload(source: SourceId) -> Value {
        let encoded = match source {
            SourceId::DailySales => serde_json::to_value(daily_sales()),
            SourceId::TopProducts => serde_json::to_value(top_products()),
            SourceId::UserStats => serde_json::to_value(user_stats()),
            SourceId::UserActivity => serde_json::to_value(user_activity()),
            SourceId::Kpis => serde_json::to_value(kpis()),
            SourceId::RegionalData => serde_json::to_value(regional_data()),
        };
        // Plain structs with string keys always encode.
        encoded.unwrap_or(Value::Null)
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch(&self, source: SourceId) -> Result<Value, TransportError> {
        if !self.instant {
            tokio::time::sleep(Self::latency(source)).await;
        }
        if self.failing.contains(&source) {
            return Err(TransportError::Source(format!("{} unavailable", source)));
        }
        Ok(Self::payload(source))
    }
}

pub fn daily_sales() -> DailySales {
    DailySales {
        date: Utc::now().format("%Y-%m-%d").to_string(),
        total: 15420.0,
        transactions: 89,
        average: 173.26,
        growth: 12.4,
    }
}

pub fn top_products() -> Vec<Product> {
    let product = |id, name: &str, sales, units, growth| Product {
        id,
        name: name.to_string(),
        sales,
        units,
        growth,
    };
    vec![
        product(1, "Laptop Pro", 5420.0, 32, 8.2),
        product(2, "Smartphone X", 4870.0, 54, 15.7),
        product(3, "Tablet Mini", 3210.0, 28, -2.1),
        product(4, "Headphones", 2980.0, 67, 22.4),
        product(5, "Smart Watch", 2450.0, 19, 5.8),
    ]
}

pub fn user_stats() -> UserStats {
    UserStats {
        total: 12540,
        active: 8940,
        new_today: 124,
        churn_rate: 2.4,
        satisfaction: 4.3,
    }
}

pub fn user_activity() -> Vec<ActivityPoint> {
    [
        ("00:00", 450),
        ("04:00", 230),
        ("08:00", 1240),
        ("12:00", 2870),
        ("16:00", 3520),
        ("20:00", 2140),
    ]
    .into_iter()
    .map(|(hour, active)| ActivityPoint {
        hour: hour.to_string(),
        active,
    })
    .collect()
}

pub fn kpis() -> Kpis {
    let metric = |current, target, growth| KpiMetric {
        current,
        target,
        growth,
    };
    Kpis {
        revenue: metric(154200.0, 160000.0, 8.4),
        conversion: metric(3.2, 3.5, -2.1),
        retention: metric(78.4, 80.0, 1.2),
        acquisition: metric(1240.0, 1500.0, 15.7),
    }
}

pub fn regional_data() -> Vec<RegionRecord> {
    let region = |name: &str, revenue, growth, market_share| RegionRecord {
        region: name.to_string(),
        revenue,
        growth,
        market_share,
    };
    vec![
        region("North America", 65420.0, 12.4, 42.0),
        region("Europe", 48750.0, 8.7, 32.0),
        region("Asia Pacific", 29840.0, 22.1, 19.0),
        region("Latin America", 10290.0, 15.3, 7.0),
    ]
}

/// The record the pipeline derives from the reference payloads of `domain`.
pub fn sample_record(domain: Domain) -> Result<DomainRecord, TransformError> {
    match domain {
        Domain::Sales => {
            process_sales_data(daily_sales(), &top_products()).map(DomainRecord::Sales)
        }
        Domain::Users => {
            process_user_data(user_stats(), &user_activity()).map(DomainRecord::Users)
        }
        Domain::Business => {
            process_business_data(&kpis(), &regional_data()).map(DomainRecord::Business)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn serves_payload_after_latency() {
        let source = MockDataSource::new();
        let started = Instant::now();

        let value = source.fetch(SourceId::UserStats).await.unwrap();

        assert_eq!(value["active"], 8940);
        assert!(started.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test]
    async fn injected_failure_is_a_transport_error() {
        let source = MockDataSource::new()
            .without_latency()
            .with_failure(SourceId::Kpis);

        let err = source.fetch(SourceId::Kpis).await.unwrap_err();
        assert_eq!(err, TransportError::Source("business.kpis unavailable".into()));
        assert!(source.fetch(SourceId::RegionalData).await.is_ok());
    }

    #[test]
    fn payloads_use_wire_field_names() {
        let stats = MockDataSource::payload(SourceId::UserStats);
        assert_eq!(stats["newToday"], 124);
        let regions = MockDataSource::payload(SourceId::RegionalData);
        assert_eq!(regions[0]["marketShare"], 42.0);
    }

    #[test]
    fn sample_records_match_their_domain() {
        for domain in Domain::ALL {
            let record = sample_record(domain).unwrap();
            assert_eq!(record.domain(), domain);
            assert!(record.is_populated());
        }
    }
}
