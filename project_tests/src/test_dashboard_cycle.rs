//! # Dashboard Cycle Smoke Test
//!
//! Runs load cycles against the in-process mock source with its simulated
//! latencies and prints the resulting state and performance report.
//!
//! ```text
//! cargo run -p project_tests --bin test_dashboard_cycle -- --fail users.stats --cycles 2
//! ```

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use lib_dashboard::sources::mock::MockDataSource;
use lib_dashboard::{Dashboard, DashboardOptions, SourceId};

#[derive(Parser, Debug)]
#[clap(about = "Runs dashboard load cycles against the mock data source")]
struct Args {
    /// Source keys to fail, e.g. `users.stats`. Repeatable.
    #[clap(long = "fail")]
    fail: Vec<String>,

    /// Number of consecutive `load_all` cycles; every cycle after the first
    /// should be served from the cache.
    #[clap(long, default_value_t = 1)]
    cycles: u32,

    /// Finish with a `force_refresh`.
    #[clap(long)]
    force_refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut source = MockDataSource::new();
    for key in &args.fail {
        let id = SourceId::ALL
            .into_iter()
            .find(|s| s.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown source '{}'", key))?;
        source = source.with_failure(id);
    }

    let dashboard = Dashboard::with_source(Arc::new(source), DashboardOptions::default());
    let _sub = dashboard.loading().subscribe(|loading| {
        let active: Vec<_> = loading.iter().filter(|(_, a)| **a).map(|(k, _)| k.as_str()).collect();
        println!("    [loading] {:?}", active);
    });

    for cycle in 1..=args.cycles {
        let started = Instant::now();
        dashboard.load_all().await;
        println!("[*] Cycle {} finished in {:?}", cycle, started.elapsed());
    }

    if args.force_refresh {
        let started = Instant::now();
        dashboard.force_refresh().await;
        println!("[*] Forced refresh finished in {:?}", started.elapsed());
    }

    let state = dashboard.state().state();
    println!("\n[STATE]");
    println!("{}", serde_json::to_string_pretty(&*state)?);

    println!("\n[CACHE] {:?}", dashboard.cache().stats());

    println!("\n[METRICS]");
    println!("{}", serde_json::to_string_pretty(&dashboard.performance_metrics())?);

    if state.error_count() > 0 {
        eprintln!("\n[ERROR] {} domain(s) failed to load", state.error_count());
        std::process::exit(1);
    }
    Ok(())
}
