//! Invasive Tracker - dashboard snapshot.
//!
//! Fetches every collection from the tables API, computes the dashboard
//! statistics and prints them as JSON on stdout. Logs go to stderr.
//!
//! # Environment
//!
//! - `INVASIVE_API_BASE_URL` - Base URL of the tables API
//! - `INVASIVE_API_TIMEOUT_SECS` - Per-request timeout in seconds
//! - `RUST_LOG` - Log filter (default `invasive_tracker=info`)

use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use invasive_tracker::{
    ApiClient, ClientConfig, get_species_stats, habitat_distribution, monthly_reports_now,
    threat_level_distribution, verification_distribution,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("invasive_tracker=info".parse()?))
        .init();

    let config = ClientConfig::from_env();
    info!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "Loading dashboard");

    let client = ApiClient::new(&config)?;
    let stats = get_species_stats(&client).await?;

    let snapshot = json!({
        "total_species": stats.total_species,
        "total_reports": stats.total_reports,
        "monitoring_sites": stats.monitoring_sites,
        "contributors": stats.contributors,
        "active_reports": stats.active_reports,
        "threat_levels": threat_level_distribution(&stats.species),
        "habitats": habitat_distribution(&stats.reports),
        "verification": verification_distribution(&stats.reports),
        "monthly_reports": monthly_reports_now(&stats.reports),
    });

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
