//! Aggregation over fetched records.
//!
//! Everything here except [`get_species_stats`] is pure and synchronous: the
//! functions take records that were already fetched and never touch the
//! network. They also never fail. A record missing the field a function reads
//! is counted under that function's default bucket:
//!
//! | Function                      | Field                 | Default     |
//! |-------------------------------|-----------------------|-------------|
//! | [`threat_level_distribution`] | `threat_level`        | `"Unknown"` |
//! | [`habitat_distribution`]      | `habitat_description` | `"Other"`   |
//! | [`verification_distribution`] | `verification_status` | `"Unknown"` |
//! | [`monthly_reports`]           | `report_date`, then `created_at` | dropped |
//!
//! An empty string counts as missing.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::{
    Distribution, HabitatCategory, ListParams, Record, SpeciesStats, UNKNOWN, VerificationStatus,
    field_str, field_text,
};
use crate::request::ApiClient;

/// Number of calendar months covered by [`monthly_reports`].
pub const MONTHLY_WINDOW: u32 = 12;

/// Page size used when loading whole collections for statistics.
pub const STATS_FETCH_LIMIT: u32 = 1000;

/// Load all four collections and compute the dashboard headline numbers.
///
/// The four fetches run concurrently and have no ordering between them. If
/// any of them fails, the whole call fails.
///
/// # Arguments
///
/// * `client` - Tables API client
///
/// # Returns
///
/// A `SpeciesStats` with one count per collection (declared total, else the
/// number of records received), the active report count, and the records
/// themselves.
#[instrument(skip(client))]
pub async fn get_species_stats(client: &ApiClient) -> Result<SpeciesStats> {
    let params = ListParams::new().with("limit", STATS_FETCH_LIMIT);

    // Fan out; no fetch depends on another
    let species_client = client.species();
    let reports_client = client.reports();
    let locations_client = client.locations();
    let users_client = client.users();

    let (species, reports, locations, users) = tokio::try_join!(
        species_client.list(&params),
        reports_client.list(&params),
        locations_client.list(&params),
        users_client.list(&params),
    )?;

    // Pending and verified only
    let active_reports = reports
        .data()
        .iter()
        .filter(|report| is_active_report(report))
        .count() as u64;

    let stats = SpeciesStats {
        total_species: species.total(),
        total_reports: reports.total(),
        monitoring_sites: locations.total(),
        contributors: users.total(),
        active_reports,
        species: species.into_data(),
        reports: reports.into_data(),
        locations: locations.into_data(),
        users: users.into_data(),
    };

    info!(
        total_species = stats.total_species,
        total_reports = stats.total_reports,
        monitoring_sites = stats.monitoring_sites,
        contributors = stats.contributors,
        active_reports = stats.active_reports,
        "Species stats computed"
    );

    Ok(stats)
}

/// A report is active when its status is exactly `Pending` or `Verified`.
fn is_active_report(report: &Record) -> bool {
    field_str(report, "verification_status")
        .and_then(VerificationStatus::parse)
        .is_some_and(|status| status.is_active())
}

/// Count species by `threat_level`, in first-seen order.
pub fn threat_level_distribution(species: &[Record]) -> Distribution {
    let mut distribution = Distribution::new();
    for record in species {
        distribution.increment(field_text(record, "threat_level").unwrap_or(UNKNOWN));
    }
    distribution
}

/// Count reports by habitat category derived from `habitat_description`.
///
/// Only categories that occur are present, in first-seen order.
pub fn habitat_distribution(reports: &[Record]) -> Distribution {
    let mut distribution = Distribution::new();
    for report in reports {
        let category = HabitatCategory::classify(field_str(report, "habitat_description"));
        distribution.increment(category.label());
    }
    distribution
}

/// Count reports by `verification_status`, in first-seen order.
pub fn verification_distribution(reports: &[Record]) -> Distribution {
    let mut distribution = Distribution::new();
    for report in reports {
        distribution.increment(field_text(report, "verification_status").unwrap_or(UNKNOWN));
    }
    distribution
}

/// Count reports per month over the twelve calendar months ending with the
/// month of `now`.
///
/// Keys are `YYYY-MM`, oldest first, and all twelve are present even when
/// zero. A report is dated by `report_date`, falling back to `created_at`.
/// Reports outside the window, or with no readable date, are not counted.
///
/// # Arguments
///
/// * `reports` - Sighting reports to bucket
/// * `now` - Reference timestamp (typically current time)
///
/// # Returns
///
/// A `Distribution` with exactly twelve month keys.
pub fn monthly_reports(reports: &[Record], now: DateTime<Utc>) -> Distribution {
    // Seed the window oldest first so key order is chronological
    let current = month_index(now.year(), now.month());
    let mut distribution = Distribution::with_keys(
        (0..MONTHLY_WINDOW as i32)
            .rev()
            .map(|offset| month_key(current - offset)),
    );

    for report in reports {
        if let Some(date) = report_timestamp(report) {
            // Months outside the window have no key and are skipped
            distribution.increment_existing(&month_key(month_index(date.year(), date.month())));
        }
    }

    distribution
}

/// [`monthly_reports`] against the current clock.
pub fn monthly_reports_now(reports: &[Record]) -> Distribution {
    monthly_reports(reports, Utc::now())
}

/// Months since year zero, so that month arithmetic is plain subtraction.
fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

fn month_key(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

/// The date a report is filed under: `report_date` if readable, otherwise
/// `created_at`.
fn report_timestamp(report: &Record) -> Option<DateTime<Utc>> {
    report
        .get("report_date")
        .and_then(parse_timestamp)
        .or_else(|| report.get("created_at").and_then(parse_timestamp))
}

/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`
/// strings (read as UTC), and epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
