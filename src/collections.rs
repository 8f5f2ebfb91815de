//! CRUD accessors for the four collections.
//!
//! One [`CollectionClient`] serves every collection; what differs between
//! them (table name, PUT vs PATCH on update, fields stamped on create) is
//! decided by [`Collection`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::{Collection, CollectionResponse, ListParams, Record, VerificationStatus};
use crate::request::ApiClient;
use crate::transport::{Method, RequestOptions};

/// Page size used by [`ApiClient::search_species`].
pub const SPECIES_SEARCH_LIMIT: u32 = 20;

/// Page size used by [`ApiClient::get_reports_by_threat_level`].
pub const THREAT_LEVEL_REPORT_LIMIT: u32 = 100;

/// Default page size for [`ApiClient::get_recent_reports`].
pub const DEFAULT_RECENT_REPORTS: u32 = 10;

/// Render a timestamp the way the tables API stores them,
/// e.g. `2024-05-01T09:30:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the record actually sent on create.
///
/// Returns a new record; `data` is left untouched.
///
/// - Sighting reports get `report_date` set to `now`
/// - Users get `registration_date` and `last_login` set to `now`, and start
///   with zero submitted and verified reports and an active status
/// - Species and locations are sent as given
pub fn prepare_create(collection: Collection, data: &Record, now: DateTime<Utc>) -> Record {
    let mut record = data.clone();
    let stamp = Value::String(iso_timestamp(now));

    match collection {
        Collection::Reports => {
            record.insert("report_date".into(), stamp);
        }
        Collection::Users => {
            record.insert("registration_date".into(), stamp.clone());
            record.insert("last_login".into(), stamp);
            record.insert("reports_submitted".into(), json!(0));
            record.insert("reports_verified".into(), json!(0));
            record.insert("active_status".into(), json!(true));
        }
        Collection::Species | Collection::Locations => {}
    }

    record
}

/// CRUD facade over one collection.
#[derive(Clone)]
pub struct CollectionClient {
    client: ApiClient,
    collection: Collection,
}

impl CollectionClient {
    pub fn new(client: ApiClient, collection: Collection) -> Self {
        Self { client, collection }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// List records. Parameters are passed through verbatim.
    #[instrument(skip(self, params), fields(table = self.collection.table()))]
    pub async fn list(&self, params: &ListParams) -> Result<CollectionResponse> {
        self.client
            .fetch_collection(&self.collection.path(), params)
            .await
    }

    /// Fetch one record by identifier.
    #[instrument(skip(self), fields(table = self.collection.table()))]
    pub async fn get_by_id(&self, id: &str) -> Result<Record> {
        self.client
            .fetch_record(&self.collection.record_path(id))
            .await
    }

    /// Create a record, applying this collection's creation defaults.
    #[instrument(skip(self, data), fields(table = self.collection.table()))]
    pub async fn create(&self, data: &Record) -> Result<Record> {
        let body = prepare_create(self.collection, data, Utc::now());
        let created = self
            .client
            .send_record(Method::Post, &self.collection.path(), body)
            .await?;

        info!(table = self.collection.table(), "Record created");
        Ok(created)
    }

    /// Update a record.
    ///
    /// Reports and users are patched (only supplied fields change); species
    /// and locations are replaced wholesale.
    #[instrument(skip(self, data), fields(table = self.collection.table()))]
    pub async fn update(&self, id: &str, data: &Record) -> Result<Record> {
        let method = if self.collection.partial_update() {
            Method::Patch
        } else {
            Method::Put
        };

        self.client
            .send_record(method, &self.collection.record_path(id), data.clone())
            .await
    }

    /// Delete a record.
    #[instrument(skip(self), fields(table = self.collection.table()))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .request(
                &self.collection.record_path(id),
                RequestOptions::new(Method::Delete),
            )
            .await?;

        info!(table = self.collection.table(), "Record deleted");
        Ok(())
    }
}

impl ApiClient {
    pub fn species(&self) -> CollectionClient {
        CollectionClient::new(self.clone(), Collection::Species)
    }

    pub fn reports(&self) -> CollectionClient {
        CollectionClient::new(self.clone(), Collection::Reports)
    }

    pub fn locations(&self) -> CollectionClient {
        CollectionClient::new(self.clone(), Collection::Locations)
    }

    pub fn users(&self) -> CollectionClient {
        CollectionClient::new(self.clone(), Collection::Users)
    }

    /// Record a review decision on a sighting report.
    pub async fn verify_report(
        &self,
        id: &str,
        verifier_name: &str,
        status: VerificationStatus,
    ) -> Result<Record> {
        let mut changes = Record::new();
        changes.insert("verification_status".into(), json!(status.as_str()));
        changes.insert("verified_by".into(), json!(verifier_name));

        self.reports().update(id, &changes).await
    }

    /// Free-text species search, first 20 matches.
    pub async fn search_species(&self, query: &str) -> Result<CollectionResponse> {
        let params = ListParams::new()
            .with("search", query)
            .with("limit", SPECIES_SEARCH_LIMIT);

        self.species().list(&params).await
    }

    /// Reports matching a threat level, up to 100.
    pub async fn get_reports_by_threat_level(&self, level: &str) -> Result<CollectionResponse> {
        let params = ListParams::new()
            .with("search", level)
            .with("limit", THREAT_LEVEL_REPORT_LIMIT);

        self.reports().list(&params).await
    }

    /// Most recent reports, sorted by creation time.
    ///
    /// `None` uses [`DEFAULT_RECENT_REPORTS`].
    pub async fn get_recent_reports(&self, limit: Option<u32>) -> Result<CollectionResponse> {
        let params = ListParams::new()
            .with("limit", limit.unwrap_or(DEFAULT_RECENT_REPORTS))
            .with("sort", "created_at");

        self.reports().list(&params).await
    }
}
