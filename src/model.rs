//! Data models for the invasive species tables API.
//!
//! Records are kept as loose JSON objects. The remote service owns the schema,
//! so the client never assumes a field is present: every reader in this crate
//! resolves a missing field to an explicit default instead of failing.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A single row of any collection, keyed by field name.
pub type Record = Map<String, Value>;

/// Default bucket for records without a usable categorical value.
pub const UNKNOWN: &str = "Unknown";

/// Read a string field, treating non-string values as absent.
pub fn field_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Read a string field, treating non-string and empty values as absent.
pub fn field_text<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    field_str(record, key).filter(|text| !text.is_empty())
}

/// Identifier assigned by the remote service.
///
/// Numeric identifiers are rendered as their decimal text so they can be used
/// in a path segment.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// The four collections exposed by the tables API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Species,
    Reports,
    Locations,
    Users,
}

impl Collection {
    /// Table name used in the endpoint path.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Species => "invasive_species",
            Collection::Reports => "sighting_reports",
            Collection::Locations => "monitoring_locations",
            Collection::Users => "users",
        }
    }

    /// Endpoint for the whole collection, e.g. `tables/users`.
    pub fn path(&self) -> String {
        format!("tables/{}", self.table())
    }

    /// Endpoint for one record, e.g. `tables/users/42`.
    pub fn record_path(&self, id: &str) -> String {
        format!("tables/{}/{}", self.table(), urlencoding::encode(id))
    }

    /// Whether `update` sends only the supplied fields (PATCH) or replaces
    /// the whole record (PUT).
    pub fn partial_update(&self) -> bool {
        matches!(self, Collection::Reports | Collection::Users)
    }
}

/// Open-ended filter, sort and pagination parameters for `list`.
///
/// Keys are passed through verbatim and keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams(Vec<(String, String)>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. A repeated key replaces the earlier value in place.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A list response, normalized from either shape the service may return.
///
/// Serializes back to the wire shape it came from: an object with `data` and
/// `total`, or a bare array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionResponse {
    /// `{ "data": [...], "total": n }`, where `total` may exceed `data.len()`.
    Paginated { data: Vec<Record>, total: u64 },
    /// A bare JSON array of records.
    Raw(Vec<Record>),
}

impl CollectionResponse {
    /// Normalize a paginated envelope.
    ///
    /// `total` falls back to the length of `data`, and `data` falls back to
    /// empty, so an object carrying neither counts as zero records.
    pub fn from_object(object: Record) -> Self {
        let data = match object.get("data") {
            Some(Value::Array(items)) => records_from_array(items.clone()),
            _ => Vec::new(),
        };
        let total = object
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(data.len() as u64);

        CollectionResponse::Paginated { data, total }
    }

    /// Records carried by this page.
    pub fn data(&self) -> &[Record] {
        match self {
            CollectionResponse::Paginated { data, .. } | CollectionResponse::Raw(data) => data,
        }
    }

    pub fn into_data(self) -> Vec<Record> {
        match self {
            CollectionResponse::Paginated { data, .. } | CollectionResponse::Raw(data) => data,
        }
    }

    /// Overall number of records: the declared total when present, otherwise
    /// the number of records in hand.
    pub fn total(&self) -> u64 {
        match self {
            CollectionResponse::Paginated { total, .. } => *total,
            CollectionResponse::Raw(data) => data.len() as u64,
        }
    }
}

/// Keep the object elements of a JSON array; anything else is not a record.
pub(crate) fn records_from_array(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

/// Review state of a sighting report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "Pending",
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Rejected => "Rejected",
        }
    }

    /// Parse the exact, case-sensitive wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(VerificationStatus::Pending),
            "Verified" => Some(VerificationStatus::Verified),
            "Rejected" => Some(VerificationStatus::Rejected),
            _ => None,
        }
    }

    /// Pending and verified reports count as active sightings.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Pending | VerificationStatus::Verified
        )
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse habitat category derived from a free-text habitat description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HabitatCategory {
    Forest,
    Wetland,
    Grassland,
    Coastal,
    Riparian,
    Urban,
    Agricultural,
    Other,
}

/// Keyword table in match priority order. The first category with a keyword
/// contained in the description wins.
const HABITAT_KEYWORDS: &[(HabitatCategory, &[&str])] = &[
    (HabitatCategory::Forest, &["forest"]),
    (HabitatCategory::Wetland, &["wetland", "pond", "marsh"]),
    (HabitatCategory::Grassland, &["grassland", "field"]),
    (HabitatCategory::Coastal, &["coastal", "dune"]),
    (HabitatCategory::Riparian, &["riparian", "stream", "river"]),
    (HabitatCategory::Urban, &["urban", "road", "parking"]),
    (
        HabitatCategory::Agricultural,
        &["agricultural", "crop", "farm"],
    ),
];

impl HabitatCategory {
    pub fn label(&self) -> &'static str {
        match self {
            HabitatCategory::Forest => "Forest",
            HabitatCategory::Wetland => "Wetland",
            HabitatCategory::Grassland => "Grassland",
            HabitatCategory::Coastal => "Coastal",
            HabitatCategory::Riparian => "Riparian",
            HabitatCategory::Urban => "Urban",
            HabitatCategory::Agricultural => "Agricultural",
            HabitatCategory::Other => "Other",
        }
    }

    /// Classify a habitat description. Missing text is `Other`.
    pub fn classify(description: Option<&str>) -> Self {
        let Some(description) = description else {
            return HabitatCategory::Other;
        };
        let text = description.to_lowercase();

        HABITAT_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
            .map(|(category, _)| *category)
            .unwrap_or(HabitatCategory::Other)
    }
}

/// Ordered category counts.
///
/// Keys keep the order in which they were first inserted, and serialize as a
/// JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    entries: Vec<(String, u64)>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// A distribution with a fixed key set, every count starting at zero.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keys.into_iter().map(|key| (key.into(), 0)).collect(),
        }
    }

    /// Count one occurrence, appending the key if it is new.
    pub fn increment(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    /// Count one occurrence only if the key already exists.
    ///
    /// Returns whether the occurrence was counted.
    pub fn increment_existing(&mut self, key: &str) -> bool {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.1 += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Headline numbers for the dashboard, with the records they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeciesStats {
    pub total_species: u64,
    pub total_reports: u64,
    pub monitoring_sites: u64,
    pub contributors: u64,

    /// Reports whose status is exactly `Pending` or `Verified`.
    pub active_reports: u64,

    pub species: Vec<Record>,
    pub reports: Vec<Record>,
    pub locations: Vec<Record>,
    pub users: Vec<Record>,
}
