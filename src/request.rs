//! Request layer for the tables API.
//!
//! Every call made by the collection accessors goes through
//! [`ApiClient::request`], which:
//!
//! 1. Resolves the endpoint against the configured base URL
//! 2. Sets a JSON content type, letting caller headers override it
//! 3. Maps `204 No Content` to [`ApiResponse::Empty`] without decoding
//! 4. Turns any other non-2xx status into [`ApiError::RequestFailed`]
//! 5. Decodes the body into an object or an array
//!
//! Which shape a caller wants is decided per call: [`ApiClient::fetch_record`]
//! and [`ApiClient::send_record`] take any object as a record, and only
//! [`ApiClient::fetch_collection`] reads the `{ data, total }` envelope.
//!
//! Failures are logged before they are returned. Nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::model::{CollectionResponse, ListParams, Record, records_from_array};
use crate::transport::{HttpTransport, Method, RequestOptions, Transport};

/// Content type sent with every request.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The server answered `204 No Content`.
    Empty,
    /// A JSON object: a record, or a `{ data, total }` list envelope.
    Object(Record),
    /// A bare JSON array.
    Records(Vec<Record>),
}

impl ApiResponse {
    /// Sort a decoded body into object or array.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(ApiResponse::Object(object)),
            Value::Array(items) => Ok(ApiResponse::Records(records_from_array(items))),
            _ => Err(ApiError::UnexpectedShape {
                expected: "JSON object or array",
            }),
        }
    }

    /// The body as a single record.
    ///
    /// Any object qualifies, including one with its own `data` field.
    pub fn into_record(self) -> Result<Record> {
        match self {
            ApiResponse::Object(record) => Ok(record),
            _ => Err(ApiError::UnexpectedShape { expected: "record" }),
        }
    }

    /// The body as a list response.
    ///
    /// A bare array becomes [`CollectionResponse::Raw`]. An object is read as
    /// a paginated envelope (with no records if it lacks a `data` array), and
    /// an empty body as an empty list.
    pub fn into_collection(self) -> CollectionResponse {
        match self {
            ApiResponse::Records(records) => CollectionResponse::Raw(records),
            ApiResponse::Object(object) => CollectionResponse::from_object(object),
            ApiResponse::Empty => CollectionResponse::Raw(Vec::new()),
        }
    }
}

/// Serialize parameters as a URL-encoded query string, without the `?`.
pub fn build_query(params: &ListParams) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a query string to an endpoint. Empty parameters add nothing.
pub fn with_query(endpoint: &str, params: &ListParams) -> String {
    if params.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}?{}", endpoint, build_query(params))
    }
}

/// Start from the JSON content type and layer caller headers on top.
///
/// Header names compare case-insensitively, so a caller-supplied
/// `content-type` replaces the default rather than duplicating it.
fn merge_headers(caller: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())];

    for (name, value) in caller {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.clone(),
            None => headers.push((name.clone(), value.clone())),
        }
    }

    headers
}

/// Client for the tables API.
///
/// Cheap to clone; clones share the same transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl ApiClient {
    /// Create a client backed by an HTTP transport.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(&config.base_url, Arc::new(transport)))
    }

    /// Create a client over any transport (for testing).
    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint (which may carry a query string) against the base URL.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Send one request and decode the response.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Path relative to the base URL, optionally with a query string
    /// * `options` - Method, extra headers and optional JSON body
    ///
    /// # Returns
    ///
    /// [`ApiResponse::Empty`] for `204 No Content`, otherwise the decoded body.
    /// Non-2xx statuses return [`ApiError::RequestFailed`].
    #[instrument(skip(self, options), fields(method = options.method.as_str()))]
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        let url = self.url(endpoint);

        // Caller headers win over the JSON default
        let options = RequestOptions {
            headers: merge_headers(&options.headers),
            ..options
        };

        let response = match self.transport.call(&url, &options).await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, error = %e, "Transport call failed");
                return Err(e);
            }
        };

        // No body to decode
        if response.status == 204 {
            debug!(url = %url, "No content");
            return Ok(ApiResponse::Empty);
        }

        if !(200..=299).contains(&response.status) {
            error!(url = %url, status = response.status, "Request failed");
            return Err(ApiError::RequestFailed {
                status: response.status,
            });
        }

        let value = response.json().inspect_err(|e| {
            error!(url = %url, error = %e, "Failed to decode response body");
        })?;

        debug!(url = %url, status = response.status, "Request succeeded");
        ApiResponse::from_value(value)
    }

    /// GET a collection endpoint with optional query parameters.
    pub async fn fetch_collection(
        &self,
        endpoint: &str,
        params: &ListParams,
    ) -> Result<CollectionResponse> {
        let response = self
            .request(&with_query(endpoint, params), RequestOptions::new(Method::Get))
            .await?;

        Ok(response.into_collection())
    }

    /// GET a single record.
    pub async fn fetch_record(&self, endpoint: &str) -> Result<Record> {
        self.request(endpoint, RequestOptions::new(Method::Get))
            .await?
            .into_record()
    }

    /// Send a record with POST, PUT or PATCH and return the stored record.
    pub async fn send_record(&self, method: Method, endpoint: &str, body: Record) -> Result<Record> {
        let options = RequestOptions::new(method).with_body(Value::Object(body));

        self.request(endpoint, options).await?.into_record()
    }
}
