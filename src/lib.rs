//! Invasive Tracker - client access layer for an invasive species sighting service.
//!
//! # Overview
//!
//! The remote service exposes four tables: invasive species, sighting
//! reports, monitoring locations and users. This crate wraps them in typed
//! CRUD accessors and computes dashboard statistics from the records it
//! fetches.
//!
//! ```ignore
//! let client = ApiClient::new(&ClientConfig::from_env())?;
//! let stats = get_species_stats(&client).await?;
//! let habitats = habitat_distribution(&stats.reports);
//! ```
//!
//! # Modules
//!
//! - [`config`]: Base URL and timeout, read from the environment
//! - [`transport`]: The HTTP boundary, behind a trait
//! - [`request`]: Endpoint building, status handling and response shapes
//! - [`collections`]: Per-collection CRUD and query helpers
//! - [`aggregation`]: Distributions and time series over fetched records
//! - [`session`]: Lookup-or-provision login and the current user
//! - [`model`]: Records, list responses and derived categories
//! - [`error`]: Error type shared by all network operations

pub mod aggregation;
pub mod collections;
pub mod config;
pub mod error;
pub mod model;
pub mod request;
pub mod session;
pub mod transport;

pub use aggregation::{
    get_species_stats, habitat_distribution, monthly_reports, monthly_reports_now,
    threat_level_distribution, verification_distribution,
};
pub use collections::CollectionClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use model::{
    Collection, CollectionResponse, Distribution, HabitatCategory, ListParams, Record,
    SpeciesStats, VerificationStatus,
};
pub use request::{ApiClient, ApiResponse};
pub use session::Session;
pub use transport::{HttpTransport, Method, RequestOptions, Transport, TransportResponse};
