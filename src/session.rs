//! Current-user session.
//!
//! Login here is a lookup-or-provision flow against the users collection, not
//! a security check: no password or token is involved. The session lives in
//! memory only and is owned by whoever created it; components that need the
//! current user take a `&Session`.

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::collections::iso_timestamp;
use crate::error::{ApiError, Result};
use crate::model::{ListParams, Record, record_id};
use crate::request::ApiClient;

/// Placeholder for profile fields the user has not filled in.
const NOT_SPECIFIED: &str = "Not specified";

/// Expertise assigned to newly provisioned users.
const DEFAULT_EXPERTISE: &str = "Beginner";

/// The part of an email address before the first `@`.
pub fn username_from_email(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Profile sent when a login email matches no existing user.
///
/// Creation timestamps and counters are added by the users accessor.
pub fn new_user_profile(email: &str, name: &str, user_type: &str) -> Record {
    let mut profile = Record::new();
    profile.insert("username".into(), json!(username_from_email(email)));
    profile.insert("email".into(), json!(email));
    profile.insert("full_name".into(), json!(name));
    profile.insert("user_type".into(), json!(user_type));
    profile.insert("organization".into(), json!(NOT_SPECIFIED));
    profile.insert("location".into(), json!(NOT_SPECIFIED));
    profile.insert("expertise_level".into(), json!(DEFAULT_EXPERTISE));
    profile.insert("specialization".into(), Value::Array(Vec::new()));
    profile.insert("verified_identifier".into(), json!(false));
    profile
}

/// Holder of the currently authenticated user.
///
/// Each login overwrites the held record; concurrent logins end with whichever
/// finished last.
#[derive(Debug, Default)]
pub struct Session {
    current: RwLock<Option<Record>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in by email, provisioning a user record on first sight.
    ///
    /// An existing user only has `last_login` refreshed. Any failure along
    /// the way is logged and returned, and the session is left unchanged.
    ///
    /// # Arguments
    ///
    /// * `client` - Tables API client
    /// * `email` - Login email, also used as the users search term
    /// * `name` - Full name for a newly provisioned user
    /// * `user_type` - Role for a newly provisioned user
    ///
    /// # Returns
    ///
    /// The user record now held by the session.
    #[instrument(skip_all, fields(user_type = user_type))]
    pub async fn authenticate_user(
        &self,
        client: &ApiClient,
        email: &str,
        name: &str,
        user_type: &str,
    ) -> Result<Record> {
        let user = self
            .lookup_or_provision(client, email, name, user_type)
            .await
            .inspect_err(|e| error!(error = %e, "Authentication failed"))?;

        *self.current.write() = Some(user.clone());
        Ok(user)
    }

    async fn lookup_or_provision(
        &self,
        client: &ApiClient,
        email: &str,
        name: &str,
        user_type: &str,
    ) -> Result<Record> {
        let params = ListParams::new().with("search", email).with("limit", 1);
        let existing = client.users().list(&params).await?.into_data().into_iter().next();

        match existing {
            // Known user: refresh last_login only
            Some(user) => {
                let id = record_id(&user).ok_or(ApiError::UnexpectedShape {
                    expected: "user record with an id",
                })?;

                let mut changes = Record::new();
                changes.insert("last_login".into(), json!(iso_timestamp(Utc::now())));

                let updated = client.users().update(&id, &changes).await?;
                info!(user_id = %id, "Existing user logged in");
                Ok(updated)
            }
            None => {
                let profile = new_user_profile(email, name, user_type);
                let created = client.users().create(&profile).await?;
                info!(
                    user_id = record_id(&created).as_deref().unwrap_or("unassigned"),
                    "New user provisioned"
                );
                Ok(created)
            }
        }
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<Record> {
        self.current.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn logout(&self) {
        *self.current.write() = None;
        info!("User logged out");
    }
}
