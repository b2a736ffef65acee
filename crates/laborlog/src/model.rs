//! Record types for laborlog.
//!
//! These are the wire representations shared by the HTTP API, the storage
//! layer and the client hooks. Field names are camelCase on the wire.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A logged labor contraction.
///
/// A contraction without an end time is still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contraction {
    /// Identifier assigned by storage.
    pub id: i64,
    /// When the contraction started.
    pub start_time: DateTime<Utc>,
    /// When the contraction ended, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between start and end, computed by the server.
    pub duration_seconds: Option<i64>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Contraction {
    /// Check if this contraction has not been finished yet.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Payload for creating a contraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContraction {
    /// When the contraction started.
    pub start_time: DateTime<Utc>,
}

/// Payload for finishing a contraction.
///
/// Any duration sent alongside is ignored; the server derives it from the
/// stored start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishContraction {
    /// When the contraction ended.
    pub end_time: DateTime<Utc>,
}

/// A hospital contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Phone number to call.
    pub phone_number: String,
    /// Street address.
    pub address: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Whether this is the hospital to go to. At most one is.
    pub is_primary: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHospital {
    /// Display name, must not be empty.
    pub name: String,
    /// Phone number, must not be empty.
    pub phone_number: String,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Make this the primary hospital, demoting any other.
    #[serde(default)]
    pub is_primary: bool,
}

impl NewHospital {
    /// Create a payload with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            address: None,
            notes: None,
            is_primary: false,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name or phone number is empty.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_non_empty("phoneNumber", &self.phone_number)
    }

    /// Drop empty optional fields so they are stored as absent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.address = self.address.filter(|s| !s.is_empty());
        self.notes = self.notes.filter(|s| !s.is_empty());
        self
    }
}

/// Partial update for a hospital. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalPatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// New address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// New notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// New primary flag. `Some(true)` demotes every other hospital.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl HospitalPatch {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a present name or phone number is empty.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(phone) = &self.phone_number {
            require_non_empty("phoneNumber", phone)?;
        }
        Ok(())
    }

    /// Check if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
            && self.notes.is_none()
            && self.is_primary.is_none()
    }
}

/// Confirmation body returned by delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Human-readable confirmation.
    pub message: String,
}

impl Message {
    /// Create a confirmation message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Whole seconds from `start` to `end`, rounded toward negative infinity.
#[must_use]
pub fn whole_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let delta = end - start;
    let secs = delta.num_seconds();
    if delta < Duration::seconds(secs) {
        secs - 1
    } else {
        secs
    }
}

/// Whole minutes from `start` to `end`, rounded toward negative infinity.
#[must_use]
pub fn whole_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let delta = end - start;
    let mins = delta.num_minutes();
    if delta < Duration::minutes(mins) {
        mins - 1
    } else {
        mins
    }
}
