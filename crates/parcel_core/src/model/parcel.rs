//! Parcel domain model.
//!
//! # Responsibility
//! - Define the canonical parcel record mapped to the `parcel` table.
//! - Map status values to and from their stored text form.
//!
//! # Invariants
//! - `number` is assigned by storage and never reused.
//! - `client` and `created_at` never change after creation.
//! - `address` may change only while `status == ParcelStatus::Registered`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Server-assigned parcel identifier (`parcel.number`).
pub type ParcelNumber = i64;

/// Owning client identifier (`parcel.client`).
pub type ClientId = i64;

/// Parcel lifecycle status.
///
/// Only `Registered` gates behavior. Any other value may be stored, so
/// unknown text is preserved in `Other` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    /// Accepted but not yet handed over; address edits and delete allowed.
    Registered,
    /// Handed over to the carrier.
    Sent,
    /// Received by the addressee.
    Delivered,
    /// Any status text outside the known set.
    ///
    /// Build statuses through `From<&str>` / `From<String>` so known text
    /// maps to its named variant. An `Other` holding known text is still
    /// treated as that status by `as_str` and `is_registered`.
    Other(String),
}

impl ParcelStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Whether the stored text is `registered`, however the value was built.
    pub fn is_registered(&self) -> bool {
        self.as_str() == Self::Registered.as_str()
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        match value {
            "registered" => Self::Registered,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "registered" | "sent" | "delivered" => Self::from(value.as_str()),
            _ => Self::Other(value),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(value: ParcelStatus) -> Self {
        match value {
            ParcelStatus::Other(text) => text,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical parcel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Primary key. `0` until the parcel has been persisted.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    pub address: String,
    /// RFC3339 timestamp text, stored verbatim.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved parcel stamped with the current UTC time.
    ///
    /// # Invariants
    /// - `number` is `0` until storage assigns one.
    /// - `status` starts as `Registered`.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self::with_created_at(client, address, now_rfc3339())
    }

    /// Creates an unsaved parcel with a caller-provided creation timestamp.
    ///
    /// Used by import paths where the timestamp already exists externally.
    pub fn with_created_at(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Returns whether address edits and deletion are currently allowed.
    pub fn is_mutable(&self) -> bool {
        self.status.is_registered()
    }
}

/// Current UTC time formatted as RFC3339 with second precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
