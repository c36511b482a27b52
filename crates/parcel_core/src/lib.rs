//! Core data access for tracked parcels.
//! This crate owns the parcel storage contract and its status guard.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use context::{CancelToken, Interrupt, OpContext, DEFAULT_OP_TIMEOUT};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parcel::{now_rfc3339, ClientId, Parcel, ParcelNumber, ParcelStatus};
pub use repo::parcel_repo::{ParcelRepository, RepoError, RepoResult, SqliteParcelRepository};
pub use service::parcel_service::{ParcelService, RejectionReason};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
