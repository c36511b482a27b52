//! Domain model for tracked parcels.
//!
//! # Responsibility
//! - Define the single persisted entity and its status vocabulary.
//!
//! # Invariants
//! - Every parcel is identified by a server-assigned `ParcelNumber`.
//! - Only `ParcelStatus::Registered` carries behavioral meaning in core.

pub mod parcel;
