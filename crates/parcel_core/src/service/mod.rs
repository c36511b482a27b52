//! Parcel use-case services.
//!
//! # Responsibility
//! - Expose intent-named entry points over the parcel repository.
//! - Keep callers decoupled from storage details.

pub mod parcel_service;
