//! Repository layer for parcel persistence.
//!
//! # Responsibility
//! - Define the parcel data-access contract.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `NoRowsUpdated`,
//!   `NoRowsDeleted`) alongside pass-through storage errors.
//! - Status-gated writes are single conditional statements.

pub mod parcel_repo;
