//! Parcel use-case service.
//!
//! # Responsibility
//! - Provide intent-named entry points (register, send, deliver, re-address,
//!   withdraw) for core callers.
//! - Offer an optional follow-up read that explains a guarded rejection.
//!
//! # Invariants
//! - Service APIs never bypass repository guards or split a guarded write
//!   into read-then-write.
//! - Repository errors are returned unchanged.

use crate::context::OpContext;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoError, RepoResult};

/// Why a guarded address edit or delete matched no row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// No parcel with that number exists.
    Missing,
    /// The parcel exists but has left `registered`.
    NotRegistered(ParcelStatus),
}

/// Use-case service wrapper for parcel operations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel for `client`, stamped with the current time.
    pub fn register(
        &self,
        ctx: &OpContext,
        client: ClientId,
        address: impl Into<String>,
    ) -> RepoResult<ParcelNumber> {
        self.repo.create(ctx, &Parcel::new(client, address))
    }

    /// Persists a caller-built parcel. Its status is ignored.
    pub fn create(&self, ctx: &OpContext, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        self.repo.create(ctx, parcel)
    }

    pub fn get(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<Parcel> {
        self.repo.get(ctx, number)
    }

    pub fn list_for_client(&self, ctx: &OpContext, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.list_by_client(ctx, client)
    }

    /// Sets any status value; no transition rules apply.
    pub fn set_status(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
        status: &ParcelStatus,
    ) -> RepoResult<()> {
        self.repo.set_status(ctx, number, status)
    }

    pub fn mark_sent(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<()> {
        self.repo.set_status(ctx, number, &ParcelStatus::Sent)
    }

    pub fn mark_delivered(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<()> {
        self.repo.set_status(ctx, number, &ParcelStatus::Delivered)
    }

    /// Changes the delivery address of a still-registered parcel.
    pub fn change_address(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
        address: &str,
    ) -> RepoResult<()> {
        self.repo.set_address(ctx, number, address)
    }

    /// Removes a still-registered parcel.
    pub fn withdraw(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<()> {
        self.repo.delete(ctx, number)
    }

    /// Explains a `NoRowsUpdated` / `NoRowsDeleted` outcome with one read.
    ///
    /// Returns `None` when the parcel is currently `registered`, which means
    /// another caller changed it after the rejected write.
    pub fn explain_rejection(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
    ) -> RepoResult<Option<RejectionReason>> {
        match self.repo.get(ctx, number) {
            Ok(parcel) if parcel.status.is_registered() => Ok(None),
            Ok(parcel) => Ok(Some(RejectionReason::NotRegistered(parcel.status))),
            Err(RepoError::NotFound(_)) => Ok(Some(RejectionReason::Missing)),
            Err(err) => Err(err),
        }
    }
}
