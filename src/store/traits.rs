// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;
use tokio::sync::mpsc;

use crate::catalog::{ReagentPool, VariantId};
use crate::course::{Course, CourseId, Team, TeamId};
use crate::freeze::{FreezeId, FreezeRecord, NewFreeze};
use crate::progression::{Progression, ProgressionId};

/// Version counter guarding compare-and-set progression commits.
pub type Version = u64;

/// Failures reported by store backends.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    /// The commit's expected version no longer matches the stored record; a concurrent writer
    /// got there first. Callers re-read and retry a bounded number of times.
    #[error("progression update lost against a concurrent write")]
    Conflict,

    /// Reserve-if-absent found the variant already reserved by another team.
    #[error("reagent variant {0} is already assigned in this course")]
    VariantInUse(VariantId),

    #[error("unknown course {0}")]
    UnknownCourse(CourseId),

    #[error("unknown progression {0}")]
    UnknownProgression(ProgressionId),

    #[error("unknown freeze record {0}")]
    UnknownFreeze(FreezeId),

    #[error("storage backend: {0}")]
    Backend(String),
}

/// Effect of a progression commit on the owning course's reservation set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VariantEffect {
    None,

    /// Reserve-if-absent: fails the whole commit with [`StoreError::VariantInUse`] when the
    /// variant is already present.
    Reserve(CourseId, VariantId),

    /// Removes the variant from the set. Releasing an absent variant is a no-op.
    Release(CourseId, VariantId),
}

pub trait CourseStore {
    fn course(
        &self,
        id: &CourseId,
    ) -> impl Future<Output = Result<Option<Course>, StoreError>>;
}

pub trait TeamStore {
    fn team(&self, id: &TeamId) -> impl Future<Output = Result<Option<Team>, StoreError>>;
}

pub trait ReagentPoolStore {
    /// The course's puzzle catalog. Read-only from the engine's perspective.
    fn reagent_pool(
        &self,
        course: &CourseId,
    ) -> impl Future<Output = Result<Option<ReagentPool>, StoreError>>;
}

pub trait ProgressionStore {
    /// Current version and value of a progression record.
    fn progression(
        &self,
        id: &ProgressionId,
    ) -> impl Future<Output = Result<Option<(Version, Progression)>, StoreError>>;

    /// Replaces a progression record and applies the variant effect on the owning course in one
    /// atomic step.
    ///
    /// Fails with [`StoreError::Conflict`] when `expected_version` is stale and with
    /// [`StoreError::VariantInUse`] when a reservation is already taken; in both cases nothing
    /// is applied. Returns the new version.
    fn commit_progression(
        &self,
        id: &ProgressionId,
        expected_version: Version,
        next: Progression,
        effect: VariantEffect,
    ) -> impl Future<Output = Result<Version, StoreError>>;
}

pub trait FreezeStore {
    /// Creates an unresolved freeze record and returns its reference.
    fn create_freeze(
        &self,
        new: NewFreeze,
    ) -> impl Future<Output = Result<FreezeId, StoreError>>;

    fn freeze(
        &self,
        id: &FreezeId,
    ) -> impl Future<Output = Result<Option<FreezeRecord>, StoreError>>;

    /// Edge-triggered feed of freeze resolutions.
    ///
    /// Every false-to-true transition of a record's `resolved` flag is delivered exactly once
    /// per transition to each subscriber.
    fn subscribe_resolutions(&self) -> mpsc::UnboundedReceiver<FreezeId>;
}

/// Everything the gameplay engine needs from a backend.
pub trait GameplayStore:
    CourseStore + TeamStore + ReagentPoolStore + ProgressionStore + FreezeStore
{
}

impl<S> GameplayStore for S where
    S: CourseStore + TeamStore + ReagentPoolStore + ProgressionStore + FreezeStore
{
}
