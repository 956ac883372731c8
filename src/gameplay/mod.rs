// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-facing gameplay engine.
//!
//! Drives the per-team progression state machine: assignment of puzzle variants, answer
//! verification, attempt counting, freeze-on-exhaustion and reactivation after a freeze record
//! is resolved.
//!
//! Every operation is one bounded unit of work. Mutations are computed against an observed
//! progression version and persisted with the store's compare-and-set commit; when the commit
//! loses against a concurrent writer the operation re-reads and retries locally, up to
//! [`MAX_COMMIT_ATTEMPTS`] times, before surfacing [`EngineError::StorageConflict`]. All other
//! failures indicate caller or precondition errors and surface immediately.

use std::sync::Mutex;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::catalog::{ReagentItem, Tier, VariantId};
use crate::course::{Course, Team, TeamId};
use crate::freeze::{FreezeId, NewFreeze};
use crate::progression::{
    AssignmentState, ProgressReport, Progression, ProgressionId,
};
use crate::selector::{SelectorError, select_assignment};
use crate::session::{AccessError, Caller};
use crate::store::{GameplayStore, StoreError, VariantEffect, Version};


/// Bound on local re-read-and-retry cycles after a lost compare-and-set.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Failures of gameplay operations, reported to the caller as typed errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Answers were submitted while no reagent group is assigned.
    #[error("no reagent group assigned, request one before checking answers")]
    NoAssignment,

    /// The team points at a course, catalog or progression document that does not exist.
    #[error("attempted to access an invalid course")]
    InvalidCourseReference,

    /// The requested team document does not exist.
    #[error("unknown team {0}")]
    UnknownTeam(TeamId),

    #[error(transparent)]
    Selection(#[from] SelectorError),

    /// The transactional update kept losing against concurrent writers.
    #[error("progression update kept conflicting after {MAX_COMMIT_ATTEMPTS} attempts")]
    StorageConflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Status payload of an assignment request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AssignmentStatus {
    /// The team has an outstanding puzzle to solve.
    #[serde(rename_all = "camelCase")]
    Active {
        variant_id: VariantId,
        tier: Tier,
        reagents: Vec<ReagentItem>,
        attempts_remaining: u32,
    },

    /// The team's attempts are exhausted and an unresolved freeze record exists.
    #[serde(rename_all = "camelCase")]
    Frozen { freeze_ref: FreezeId },

    /// All tier requirements are met; terminal.
    #[serde(rename_all = "camelCase")]
    Finished { total_attempts: u64 },
}

/// Response of [`GameplayEngine::request_assignment`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    #[serde(flatten)]
    pub status: AssignmentStatus,
    pub progress: ProgressReport,
}

/// Outcome of an answer submission.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum SubmitOutcome {
    /// Ordering matched; the group is completed and the assignment cleared.
    #[serde(rename_all = "camelCase")]
    Correct { group_attempts: u32 },

    /// Ordering did not match and attempts remain.
    #[serde(rename_all = "camelCase")]
    Incorrect { attempts_remaining: u32 },

    /// Attempts are exhausted (or already were); the team is frozen.
    #[serde(rename_all = "camelCase")]
    Frozen { freeze_ref: FreezeId },

    /// Ordering matched and this completion satisfied the final tier requirement.
    #[serde(rename_all = "camelCase")]
    Finished { total_attempts: u64 },
}

/// The gameplay progression engine.
///
/// Generic over the store backend and the random source. The random source only feeds variant
/// selection and prompt shuffling; tests inject a seeded generator.
#[derive(Debug)]
pub struct GameplayEngine<S, R> {
    store: S,
    rng: Mutex<R>,
}

impl<S, R> GameplayEngine<S, R>
where
    S: GameplayStore,
    R: Rng,
{
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the team's current assignment, selecting a fresh one when none is outstanding.
    ///
    /// Repeated calls without an intervening submission return the same assignment unchanged.
    /// Once the course's tier requirements are met the terminal finished state is persisted
    /// idempotently and reported from then on.
    pub async fn request_assignment(
        &self,
        caller: &Caller,
        team_id: &TeamId,
    ) -> Result<AssignmentResponse, EngineError> {
        caller.ensure_student()?;
        let team = self.team(team_id).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let course = self.course(&team).await?;
            let (version, progression) = self.progression(&team.progression).await?;
            let progress = progression.progress(&course.settings);

            match progression.state {
                AssignmentState::Finished => {
                    return Ok(AssignmentResponse {
                        status: AssignmentStatus::Finished {
                            total_attempts: progression.total_attempts,
                        },
                        progress,
                    });
                }

                // Requirements can be satisfied while no terminal state is stored yet: directly
                // after the satisfying completion was written by an older revision, or after the
                // course's requirements were lowered mid-run. Persist the terminal state and
                // release any outstanding reservation in the same commit.
                _ if progression.requirements_met(&course.settings) => {
                    let effect = release_effect(&progression.state, &course);
                    let total_attempts = progression.total_attempts;
                    let mut next = progression;
                    next.state = AssignmentState::Finished;

                    match self
                        .store
                        .commit_progression(&team.progression, version, next, effect)
                        .await
                    {
                        Ok(_) => {
                            debug!(team = %team.id, "progression finished");
                            return Ok(AssignmentResponse {
                                status: AssignmentStatus::Finished { total_attempts },
                                progress,
                            });
                        }
                        Err(err) => self.retry_or_surface(err, attempt)?,
                    }
                }

                AssignmentState::Active(assignment) => {
                    return Ok(AssignmentResponse {
                        status: AssignmentStatus::Active {
                            variant_id: assignment.variant_id,
                            tier: assignment.tier,
                            reagents: assignment.reagents,
                            attempts_remaining: assignment.attempts_remaining,
                        },
                        progress,
                    });
                }

                AssignmentState::Frozen(assignment) => {
                    return Ok(AssignmentResponse {
                        status: AssignmentStatus::Frozen {
                            freeze_ref: assignment.freeze_ref,
                        },
                        progress,
                    });
                }

                AssignmentState::NoAssignment => {
                    let pool = self
                        .store
                        .reagent_pool(&team.course)
                        .await?
                        .ok_or(EngineError::InvalidCourseReference)?;

                    let assignment = {
                        let mut rng = self.rng.lock().expect("acquire gameplay rng");
                        select_assignment(
                            &mut *rng,
                            &progression.completed,
                            &course.settings,
                            &pool,
                            &course.assigned_variants,
                        )?
                    };

                    let effect = if assignment.requires_reservation() {
                        VariantEffect::Reserve(course.id.clone(), assignment.variant_id.clone())
                    } else {
                        VariantEffect::None
                    };

                    let status = AssignmentStatus::Active {
                        variant_id: assignment.variant_id.clone(),
                        tier: assignment.tier,
                        reagents: assignment.reagents.clone(),
                        attempts_remaining: assignment.attempts_remaining,
                    };

                    let mut next = progression;
                    next.state = AssignmentState::Active(assignment);

                    match self
                        .store
                        .commit_progression(&team.progression, version, next, effect)
                        .await
                    {
                        Ok(_) => {
                            debug!(team = %team.id, "assigned new reagent group");
                            return Ok(AssignmentResponse { status, progress });
                        }
                        // A lost reservation race re-reads the course and draws again.
                        Err(err) => self.retry_or_surface(err, attempt)?,
                    }
                }
            }
        }
    }

    /// Verifies a submitted answer ordering against the team's current assignment.
    ///
    /// Non-frozen submissions always count: `total_attempts` and the assignment's
    /// `group_attempts` are incremented regardless of the outcome. Submissions while frozen
    /// short-circuit without counting.
    pub async fn submit_answer(
        &self,
        caller: &Caller,
        team_id: &TeamId,
        submitted: &[ReagentItem],
    ) -> Result<SubmitOutcome, EngineError> {
        caller.ensure_student()?;
        let team = self.team(team_id).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let (version, mut progression) = self.progression(&team.progression).await?;

            let assignment = match &progression.state {
                AssignmentState::NoAssignment | AssignmentState::Finished => {
                    return Err(EngineError::NoAssignment);
                }
                AssignmentState::Frozen(frozen) => {
                    return Ok(SubmitOutcome::Frozen {
                        freeze_ref: frozen.freeze_ref.clone(),
                    });
                }
                AssignmentState::Active(assignment) => assignment.clone(),
            };

            let course = self.course(&team).await?;
            progression.total_attempts += 1;
            let group_attempts = assignment.group_attempts + 1;

            let (next_state, effect, outcome) = if assignment.matches(submitted) {
                progression
                    .completed
                    .record(assignment.tier, assignment.group_number);

                let effect = if assignment.requires_reservation() {
                    VariantEffect::Release(course.id.clone(), assignment.variant_id.clone())
                } else {
                    VariantEffect::None
                };

                if progression.requirements_met(&course.settings) {
                    let outcome = SubmitOutcome::Finished {
                        total_attempts: progression.total_attempts,
                    };
                    (AssignmentState::Finished, effect, outcome)
                } else {
                    let outcome = SubmitOutcome::Correct { group_attempts };
                    (AssignmentState::NoAssignment, effect, outcome)
                }
            } else if assignment.attempts_remaining <= 1 {
                // Budget exhausted: freeze behind a fresh iceberg record.
                let freeze_ref = self
                    .store
                    .create_freeze(NewFreeze {
                        course: course.id.clone(),
                        team: team.id.clone(),
                        progression: team.progression.clone(),
                        group_number: assignment.group_number,
                        members: team.members.clone(),
                    })
                    .await?;

                let outcome = SubmitOutcome::Frozen {
                    freeze_ref: freeze_ref.clone(),
                };
                let frozen = assignment.freeze(freeze_ref, group_attempts);
                (AssignmentState::Frozen(frozen), VariantEffect::None, outcome)
            } else {
                let mut active = assignment;
                active.attempts_remaining -= 1;
                active.group_attempts = group_attempts;

                let outcome = SubmitOutcome::Incorrect {
                    attempts_remaining: active.attempts_remaining,
                };
                (AssignmentState::Active(active), VariantEffect::None, outcome)
            };

            progression.state = next_state;

            match self
                .store
                .commit_progression(&team.progression, version, progression, effect)
                .await
            {
                Ok(_) => {
                    debug!(team = %team.id, outcome = ?outcome, "answer submission evaluated");
                    return Ok(outcome);
                }
                Err(err) => self.retry_or_surface(err, attempt)?,
            }
        }
    }

    /// Reactivates a progression after its freeze record was resolved.
    ///
    /// Edge-triggered and idempotent: only a progression still frozen on exactly this record is
    /// thawed, with its attempt budget restored to the course's post-freeze allowance. Duplicate
    /// deliveries and resolutions of historical records are no-ops.
    pub async fn freeze_resolved(&self, freeze_id: &FreezeId) -> Result<(), EngineError> {
        let record = self
            .store
            .freeze(freeze_id)
            .await?
            .ok_or_else(|| StoreError::UnknownFreeze(freeze_id.clone()))?;

        if !record.resolved {
            return Ok(());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let (version, mut progression) = self.progression(&record.progression).await?;

            let frozen = match &progression.state {
                AssignmentState::Frozen(frozen) if frozen.freeze_ref == *freeze_id => {
                    frozen.clone()
                }
                // Already thawed, re-frozen on a later record, or moved on entirely.
                _ => return Ok(()),
            };

            let course = self
                .store
                .course(&record.course)
                .await?
                .ok_or(EngineError::InvalidCourseReference)?;

            progression.state =
                AssignmentState::Active(frozen.thaw(course.settings.attempts_after_freeze));

            match self
                .store
                .commit_progression(&record.progression, version, progression, VariantEffect::None)
                .await
            {
                Ok(_) => {
                    debug!(freeze = %freeze_id, "progression thawed");
                    return Ok(());
                }
                Err(err) => self.retry_or_surface(err, attempt)?,
            }
        }
    }

    /// Drives [`Self::freeze_resolved`] from a store resolution feed.
    ///
    /// Runs until the feed closes. Failures for individual records are logged and skipped.
    pub async fn process_freeze_resolutions(&self, mut resolutions: mpsc::UnboundedReceiver<FreezeId>) {
        while let Some(freeze_id) = resolutions.recv().await {
            if let Err(err) = self.freeze_resolved(&freeze_id).await {
                warn!(freeze = %freeze_id, %err, "failed to thaw progression");
            }
        }
    }

    async fn team(&self, team_id: &TeamId) -> Result<Team, EngineError> {
        self.store
            .team(team_id)
            .await?
            .ok_or_else(|| EngineError::UnknownTeam(team_id.clone()))
    }

    async fn course(&self, team: &Team) -> Result<Course, EngineError> {
        self.store
            .course(&team.course)
            .await?
            .ok_or(EngineError::InvalidCourseReference)
    }

    async fn progression(
        &self,
        id: &ProgressionId,
    ) -> Result<(Version, Progression), EngineError> {
        self.store
            .progression(id)
            .await?
            .ok_or(EngineError::InvalidCourseReference)
    }

    /// Converts a commit failure into a retry (by returning `Ok`) or a surfaced error.
    ///
    /// Only lost compare-and-sets and lost variant reservations are retryable; both mean a
    /// concurrent writer went first and a re-read will observe its result.
    fn retry_or_surface(&self, err: StoreError, attempt: u32) -> Result<(), EngineError> {
        match err {
            StoreError::Conflict | StoreError::VariantInUse(_)
                if attempt < MAX_COMMIT_ATTEMPTS =>
            {
                warn!(%err, attempt, "progression commit lost a race, retrying");
                Ok(())
            }
            StoreError::Conflict | StoreError::VariantInUse(_) => Err(EngineError::StorageConflict),
            err => Err(err.into()),
        }
    }
}

fn release_effect(state: &AssignmentState, course: &Course) -> VariantEffect {
    match state {
        AssignmentState::Active(assignment) if assignment.requires_reservation() => {
            VariantEffect::Release(course.id.clone(), assignment.variant_id.clone())
        }
        AssignmentState::Frozen(assignment) if assignment.requires_reservation() => {
            VariantEffect::Release(course.id.clone(), assignment.variant_id.clone())
        }
        _ => VariantEffect::None,
    }
}
