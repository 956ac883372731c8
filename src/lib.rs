// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gameplay progression engine for classroom "reagent group" ordering puzzles.
//!
//! Teams of students are handed reagent groups: ordered sequencing puzzles drawn from a per-course
//! catalog partitioned into beginner, regular and challenge tiers. A team requests an assignment,
//! submits answer orderings against a limited attempt budget, and is frozen behind an "iceberg"
//! record when the budget runs out. An external reviewer resolves the iceberg, which thaws the
//! team with a fresh (smaller) attempt allowance. Once the course's regular and challenge
//! requirements are both met the team is finished.
//!
//! The crate is the durable state machine behind those flows:
//!
//! - [`selector`] picks an unused puzzle variant for a team, builds the canonical answer ordering
//!   and the shuffled display prompt.
//! - [`progression`] holds the per-team record: completed tiers, attempt tallies and the current
//!   assignment expressed as a tagged state (no assignment, active, frozen, finished).
//! - [`gameplay`] is the request-facing engine driving assignment, answer verification,
//!   freeze-on-exhaustion and reactivation.
//! - [`store`] defines the persistence seams towards the course, progression and freeze-record
//!   collaborators, together with an in-memory implementation.
//!
//! Course-wide exclusivity of puzzle variants is maintained through a reservation set on the
//! course record. Reservations are taken with an atomic reserve-if-absent as part of the same
//! commit that stores the assignment, so two teams racing for the same variant cannot both win.
//!
//! Authentication, HTTP routing and the surrounding course/team CRUD are out of scope; callers
//! pass pre-verified session claims in as [`session::Caller`] flags.

pub mod catalog;
pub mod course;
pub mod freeze;
pub mod gameplay;
pub mod progression;
pub mod selector;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use catalog::{GroupNumber, ReagentItem, ReagentPool, Tier, VariantId};
pub use course::{Course, CourseId, CourseSettings, CourseStatus, Team, TeamId, UserId};
pub use freeze::{FreezeId, FreezeRecord, NewFreeze};
pub use gameplay::{
    AssignmentResponse, AssignmentStatus, EngineError, GameplayEngine, SubmitOutcome,
};
pub use progression::{
    ActiveAssignment, AssignmentState, CompletedTiers, FrozenAssignment, ProgressReport,
    Progression, ProgressionId, TierProgress,
};
pub use session::{AccessError, Caller, Role};
pub use store::{MemoryStore, StoreError};
