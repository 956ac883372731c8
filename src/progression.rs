// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-team progression record.
//!
//! The assignment lifecycle is a tagged state so that invalid field combinations (a frozen
//! assignment with attempts left, a finished team with an outstanding puzzle) cannot be
//! represented:
//!
//! ```text
//! NoAssignment -> Active -> Frozen -> Active -> ...
//!      |            |
//!      |            v
//!      +------> Finished (terminal)
//! ```
//!
//! Transitions are computed by the [`gameplay`](crate::gameplay) engine and persisted through a
//! compare-and-set on the record's version, so concurrent submissions for the same team cannot
//! both apply against the same observed state.

use serde::{Deserialize, Serialize};

use crate::catalog::{GroupNumber, ReagentItem, Tier, VariantId};
use crate::course::{CourseSettings, id_type};
use crate::freeze::FreezeId;

id_type!(
    /// Identifier of a progression document.
    ProgressionId
);

/// Tier completion bookkeeping.
///
/// The beginner flag is write-once; the regular and challenge lists are append-only.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTiers {
    pub beginner: bool,
    pub regular: Vec<GroupNumber>,
    pub challenge: Vec<GroupNumber>,
}

impl CompletedTiers {
    /// Records a completed group for its tier.
    pub fn record(&mut self, tier: Tier, group: GroupNumber) {
        match tier {
            Tier::Beginner => self.beginner = true,
            Tier::Regular => self.regular.push(group),
            Tier::Challenge => self.challenge.push(group),
        }
    }

    pub fn contains(&self, tier: Tier, group: GroupNumber) -> bool {
        match tier {
            Tier::Beginner => self.beginner,
            Tier::Regular => self.regular.contains(&group),
            Tier::Challenge => self.challenge.contains(&group),
        }
    }
}

/// An assignment the team is actively working on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAssignment {
    pub variant_id: VariantId,
    pub tier: Tier,
    pub group_number: GroupNumber,

    /// Shuffled display ordering shown to the team.
    pub reagents: Vec<ReagentItem>,

    /// Canonical ordering the team has to reproduce.
    pub answers: Vec<ReagentItem>,

    pub attempts_remaining: u32,
    pub group_attempts: u32,
}

impl ActiveAssignment {
    /// Whether this assignment occupies a slot in the course's reservation set.
    ///
    /// Beginner assignments are per-team and exempt from course-wide exclusivity.
    pub fn requires_reservation(&self) -> bool {
        self.tier != Tier::Beginner
    }

    /// Ordered element-wise comparison against a submitted answer list.
    ///
    /// This is a sequencing puzzle: the same items in a different order do not match.
    pub fn matches(&self, submitted: &[ReagentItem]) -> bool {
        self.answers.as_slice() == submitted
    }
}

/// An assignment suspended behind an unresolved freeze record.
///
/// Carries no attempt budget; submissions short-circuit until the freeze is resolved.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenAssignment {
    pub variant_id: VariantId,
    pub tier: Tier,
    pub group_number: GroupNumber,
    pub reagents: Vec<ReagentItem>,
    pub answers: Vec<ReagentItem>,
    pub group_attempts: u32,
    pub freeze_ref: FreezeId,
}

impl FrozenAssignment {
    pub fn requires_reservation(&self) -> bool {
        self.tier != Tier::Beginner
    }

    /// Thaws the assignment with a fresh attempt budget, dropping the freeze reference.
    pub fn thaw(self, attempts_granted: u32) -> ActiveAssignment {
        ActiveAssignment {
            variant_id: self.variant_id,
            tier: self.tier,
            group_number: self.group_number,
            reagents: self.reagents,
            answers: self.answers,
            attempts_remaining: attempts_granted,
            group_attempts: self.group_attempts,
        }
    }
}

impl ActiveAssignment {
    /// Suspends the assignment behind the given freeze record.
    pub fn freeze(self, freeze_ref: FreezeId, group_attempts: u32) -> FrozenAssignment {
        FrozenAssignment {
            variant_id: self.variant_id,
            tier: self.tier,
            group_number: self.group_number,
            reagents: self.reagents,
            answers: self.answers,
            group_attempts,
            freeze_ref,
        }
    }
}

/// Assignment lifecycle state of a team.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AssignmentState {
    #[default]
    NoAssignment,
    Active(ActiveAssignment),
    Frozen(FrozenAssignment),
    Finished,
}

/// Per-team durable gameplay record.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    pub completed: CompletedTiers,

    /// Total counted submissions across all assignments. Monotone, never reset.
    pub total_attempts: u64,

    pub state: AssignmentState,
}

impl Progression {
    /// Whether the course's regular and challenge requirements are both met.
    pub fn requirements_met(&self, settings: &CourseSettings) -> bool {
        self.completed.regular.len() as u32 >= settings.num_regular_groups
            && self.completed.challenge.len() as u32 >= settings.num_challenge_groups
    }

    /// Per-tier completion counts reported back with every assignment request.
    pub fn progress(&self, settings: &CourseSettings) -> ProgressReport {
        ProgressReport {
            beginner: TierProgress {
                completed: u32::from(self.completed.beginner),
                required: u32::from(settings.assign_beginner_group),
            },
            regular: TierProgress {
                completed: self.completed.regular.len() as u32,
                required: settings.num_regular_groups,
            },
            challenge: TierProgress {
                completed: self.completed.challenge.len() as u32,
                required: settings.num_challenge_groups,
            },
        }
    }
}

/// Completion state of one tier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    pub completed: u32,
    pub required: u32,
}

/// Completion state across all three tiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub beginner: TierProgress,
    pub regular: TierProgress,
    pub challenge: TierProgress,
}
