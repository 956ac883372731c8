// SPDX-License-Identifier: MIT OR Apache-2.0

//! Freeze ("iceberg") records.
//!
//! A freeze record is created when a team exhausts its attempt budget on an assignment. It is
//! resolved by an external reviewer flipping its `resolved` flag; the store surfaces that
//! false-to-true transition once per record and the engine reacts by thawing the owning
//! progression. Resolved records remain in the store as history.

use serde::{Deserialize, Serialize};

use crate::catalog::GroupNumber;
use crate::course::{CourseId, TeamId, UserId, id_type};
use crate::progression::ProgressionId;

id_type!(
    /// Identifier of a freeze record.
    FreezeId
);

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Payload for creating a freeze record.
///
/// The store assigns the id and creation timestamp and initialises the record unresolved.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFreeze {
    pub course: CourseId,
    pub team: TeamId,
    pub progression: ProgressionId,

    /// Group number the team was frozen on.
    pub group_number: GroupNumber,

    /// Snapshot of the team's members at freeze time, for the reviewer's benefit.
    pub members: Vec<UserId>,
}

/// A stored freeze record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeRecord {
    pub id: FreezeId,
    pub course: CourseId,
    pub team: TeamId,
    pub progression: ProgressionId,
    pub group_number: GroupNumber,
    pub members: Vec<UserId>,
    pub created_at: Timestamp,

    /// Flipped to `true` exactly once by the external reviewer.
    pub resolved: bool,
}

impl FreezeRecord {
    pub fn new(id: FreezeId, new: NewFreeze, created_at: Timestamp) -> Self {
        Self {
            id,
            course: new.course,
            team: new.team,
            progression: new.progression,
            group_number: new.group_number,
            members: new.members,
            created_at,
            resolved: false,
        }
    }
}
