// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course and team records as seen by the gameplay core.
//!
//! Creation and administration of these records is handled elsewhere; the engine only reads them
//! and mutates the course's variant reservation set through the store's commit primitive.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::VariantId;

macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a course document.
    CourseId
);
id_type!(
    /// Identifier of a team document.
    TeamId
);
id_type!(
    /// Identifier of a user document.
    UserId
);

pub(crate) use id_type;

/// Gameplay-relevant course settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSettings {
    /// Whether fresh teams start on a beginner group before entering the regular tier.
    pub assign_beginner_group: bool,

    /// Number of regular groups a team has to complete.
    pub num_regular_groups: u32,

    /// Number of challenge groups a team has to complete.
    pub num_challenge_groups: u32,

    /// Attempt budget per assignment before the team is frozen.
    pub attempts_before_freeze: u32,

    /// Attempt budget granted when a freeze record is resolved.
    pub attempts_after_freeze: u32,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            assign_beginner_group: true,
            num_regular_groups: 4,
            num_challenge_groups: 3,
            attempts_before_freeze: 2,
            attempts_after_freeze: 1,
        }
    }
}

/// Lifecycle status of a course.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseStatus {
    Setup,
    Live,
    Archived,
}

/// Course document.
///
/// `assigned_variants` is the course-wide reservation set: a variant id is a member exactly while
/// some team's unresolved assignment references it. All mutations of the set go through the
/// store's atomic commit primitive together with the owning progression update.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub status: CourseStatus,
    pub settings: CourseSettings,
    pub assigned_variants: BTreeSet<VariantId>,
}

impl Course {
    pub fn new(id: CourseId, name: &str, settings: CourseSettings) -> Self {
        Self {
            id,
            name: name.to_owned(),
            status: CourseStatus::Live,
            settings,
            assigned_variants: BTreeSet::new(),
        }
    }
}

/// Team document.
///
/// Owns exactly one progression record, created atomically with the team.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub course: CourseId,
    pub progression: crate::progression::ProgressionId,
    pub members: Vec<UserId>,
}
