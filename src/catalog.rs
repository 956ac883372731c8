// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static per-course catalog of reagent-group puzzle variants.
//!
//! The catalog is copied from a template when a course is created and treated as immutable for
//! the lifetime of the course. Every regular and challenge group is one canonical ordered list of
//! reagent items; a "variant" of a group is a deterministic permutation of that list keyed by a
//! variation index. Beginner variants each carry their own canonical list and are assigned
//! per-team without any course-wide exclusivity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One display item of a sequencing puzzle.
pub type ReagentItem = String;

/// Identifier of a reagent group within its tier.
///
/// Group number `0` is reserved for the beginner tier. Reservable groups use `1..=99` so their
/// variant ids stay unambiguous.
pub type GroupNumber = u8;

/// Difficulty class of a reagent group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Beginner,
    Regular,
    Challenge,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Beginner => write!(f, "beginner"),
            Tier::Regular => write!(f, "regular"),
            Tier::Challenge => write!(f, "challenge"),
        }
    }
}

/// Identifier of one concrete puzzle variant, unique across the whole course.
///
/// Regular and challenge variants encode the 1-based variation number followed by the
/// two-digit-padded group number (`variation 0` of `group 7` becomes `"107"`). Beginner variants
/// encode the variation number followed by the reserved group number `"00"`, which keeps them
/// distinguishable from every reservable variant.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    /// Encodes a regular or challenge variant id.
    ///
    /// Group numbers are bounded to `1..=99`: the two-digit padding does not truncate, so a
    /// three-digit group would collide with the encoding of a higher variation of a smaller
    /// group.
    pub fn new(variation: usize, group: GroupNumber) -> Self {
        debug_assert!(
            (1..=99).contains(&group),
            "group number {group} outside 1..=99"
        );
        Self(format!("{}{:02}", variation + 1, group))
    }

    pub fn beginner(variation: usize) -> Self {
        Self(format!("{variation}00"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-course puzzle catalog, partitioned into difficulty tiers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReagentPool {
    /// One canonical ordered item list per beginner variant.
    pub beginner: Vec<Vec<ReagentItem>>,

    /// Regular groups, each one canonical ordered item list.
    pub regular: BTreeMap<GroupNumber, Vec<ReagentItem>>,

    /// Challenge groups, each one canonical ordered item list.
    pub challenge: BTreeMap<GroupNumber, Vec<ReagentItem>>,
}

impl ReagentPool {
    /// Groups of a reservable tier.
    ///
    /// Panics when asked for the beginner tier, which is not organised as a group mapping.
    pub fn tier_groups(&self, tier: Tier) -> &BTreeMap<GroupNumber, Vec<ReagentItem>> {
        match tier {
            Tier::Regular => &self.regular,
            Tier::Challenge => &self.challenge,
            Tier::Beginner => panic!("beginner tier holds variants, not groups"),
        }
    }
}

/// Canonical answer ordering of an item list under the given variation index.
///
/// The last element is removed and reinserted at the variation index. Variation indices at or
/// beyond the shortened list length leave the ordering unchanged.
pub fn canonical_order(items: &[ReagentItem], variation: usize) -> Vec<ReagentItem> {
    let mut answers = items.to_vec();
    if let Some(last) = answers.pop() {
        let index = variation.min(answers.len());
        answers.insert(index, last);
    }
    answers
}
