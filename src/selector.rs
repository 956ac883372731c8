// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment selection.
//!
//! Given a team's completion record and the course's reservation set, the selector picks an
//! unused puzzle variant, derives the canonical answer ordering from the variation index and
//! shuffles a presentation copy of the item list.
//!
//! Selection is a two-stage draw: uniformly over the groups that still have a valid variation,
//! then uniformly over that group's valid variations. Candidates are filtered against both the
//! team's completed groups and the variants currently reserved course-wide; an empty candidate
//! set is reported as [`SelectorError`] instead of redrawing forever. The draw is still
//! optimistic: the reservation itself happens in the store commit, which rejects a variant that
//! was taken concurrently.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

use crate::catalog::{GroupNumber, ReagentPool, Tier, VariantId, canonical_order};
use crate::course::CourseSettings;
use crate::progression::{ActiveAssignment, CompletedTiers};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SelectorError {
    /// Every candidate variant of the tier is completed or currently reserved.
    #[error("no unused {0} reagent variant is available right now")]
    Exhausted(Tier),

    /// The catalog holds no usable variants for the tier at all.
    #[error("reagent pool has no {0} groups")]
    EmptyTier(Tier),
}

/// Picks the team's next assignment.
///
/// The returned assignment still has to be persisted, and its variant reserved on the course,
/// through a single atomic store commit.
pub fn select_assignment<R: Rng + ?Sized>(
    rng: &mut R,
    completed: &CompletedTiers,
    settings: &CourseSettings,
    pool: &ReagentPool,
    assigned_variants: &BTreeSet<VariantId>,
) -> Result<ActiveAssignment, SelectorError> {
    let fresh_team = !completed.beginner
        && completed.regular.is_empty()
        && completed.challenge.is_empty();

    if settings.assign_beginner_group && fresh_team {
        return select_beginner(rng, settings, pool);
    }

    let tier = if (completed.regular.len() as u32) < settings.num_regular_groups {
        Tier::Regular
    } else {
        Tier::Challenge
    };

    select_from_tier(rng, tier, completed, settings, pool, assigned_variants)
}

/// Beginner assignments are per-team: the variation index selects one of the pre-built beginner
/// item lists and no course-wide reservation is taken.
fn select_beginner<R: Rng + ?Sized>(
    rng: &mut R,
    settings: &CourseSettings,
    pool: &ReagentPool,
) -> Result<ActiveAssignment, SelectorError> {
    if pool.beginner.is_empty() {
        return Err(SelectorError::EmptyTier(Tier::Beginner));
    }

    let variation = rng.random_range(0..pool.beginner.len());
    let items = &pool.beginner[variation];

    Ok(build_assignment(
        rng,
        VariantId::beginner(variation),
        Tier::Beginner,
        0,
        // The chosen beginner list is already in canonical order.
        items.clone(),
        items,
        settings,
    ))
}

fn select_from_tier<R: Rng + ?Sized>(
    rng: &mut R,
    tier: Tier,
    completed: &CompletedTiers,
    settings: &CourseSettings,
    pool: &ReagentPool,
    assigned_variants: &BTreeSet<VariantId>,
) -> Result<ActiveAssignment, SelectorError> {
    let groups = pool.tier_groups(tier);
    if groups.is_empty() {
        return Err(SelectorError::EmptyTier(tier));
    }

    // Per group the team may still be handed: every variation whose encoded variant is not
    // reserved by another team in the course. Completed groups and groups with all variations
    // reserved drop out entirely.
    let candidates: Vec<(GroupNumber, Vec<usize>)> = groups
        .iter()
        .filter(|(group, _)| !completed.contains(tier, **group))
        .map(|(group, items)| {
            let variations: Vec<usize> = (0..items.len())
                .filter(|variation| {
                    !assigned_variants.contains(&VariantId::new(*variation, *group))
                })
                .collect();
            (*group, variations)
        })
        .filter(|(_, variations)| !variations.is_empty())
        .collect();

    let Some((group, variations)) = candidates.choose(rng) else {
        return Err(SelectorError::Exhausted(tier));
    };
    let group = *group;
    let variation = variations[rng.random_range(0..variations.len())];

    let items = &groups[&group];
    let answers = canonical_order(items, variation);

    Ok(build_assignment(
        rng,
        VariantId::new(variation, group),
        tier,
        group,
        answers,
        items,
        settings,
    ))
}

fn build_assignment<R: Rng + ?Sized>(
    rng: &mut R,
    variant_id: VariantId,
    tier: Tier,
    group_number: GroupNumber,
    answers: Vec<String>,
    items: &[String],
    settings: &CourseSettings,
) -> ActiveAssignment {
    // Presentation shuffle of a copy; the catalog's item list is never touched.
    let mut reagents = items.to_vec();
    reagents.shuffle(rng);

    ActiveAssignment {
        variant_id,
        tier,
        group_number,
        reagents,
        answers,
        attempts_remaining: settings.attempts_before_freeze,
        group_attempts: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SelectorError, select_assignment};
    use crate::catalog::{ReagentPool, Tier, VariantId};
    use crate::course::CourseSettings;
    use crate::progression::CompletedTiers;
    use crate::test_utils::test_pool;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn settings() -> CourseSettings {
        CourseSettings {
            assign_beginner_group: false,
            num_regular_groups: 2,
            num_challenge_groups: 1,
            ..CourseSettings::default()
        }
    }

    #[test]
    fn fresh_team_gets_beginner_variant_when_enabled() {
        let mut settings = settings();
        settings.assign_beginner_group = true;
        let pool = test_pool();

        for seed in 0..16 {
            let assignment = select_assignment(
                &mut rng(seed),
                &CompletedTiers::default(),
                &settings,
                &pool,
                &BTreeSet::new(),
            )
            .unwrap();

            assert_eq!(assignment.tier, Tier::Beginner);
            assert_eq!(assignment.group_number, 0);
            assert!(assignment.variant_id.as_str().ends_with("00"));
            assert_eq!(assignment.attempts_remaining, settings.attempts_before_freeze);
            assert_eq!(assignment.group_attempts, 0);
            // Beginner lists are served in their stored canonical order.
            assert!(pool.beginner.contains(&assignment.answers));
        }
    }

    #[test]
    fn beginner_tier_skipped_once_any_group_is_completed() {
        let mut settings = settings();
        settings.assign_beginner_group = true;
        let mut completed = CompletedTiers::default();
        completed.record(Tier::Regular, 1);

        let assignment = select_assignment(
            &mut rng(3),
            &completed,
            &settings,
            &test_pool(),
            &BTreeSet::new(),
        )
        .unwrap();
        assert_eq!(assignment.tier, Tier::Regular);
    }

    #[test]
    fn regular_until_requirement_met_then_challenge() {
        let pool = test_pool();
        let mut completed = CompletedTiers::default();

        let assignment =
            select_assignment(&mut rng(1), &completed, &settings(), &pool, &BTreeSet::new())
                .unwrap();
        assert_eq!(assignment.tier, Tier::Regular);

        completed.record(Tier::Regular, 1);
        completed.record(Tier::Regular, 2);

        let assignment =
            select_assignment(&mut rng(1), &completed, &settings(), &pool, &BTreeSet::new())
                .unwrap();
        assert_eq!(assignment.tier, Tier::Challenge);
    }

    #[test]
    fn completed_groups_are_never_redrawn() {
        let pool = test_pool();
        let mut completed = CompletedTiers::default();
        completed.record(Tier::Regular, 1);

        for seed in 0..64 {
            let assignment =
                select_assignment(&mut rng(seed), &completed, &settings(), &pool, &BTreeSet::new())
                    .unwrap();
            assert_ne!(assignment.group_number, 1);
        }
    }

    #[test]
    fn reserved_variants_are_never_redrawn() {
        let pool = test_pool();

        // Reserve every variant of every regular group except group 2, variation 0.
        let mut assigned = BTreeSet::new();
        for (group, items) in &pool.regular {
            for variation in 0..items.len() {
                if !(*group == 2 && variation == 0) {
                    assigned.insert(VariantId::new(variation, *group));
                }
            }
        }

        for seed in 0..16 {
            let assignment = select_assignment(
                &mut rng(seed),
                &CompletedTiers::default(),
                &settings(),
                &pool,
                &assigned,
            )
            .unwrap();
            assert_eq!(assignment.variant_id, VariantId::new(0, 2));
        }
    }

    #[test]
    fn exhausted_tier_is_an_error() {
        let pool = test_pool();

        let mut assigned = BTreeSet::new();
        for (group, items) in &pool.regular {
            for variation in 0..items.len() {
                assigned.insert(VariantId::new(variation, *group));
            }
        }

        let result = select_assignment(
            &mut rng(0),
            &CompletedTiers::default(),
            &settings(),
            &pool,
            &assigned,
        );
        assert_eq!(result, Err(SelectorError::Exhausted(Tier::Regular)));
    }

    #[test]
    fn groups_are_drawn_uniformly_regardless_of_variation_count() {
        // Group 1 carries eight variations, group 2 a single one. A flat draw over all
        // (group, variation) pairs would hand out group 2 roughly once in nine draws; the
        // two-stage draw hands it out half the time.
        let many: Vec<String> = (0..8).map(|n| format!("item-{n}")).collect();
        let pool = ReagentPool {
            beginner: Vec::new(),
            regular: BTreeMap::from([(1, many), (2, vec!["solo".into()])]),
            challenge: BTreeMap::new(),
        };

        let small_group_picks = (0..128u64)
            .filter(|seed| {
                let assignment = select_assignment(
                    &mut rng(*seed),
                    &CompletedTiers::default(),
                    &settings(),
                    &pool,
                    &BTreeSet::new(),
                )
                .unwrap();
                assignment.group_number == 2
            })
            .count();

        assert!(
            small_group_picks >= 40,
            "group 2 drawn {small_group_picks} times out of 128"
        );
    }

    #[test]
    fn answers_follow_the_variation_permutation() {
        let pool = test_pool();

        let assignment = select_assignment(
            &mut rng(7),
            &CompletedTiers::default(),
            &settings(),
            &pool,
            &BTreeSet::new(),
        )
        .unwrap();

        let items = &pool.regular[&assignment.group_number];
        // Decode the 1-based variation number back out of the variant id.
        let variation: usize = assignment.variant_id.as_str()
            [..assignment.variant_id.as_str().len() - 2]
            .parse::<usize>()
            .unwrap()
            - 1;

        assert_eq!(
            assignment.answers,
            crate::catalog::canonical_order(items, variation)
        );

        // The prompt is a permutation of the same items.
        let mut reagents = assignment.reagents.clone();
        let mut expected = items.clone();
        reagents.sort();
        expected.sort();
        assert_eq!(reagents, expected);
    }
}
