// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for deterministic gameplay tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::catalog::{ReagentItem, ReagentPool};
use crate::course::{Course, CourseId, CourseSettings, Team, TeamId};
use crate::gameplay::GameplayEngine;
use crate::progression::{AssignmentState, Progression, ProgressionId};
use crate::store::{MemoryStore, ProgressionStore, TeamStore};

fn items(prefix: &str) -> Vec<ReagentItem> {
    ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|suffix| format!("{prefix}-{suffix}"))
        .collect()
}

/// A small catalog: two beginner variants, regular groups 1-3 and challenge groups 1-3, four
/// items each.
pub fn test_pool() -> ReagentPool {
    ReagentPool {
        beginner: vec![items("beginner-a"), items("beginner-b")],
        regular: (1..=3).map(|group| (group, items(&format!("regular-{group}")))).collect(),
        challenge: (1..=3)
            .map(|group| (group, items(&format!("challenge-{group}"))))
            .collect(),
    }
}

/// One seeded course with its engine on a shared in-memory store.
pub struct TestCourse {
    pub store: MemoryStore,
    pub engine: GameplayEngine<MemoryStore, ChaCha8Rng>,
    pub course: CourseId,
}

impl TestCourse {
    pub fn new(settings: CourseSettings, seed: u64) -> Self {
        Self::with_pool(settings, test_pool(), seed)
    }

    pub fn with_pool(settings: CourseSettings, pool: ReagentPool, seed: u64) -> Self {
        let store = MemoryStore::new();
        let course = CourseId::from("course-1");

        store.insert_course(Course::new(course.clone(), "Chemistry 101", settings));
        store.insert_reagent_pool(course.clone(), pool);

        Self {
            engine: GameplayEngine::new(store.clone(), ChaCha8Rng::seed_from_u64(seed)),
            store,
            course,
        }
    }

    pub fn add_team(&self, name: &str) -> TeamId {
        let team_id = TeamId::from(name);
        self.store.insert_team(Team {
            id: team_id.clone(),
            course: self.course.clone(),
            progression: ProgressionId::from(format!("{name}-progression")),
            members: vec![format!("{name}-member").into()],
        });
        team_id
    }

    pub async fn progression(&self, team: &TeamId) -> Progression {
        let team = self.store.team(team).await.unwrap().unwrap();
        let (_, progression) = self.store.progression(&team.progression).await.unwrap().unwrap();
        progression
    }

    /// Canonical answers of the team's outstanding assignment.
    pub async fn answers(&self, team: &TeamId) -> Vec<ReagentItem> {
        match self.progression(team).await.state {
            AssignmentState::Active(assignment) => assignment.answers,
            AssignmentState::Frozen(assignment) => assignment.answers,
            state => panic!("no outstanding assignment: {state:?}"),
        }
    }
}
