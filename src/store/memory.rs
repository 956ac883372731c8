// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store backend.
//!
//! This does not persist data permanently, all state is lost when the process ends. Use this in
//! development and test contexts, or as the reference semantics for a real document-store
//! backend: every trait method here is one critical section, matching the atomicity the traits
//! demand from production implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::catalog::ReagentPool;
use crate::course::{Course, CourseId, Team, TeamId};
use crate::freeze::{FreezeId, FreezeRecord, NewFreeze};
use crate::progression::{Progression, ProgressionId};
use crate::store::traits::{
    CourseStore, FreezeStore, ProgressionStore, ReagentPoolStore, StoreError, TeamStore,
    VariantEffect, Version,
};

#[derive(Debug, Default)]
pub struct InnerMemoryStore {
    courses: HashMap<CourseId, Course>,
    pools: HashMap<CourseId, ReagentPool>,
    teams: HashMap<TeamId, Team>,
    progressions: HashMap<ProgressionId, (Version, Progression)>,
    freezes: HashMap<FreezeId, FreezeRecord>,
    freeze_counter: u64,
    resolution_subscribers: Vec<mpsc::UnboundedSender<FreezeId>>,
}

/// An in-memory store for courses, teams, progressions and freeze records.
///
/// Supports usage in asynchronous and multi-threaded contexts by wrapping an `InnerMemoryStore`
/// with an `RwLock` and `Arc`. Convenience methods are provided to obtain a read- or write-lock
/// on the underlying store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Seeds a course document.
    pub fn insert_course(&self, course: Course) {
        self.write_store().courses.insert(course.id.clone(), course);
    }

    /// Seeds a course's puzzle catalog.
    pub fn insert_reagent_pool(&self, course: CourseId, pool: ReagentPool) {
        self.write_store().pools.insert(course, pool);
    }

    /// Seeds a team document together with its fresh progression record.
    ///
    /// The two records are created in the same critical section; a team is never observable
    /// without its progression.
    pub fn insert_team(&self, team: Team) {
        let mut store = self.write_store();
        store
            .progressions
            .insert(team.progression.clone(), (0, Progression::default()));
        store.teams.insert(team.id.clone(), team);
    }

    /// Marks a freeze record resolved, standing in for the external reviewer.
    ///
    /// Returns `true` when this call performed the false-to-true transition and `false` when the
    /// record was already resolved. Subscribers are notified only on the transition.
    pub fn resolve_freeze(&self, id: &FreezeId) -> Result<bool, StoreError> {
        let mut store = self.write_store();
        let record = store
            .freezes
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownFreeze(id.clone()))?;

        if record.resolved {
            return Ok(false);
        }
        record.resolved = true;

        store
            .resolution_subscribers
            .retain(|subscriber| subscriber.send(id.clone()).is_ok());

        Ok(true)
    }
}

impl CourseStore for MemoryStore {
    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.read_store().courses.get(id).cloned())
    }
}

impl TeamStore for MemoryStore {
    async fn team(&self, id: &TeamId) -> Result<Option<Team>, StoreError> {
        Ok(self.read_store().teams.get(id).cloned())
    }
}

impl ReagentPoolStore for MemoryStore {
    async fn reagent_pool(&self, course: &CourseId) -> Result<Option<ReagentPool>, StoreError> {
        Ok(self.read_store().pools.get(course).cloned())
    }
}

impl ProgressionStore for MemoryStore {
    async fn progression(
        &self,
        id: &ProgressionId,
    ) -> Result<Option<(Version, Progression)>, StoreError> {
        Ok(self.read_store().progressions.get(id).cloned())
    }

    async fn commit_progression(
        &self,
        id: &ProgressionId,
        expected_version: Version,
        next: Progression,
        effect: VariantEffect,
    ) -> Result<Version, StoreError> {
        let mut guard = self.write_store();
        let store = &mut *guard;

        // Validate every precondition before mutating anything so a failed commit leaves the
        // store untouched.
        if let VariantEffect::Reserve(course_id, variant) = &effect {
            let course = store
                .courses
                .get(course_id)
                .ok_or_else(|| StoreError::UnknownCourse(course_id.clone()))?;
            if course.assigned_variants.contains(variant) {
                return Err(StoreError::VariantInUse(variant.clone()));
            }
        }
        if let VariantEffect::Release(course_id, _) = &effect {
            if !store.courses.contains_key(course_id) {
                return Err(StoreError::UnknownCourse(course_id.clone()));
            }
        }

        let entry = store
            .progressions
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownProgression(id.clone()))?;
        if entry.0 != expected_version {
            return Err(StoreError::Conflict);
        }

        entry.0 += 1;
        entry.1 = next;
        let version = entry.0;

        match effect {
            VariantEffect::None => {}
            VariantEffect::Reserve(course_id, variant) => {
                // Checked above; the course still exists inside this critical section.
                store
                    .courses
                    .get_mut(&course_id)
                    .expect("reserve against existing course")
                    .assigned_variants
                    .insert(variant);
            }
            VariantEffect::Release(course_id, variant) => {
                store
                    .courses
                    .get_mut(&course_id)
                    .expect("release against existing course")
                    .assigned_variants
                    .remove(&variant);
            }
        }

        Ok(version)
    }
}

impl FreezeStore for MemoryStore {
    async fn create_freeze(&self, new: NewFreeze) -> Result<FreezeId, StoreError> {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock after unix epoch")
            .as_secs();

        let mut store = self.write_store();
        store.freeze_counter += 1;
        let id = FreezeId::from(format!("iceberg-{}", store.freeze_counter));
        store
            .freezes
            .insert(id.clone(), FreezeRecord::new(id.clone(), new, created_at));

        Ok(id)
    }

    async fn freeze(&self, id: &FreezeId) -> Result<Option<FreezeRecord>, StoreError> {
        Ok(self.read_store().freezes.get(id).cloned())
    }

    fn subscribe_resolutions(&self) -> mpsc::UnboundedReceiver<FreezeId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write_store().resolution_subscribers.push(tx);
        rx
    }
}
