// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams towards the course, team, progression and freeze-record collaborators.
//!
//! Read interfaces are plain lookups. The one write interface,
//! [`ProgressionStore::commit_progression`], applies a progression update and its effect on the
//! course's variant reservation set as a single atomic step guarded by a compare-and-set on the
//! progression's version. Backends either apply the whole commit or none of it.

mod memory;
#[cfg(test)]
mod tests;
mod traits;

pub use memory::MemoryStore;
pub use traits::{
    CourseStore, FreezeStore, GameplayStore, ProgressionStore, ReagentPoolStore, StoreError,
    TeamStore, VariantEffect, Version,
};
