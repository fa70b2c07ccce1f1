//! Snapshot deltas.
//!
//! A delta carries absolute records, never arithmetic differences. A delta
//! with baseline `B` lists every entity whose record at some tick in
//! `[B, tick)` differs from its record at `tick`, so it brings a mirror at
//! any tick `M` with `B <= M < tick` to exactly the server state at `tick`.
//! A delta without a baseline is a keyframe that lists every entity and
//! applies to any mirror, including an empty one.

use serde::{Deserialize, Serialize};

use crate::entity::{Controller, Entity, EntityId, EntityKind, Kinematics, Team};
use crate::simulation::MatchState;
use crate::tags::{TagChange, TagSet};

/// Replicated state of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id
    pub id: EntityId,
    /// Player or ball
    pub kind: EntityKind,
    /// Team, `None` for the ball
    pub team: Option<Team>,
    /// Who drives it
    pub controller: Controller,
    /// Position, velocity and facing
    pub kinematics: Kinematics,
    /// Full tag set
    pub tags: TagSet,
}

impl EntityRecord {
    /// Builds the record for `entity` with its tag set.
    #[must_use]
    pub fn from_entity(entity: &Entity, tags: TagSet) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind(),
            team: entity.team(),
            controller: entity.controller,
            kinematics: entity.kinematics,
            tags,
        }
    }

    /// Returns `true` if this entity holds the ball.
    #[must_use]
    pub fn has_possession(&self) -> bool {
        self.tags.contains(TagSet::POSSESSION)
    }
}

/// Why a delta could not be applied to a mirror.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeltaFit {
    /// The delta applies
    Applies,
    /// The mirror is already at or past the delta's tick
    Outdated,
    /// The mirror is older than the delta's baseline (or empty)
    MissingBaseline,
}

/// What changed in one tick, relative to a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDelta {
    /// Tick this delta brings a mirror to
    pub tick: u64,
    /// Tick the entity list was diffed against; `None` for a keyframe
    pub baseline: Option<u64>,
    /// Match state at `tick`
    pub state: MatchState,
    /// Records of entities that changed since `baseline`, in id order
    pub entities: Vec<EntityRecord>,
    /// Tag mutations made after `baseline` up to `tick`, in order; for a
    /// keyframe, those made during `tick`
    pub tag_changes: Vec<TagChange>,
}

impl SnapshotDelta {
    /// Diffs `current` against `previous` (the records at `baseline`).
    ///
    /// With `baseline == None` every record is included.
    #[must_use]
    pub fn between(
        tick: u64,
        baseline: Option<u64>,
        state: MatchState,
        previous: &[EntityRecord],
        current: &[EntityRecord],
        tag_changes: Vec<TagChange>,
    ) -> Self {
        let entities = match baseline {
            None => current.to_vec(),
            Some(_) => current
                .iter()
                .filter(|&rec| previous.get(rec.id.index()) != Some(rec))
                .copied()
                .collect(),
        };
        Self {
            tick,
            baseline,
            state,
            entities,
            tag_changes,
        }
    }

    /// Diffs `current` against the records of every tick from `baseline` on.
    ///
    /// `earlier` holds the records of ticks `baseline..tick`. An entity is
    /// listed if its record at any of them differs from `current`, which
    /// catches entities that changed and changed back within the span.
    #[must_use]
    pub fn covering(
        tick: u64,
        baseline: u64,
        state: MatchState,
        earlier: &[&[EntityRecord]],
        current: &[EntityRecord],
        tag_changes: Vec<TagChange>,
    ) -> Self {
        let entities = current
            .iter()
            .filter(|&rec| {
                earlier
                    .iter()
                    .any(|records| records.get(rec.id.index()) != Some(rec))
            })
            .copied()
            .collect();
        Self {
            tick,
            baseline: Some(baseline),
            state,
            entities,
            tag_changes,
        }
    }

    /// A keyframe listing every record.
    #[must_use]
    pub fn keyframe(
        tick: u64,
        state: MatchState,
        records: &[EntityRecord],
        tag_changes: Vec<TagChange>,
    ) -> Self {
        Self::between(tick, None, state, &[], records, tag_changes)
    }

    /// Returns `true` if this delta lists every entity.
    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        self.baseline.is_none()
    }

    /// Checks whether a mirror last updated at `mirror_tick` can take this delta.
    #[must_use]
    pub fn fit(&self, mirror_tick: Option<u64>) -> DeltaFit {
        if mirror_tick.is_some_and(|m| m >= self.tick) {
            return DeltaFit::Outdated;
        }
        match (self.baseline, mirror_tick) {
            (None, _) => DeltaFit::Applies,
            (Some(base), Some(m)) if base <= m => DeltaFit::Applies,
            _ => DeltaFit::MissingBaseline,
        }
    }

    /// The record for `id`, if it changed.
    #[must_use]
    pub fn record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.iter().find(|r| r.id == id)
    }
}
