//! Client replica: mirror, prediction and reconciliation.
//!
//! The replica keeps a mirror of the server's records, predicts its own
//! player from local input with the same movement code the server runs,
//! and rebases that prediction every time an authoritative tick arrives.
//!
//! # Reconciliation
//!
//! When a delta for tick `T` is applied, the local player's state is reset
//! to the server's record at `T`, every pending input for ticks up to `T`
//! is dropped, and the remaining pending inputs are replayed on top. The
//! prediction therefore differs from the server's position exactly by the
//! effect of inputs the server has not processed yet.
//!
//! # Interpolation
//!
//! Remote entities are drawn between the two latest mirrored ticks; see
//! [`ClientReplica::interpolated_position`].

use std::collections::{BTreeMap, VecDeque};

use glam::Vec2;
use pitch::Bounds;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::delta::{DeltaFit, EntityRecord, SnapshotDelta};
use super::wire::{CommandMsg, SessionControl, WireMessage};
use crate::command::RawInput;
use crate::config::{MatchConfig, MovementConfig};
use crate::entity::{ClientId, EntityId, Kinematics};
use crate::error::WireError;
use crate::simulation::kinematics::{confine, step_player};
use crate::simulation::{MatchState, Phase, Score};
use crate::tags::TagSet;

/// Corrections smaller than this are not counted.
const CORRECTION_EPSILON: f32 = 1e-3;

/// An input sent but not yet confirmed by a server tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingInput {
    /// Tick it was predicted for
    pub tick: u64,
    /// The input
    pub input: RawInput,
}

/// Counters for one replica.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplicaStats {
    /// Deltas applied
    pub applied: u64,
    /// Deltas ignored because the mirror was already newer
    pub outdated: u64,
    /// Deltas ignored because their baseline was never received
    pub missing_baseline: u64,
    /// Reconciliations that moved the prediction
    pub corrections: u64,
    /// Largest single correction distance
    pub max_correction: f32,
}

/// What a decoded message did to the replica.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplicaEvent {
    /// A snapshot was applied or ignored
    Snapshot(DeltaFit),
    /// The server assigned this replica its player
    Welcomed,
    /// The match ended
    FullTime(Score),
    /// A message that clients do not act on
    Ignored,
}

/// Client-side view of the match.
#[derive(Debug, Clone)]
pub struct ClientReplica {
    client: Option<ClientId>,
    entity: EntityId,
    movement: MovementConfig,
    play_area: Bounds,
    dt: f32,
    mirror: BTreeMap<EntityId, EntityRecord>,
    state: Option<MatchState>,
    mirror_tick: Option<u64>,
    frames: VecDeque<(u64, BTreeMap<EntityId, Vec2>)>,
    predicted: Kinematics,
    pending: VecDeque<PendingInput>,
    next_tick: u64,
    stats: ReplicaStats,
}

impl ClientReplica {
    /// Creates an empty replica controlling `entity`.
    #[must_use]
    pub fn new(entity: EntityId, config: &MatchConfig) -> Self {
        Self {
            client: None,
            entity,
            movement: config.movement.clone(),
            play_area: config.field.play_area(),
            dt: config.dt(),
            mirror: BTreeMap::new(),
            state: None,
            mirror_tick: None,
            frames: VecDeque::with_capacity(2),
            predicted: Kinematics::default(),
            pending: VecDeque::new(),
            next_tick: 1,
            stats: ReplicaStats::default(),
        }
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Applies `input` locally for the next tick and returns the command to send.
    ///
    /// The player only moves while the mirrored match is live, matching what
    /// the server will do with the same input.
    pub fn predict(&mut self, input: RawInput) -> CommandMsg {
        let tick = self.next_tick;
        self.next_tick += 1;

        if self.is_live() {
            let stunned = self.local_tags().contains(TagSet::STUNNED);
            self.step(&input, stunned);
        }
        self.pending.push_back(PendingInput { tick, input });

        CommandMsg {
            entity: self.entity,
            input,
            client_tick: tick,
        }
    }

    fn step(&mut self, input: &RawInput, stunned: bool) {
        step_player(&mut self.predicted, input, stunned, &self.movement, self.dt);
        confine(&mut self.predicted, &self.play_area);
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Applies a delta if it fits the mirror, then reconciles.
    pub fn receive(&mut self, delta: &SnapshotDelta) -> DeltaFit {
        let fit = delta.fit(self.mirror_tick);
        match fit {
            DeltaFit::Applies => {}
            DeltaFit::Outdated => {
                self.stats.outdated += 1;
                trace!(tick = delta.tick, mirror = ?self.mirror_tick, "outdated delta ignored");
                return fit;
            }
            DeltaFit::MissingBaseline => {
                self.stats.missing_baseline += 1;
                debug!(tick = delta.tick, baseline = ?delta.baseline, mirror = ?self.mirror_tick, "delta without baseline ignored");
                return fit;
            }
        }

        if delta.is_keyframe() {
            self.mirror.clear();
        }
        for record in &delta.entities {
            self.mirror.insert(record.id, *record);
        }
        self.state = Some(delta.state);
        self.mirror_tick = Some(delta.tick);
        self.next_tick = self.next_tick.max(delta.tick + 1);
        self.stats.applied += 1;

        let positions = self
            .mirror
            .values()
            .map(|r| (r.id, r.kinematics.position))
            .collect();
        self.frames.push_back((delta.tick, positions));
        while self.frames.len() > 2 {
            self.frames.pop_front();
        }

        self.reconcile(delta.tick);
        fit
    }

    fn reconcile(&mut self, tick: u64) {
        let Some(authoritative) = self.mirror.get(&self.entity).copied() else {
            return;
        };
        let before = self.predicted.position;

        while self.pending.front().is_some_and(|p| p.tick <= tick) {
            self.pending.pop_front();
        }

        self.predicted = authoritative.kinematics;
        if self.is_live() {
            let stunned = authoritative.tags.contains(TagSet::STUNNED);
            let replay: Vec<_> = self.pending.iter().map(|p| p.input).collect();
            for input in &replay {
                self.step(input, stunned);
            }
        }

        let correction = self.predicted.position.distance(before);
        if correction > CORRECTION_EPSILON {
            self.stats.corrections += 1;
            self.stats.max_correction = self.stats.max_correction.max(correction);
            trace!(tick, correction, pending = self.pending.len(), "prediction corrected");
        }
    }

    /// Decodes and handles one framed message from the server.
    ///
    /// # Errors
    ///
    /// Returns the [`WireError`] if the bytes do not decode.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Result<ReplicaEvent, WireError> {
        Ok(match WireMessage::decode(bytes)? {
            WireMessage::Snapshot(delta) => ReplicaEvent::Snapshot(self.receive(&delta)),
            WireMessage::Control(SessionControl::Welcome { client, entity }) => {
                self.client = Some(client);
                self.entity = entity;
                ReplicaEvent::Welcomed
            }
            WireMessage::Control(SessionControl::FullTime { score }) => ReplicaEvent::FullTime(score),
            WireMessage::Command(_) | WireMessage::Control(_) => ReplicaEvent::Ignored,
        })
    }

    /// An acknowledgement of the current mirror, if there is one.
    #[must_use]
    pub fn ack(&self) -> Option<WireMessage> {
        self.mirror_tick
            .map(|tick| WireMessage::Control(SessionControl::Ack { tick }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Position of `id` for rendering at `alpha` between the two latest ticks.
    ///
    /// `alpha` is clamped to `[0, 1]`; 1 is the latest tick. The local player
    /// is always drawn at its predicted position.
    #[must_use]
    pub fn interpolated_position(&self, id: EntityId, alpha: f32) -> Option<Vec2> {
        if id == self.entity && self.mirror.contains_key(&id) {
            return Some(self.predicted.position);
        }
        let latest = self.frames.back()?.1.get(&id).copied()?;
        let earlier = if self.frames.len() == 2 {
            self.frames.front().and_then(|(_, f)| f.get(&id).copied())
        } else {
            None
        };
        Some(earlier.map_or(latest, |from| from.lerp(latest, alpha.clamp(0.0, 1.0))))
    }

    /// Predicted state of the local player.
    #[must_use]
    pub fn predicted(&self) -> &Kinematics {
        &self.predicted
    }

    /// Predicted position of the local player.
    #[must_use]
    pub fn predicted_position(&self) -> Vec2 {
        self.predicted.position
    }

    /// The mirrored record for `id`.
    #[must_use]
    pub fn mirror_record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.mirror.get(&id)
    }

    /// All mirrored records in id order.
    pub fn mirror_records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.mirror.values()
    }

    /// Mirrored match state.
    #[must_use]
    pub fn mirror_state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    /// Tick of the mirror.
    #[must_use]
    pub fn mirror_tick(&self) -> Option<u64> {
        self.mirror_tick
    }

    fn is_live(&self) -> bool {
        self.state.is_some_and(|s| s.phase == Phase::Live)
    }

    fn local_tags(&self) -> TagSet {
        self.mirror
            .get(&self.entity)
            .map_or(TagSet::empty(), |r| r.tags)
    }

    /// Tick the next prediction will target.
    #[must_use]
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    /// Inputs not yet confirmed.
    #[must_use]
    pub fn pending(&self) -> &VecDeque<PendingInput> {
        &self.pending
    }

    /// Player this replica controls.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Client id assigned by the server.
    #[must_use]
    pub fn client(&self) -> Option<ClientId> {
        self.client
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> ReplicaStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;

    fn live_pair() -> (Simulation, ClientReplica) {
        let mut sim = Simulation::with_teams(MatchConfig::default());
        let mut replica = ClientReplica::new(EntityId::new(1), sim.config());
        let delta = sim.advance(1, &[]).unwrap();
        let key = SnapshotDelta::keyframe(1, delta.state, sim.records(), vec![]);
        assert_eq!(replica.receive(&key), DeltaFit::Applies);
        (sim, replica)
    }

    #[test]
    fn keyframe_fills_the_mirror() {
        let (sim, replica) = live_pair();
        assert_eq!(replica.mirror_tick(), Some(1));
        assert_eq!(replica.mirror_records().count(), sim.world().len());
        assert_eq!(replica.next_tick(), 2);
        assert_eq!(
            replica.predicted_position(),
            sim.world().entity(EntityId::new(1)).unwrap().position()
        );
    }

    #[test]
    fn predict_moves_and_queues() {
        let (_, mut replica) = live_pair();
        let start = replica.predicted_position();
        let msg = replica.predict(RawInput::moving(Vec2::Y));
        assert_eq!(msg.client_tick, 2);
        assert_eq!(msg.entity, EntityId::new(1));
        assert!(replica.predicted_position().y > start.y);
        assert_eq!(replica.pending().len(), 1);
    }

    #[test]
    fn outdated_and_baseless_deltas_are_ignored() {
        let (sim, mut replica) = live_pair();
        let stale = SnapshotDelta::keyframe(1, *sim.state(), sim.records(), vec![]);
        assert_eq!(replica.receive(&stale), DeltaFit::Outdated);

        let gap = SnapshotDelta::between(5, Some(4), *sim.state(), &[], &[], vec![]);
        assert_eq!(replica.receive(&gap), DeltaFit::MissingBaseline);
        assert_eq!(replica.stats().outdated, 1);
        assert_eq!(replica.stats().missing_baseline, 1);
        assert_eq!(replica.mirror_tick(), Some(1));
    }

    #[test]
    fn interpolation_blends_remote_entities() {
        let (mut sim, mut replica) = live_pair();
        let remote = EntityId::new(4);
        let from = sim.world().entity(remote).unwrap().position();
        sim.world_mut().entity_mut(remote).unwrap().place(from + Vec2::new(100.0, 0.0));
        let delta = sim.advance(2, &[]).unwrap();
        replica.receive(&delta);

        let mid = replica.interpolated_position(remote, 0.5).unwrap();
        assert!((mid.x - (from.x + 50.0)).abs() < 1e-3);
        let end = replica.interpolated_position(remote, 7.0).unwrap();
        assert!((end.x - (from.x + 100.0)).abs() < 1e-3);
        assert!(replica.interpolated_position(EntityId::new(99), 0.5).is_none());
    }

    #[test]
    fn welcome_and_ack_messages() {
        let (_, mut replica) = live_pair();
        let welcome = WireMessage::Control(SessionControl::Welcome {
            client: ClientId::new(3),
            entity: EntityId::new(2),
        });
        let event = replica.handle_bytes(&welcome.encode().unwrap()).unwrap();
        assert_eq!(event, ReplicaEvent::Welcomed);
        assert_eq!(replica.client(), Some(ClientId::new(3)));
        assert_eq!(replica.entity(), EntityId::new(2));
        assert_eq!(
            replica.ack(),
            Some(WireMessage::Control(SessionControl::Ack { tick: 1 }))
        );
        assert!(replica.handle_bytes(&[0, 1]).is_err());
    }
}
