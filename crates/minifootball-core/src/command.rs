//! Command pipeline.
//!
//! Clients send raw input stamped with the tick they predicted it for. The
//! pipeline validates it, gives it a server sequence number and buffers it
//! per entity. At the start of every tick the simulation takes exactly one
//! frame per entity: the newest one that targets that tick or earlier.
//!
//! # Acceptance window
//!
//! With server tick `S`, staleness bound `K` and lead `L`, a command for
//! client tick `C` is accepted when `S - K <= C <= S + L`. Everything else is
//! rejected and logged; rejection never affects the simulation.
//!
//! # Ordering
//!
//! - Two frames for the same entity and tick: the later arrival wins.
//! - Frames for future ticks wait in a per-entity reorder buffer of bounded
//!   size. When it is full the oldest frame is evicted.
//! - The frames handed to one tick are ordered by entity id.

use std::collections::BTreeMap;

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::NetConfig;
use crate::entity::EntityId;
use crate::error::CommandRejection;

bitflags! {
    /// Buttons pressed this tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ActionBits: u8 {
        /// Kick the ball along the facing direction
        const KICK = 1 << 0;
        /// Try to take the ball from a nearby opponent
        const TACKLE = 1 << 1;
        /// Move at sprint speed
        const SPRINT = 1 << 2;
        /// Pass the ball along the facing direction, softer than a kick
        const PASS = 1 << 3;
    }
}

impl Default for ActionBits {
    fn default() -> Self {
        Self::empty()
    }
}

/// Movement direction plus action buttons, as produced by a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    /// Desired movement direction; its length scales the speed
    pub movement: Vec2,
    /// Buttons pressed
    pub actions: ActionBits,
}

impl RawInput {
    /// Standing still with no buttons.
    pub const IDLE: Self = Self {
        movement: Vec2::ZERO,
        actions: ActionBits::empty(),
    };

    /// Creates an input.
    #[must_use]
    pub fn new(movement: Vec2, actions: ActionBits) -> Self {
        Self { movement, actions }
    }

    /// Movement only.
    #[must_use]
    pub fn moving(movement: Vec2) -> Self {
        Self::new(movement, ActionBits::empty())
    }

    /// Checks the input is usable.
    ///
    /// # Errors
    ///
    /// Returns a reason if the vector is not finite or longer than `max_magnitude`.
    pub fn check(&self, max_magnitude: f32) -> Result<(), &'static str> {
        if !self.movement.is_finite() {
            return Err("non-finite movement");
        }
        if self.movement.length() > max_magnitude {
            return Err("movement magnitude too large");
        }
        Ok(())
    }

    /// Same input without one-shot actions.
    #[must_use]
    pub fn held(&self) -> Self {
        Self {
            movement: self.movement,
            actions: self.actions & ActionBits::SPRINT,
        }
    }
}

/// A validated, sequenced command for one entity and tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    /// Entity the command drives
    pub entity: EntityId,
    /// The input
    pub input: RawInput,
    /// Tick the command targets
    pub client_tick: u64,
    /// Server-assigned arrival order
    pub sequence: u64,
}

/// Counters describing pipeline traffic since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Frames accepted
    pub accepted: u64,
    /// Frames rejected as stale
    pub stale: u64,
    /// Frames rejected for targeting the future
    pub too_far_ahead: u64,
    /// Frames rejected for bad input
    pub malformed: u64,
    /// Buffered frames replaced by a later arrival for the same tick
    pub replaced: u64,
    /// Buffered frames evicted because the reorder buffer was full
    pub evicted: u64,
    /// Buffered frames skipped because a newer one covered the same tick
    pub superseded: u64,
    /// Frames handed to the simulation
    pub delivered: u64,
}

/// Validates, orders and buffers command frames.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    config: NetConfig,
    server_tick: u64,
    next_sequence: u64,
    queues: BTreeMap<EntityId, BTreeMap<u64, CommandFrame>>,
    stats: PipelineStats,
}

impl CommandPipeline {
    /// Creates an empty pipeline at server tick 0.
    #[must_use]
    pub fn new(config: NetConfig) -> Self {
        Self {
            config,
            server_tick: 0,
            next_sequence: 0,
            queues: BTreeMap::new(),
            stats: PipelineStats::default(),
        }
    }

    /// The tick commands are currently validated against.
    #[must_use]
    pub fn server_tick(&self) -> u64 {
        self.server_tick
    }

    /// Moves the acceptance window to `tick`.
    pub fn set_server_tick(&mut self, tick: u64) {
        self.server_tick = tick;
    }

    /// Validates a client command and buffers it.
    ///
    /// Returns the sequenced frame on acceptance.
    ///
    /// # Errors
    ///
    /// Returns the [`CommandRejection`] reason. Rejected frames are dropped.
    pub fn submit(
        &mut self,
        input: RawInput,
        entity: EntityId,
        client_tick: u64,
    ) -> Result<CommandFrame, CommandRejection> {
        if let Err(reason) = self.validate(input, entity, client_tick) {
            match reason {
                CommandRejection::Stale { .. } => self.stats.stale += 1,
                CommandRejection::TooFarAhead { .. } => self.stats.too_far_ahead += 1,
                CommandRejection::Malformed { .. } => self.stats.malformed += 1,
            }
            debug!(%entity, client_tick, server_tick = self.server_tick, %reason, "command rejected");
            return Err(reason);
        }

        let frame = self.sequence(input, entity, client_tick);
        self.enqueue(frame);
        self.stats.accepted += 1;
        trace!(%entity, client_tick, sequence = frame.sequence, "command accepted");
        Ok(frame)
    }

    /// Sequences a frame produced on the server (AI) without buffering it.
    pub fn issue_local(&mut self, input: RawInput, entity: EntityId, tick: u64) -> CommandFrame {
        self.sequence(input, entity, tick)
    }

    fn validate(
        &self,
        input: RawInput,
        entity: EntityId,
        client_tick: u64,
    ) -> Result<(), CommandRejection> {
        if client_tick.saturating_add(self.config.staleness_bound) < self.server_tick {
            return Err(CommandRejection::Stale {
                entity,
                client_tick,
                server_tick: self.server_tick,
            });
        }
        if client_tick > self.server_tick.saturating_add(self.config.max_lead) {
            return Err(CommandRejection::TooFarAhead {
                entity,
                client_tick,
                server_tick: self.server_tick,
            });
        }
        input
            .check(self.config.max_input_magnitude)
            .map_err(|reason| CommandRejection::Malformed { entity, reason })
    }

    fn sequence(&mut self, input: RawInput, entity: EntityId, client_tick: u64) -> CommandFrame {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        CommandFrame {
            entity,
            input,
            client_tick,
            sequence,
        }
    }

    fn enqueue(&mut self, frame: CommandFrame) {
        let capacity = self.config.reorder_capacity.max(1);
        let queue = self.queues.entry(frame.entity).or_default();

        if queue.insert(frame.client_tick, frame).is_some() {
            self.stats.replaced += 1;
            return;
        }
        while queue.len() > capacity {
            if let Some((tick, _)) = queue.pop_first() {
                self.stats.evicted += 1;
                debug!(entity = %frame.entity, tick, "reorder buffer full, evicted oldest frame");
            }
        }
    }

    /// Hands the frames for `tick` to the simulation.
    ///
    /// For each entity, takes the newest buffered frame targeting `tick` or
    /// earlier and discards older ones. Frames for later ticks stay buffered.
    /// The result is ordered by entity id and the taken frames are gone from
    /// the pipeline.
    pub fn begin_tick(&mut self, tick: u64) -> Vec<CommandFrame> {
        self.server_tick = tick;
        let mut frames = Vec::new();

        for queue in self.queues.values_mut() {
            let future = queue.split_off(&(tick + 1));
            let due = std::mem::replace(queue, future);
            let count = due.len() as u64;
            if let Some((_, frame)) = due.into_iter().next_back() {
                frames.push(frame);
                self.stats.superseded += count - 1;
            }
        }
        self.queues.retain(|_, q| !q.is_empty());

        self.stats.delivered += frames.len() as u64;
        frames
    }

    /// Drops everything buffered for `entity`. Returns how many frames went.
    pub fn cancel_entity(&mut self, entity: EntityId) -> usize {
        self.queues.remove(&entity).map_or(0, |q| q.len())
    }

    /// Drops every buffered frame.
    pub fn clear(&mut self) {
        self.queues.clear();
    }

    /// Number of buffered frames.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queues.values().map(BTreeMap::len).sum()
    }

    /// Traffic counters.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}
