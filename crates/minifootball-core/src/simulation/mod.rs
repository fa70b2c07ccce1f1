//! Authoritative simulation.
//!
//! The `Simulation` owns the only writable copy of the match. Each call to
//! [`Simulation::advance`] runs one fixed timestep through a chain of
//! resolvers and publishes the result as a [`SnapshotDelta`].
//!
//! # Tick pipeline
//!
//! 1. **SNAPSHOT**: `current` is the last published tick and stays frozen.
//! 2. **RESOLUTION**: `next` is cloned from `current`; resolvers run in a
//!    fixed order, each seeing the output of the ones before it:
//!    timers, commands, movement, collision, possession, integrity, rules.
//! 3. **APPLY**: the buffers swap and the tick's delta is built from the
//!    difference between the two.
//!
//! Nothing outside the simulation ever observes `next`, so a half-resolved
//! tick can never leak into a snapshot.
//!
//! # Phases
//!
//! ```text
//!  Kickoff ──hold──▶ Live ──goal──▶ GoalScored ──delay──▶ Kickoff
//!                     │ ▲
//!           pause()   │ │ resume()        Live ──clock 0──▶ FullTime
//!                     ▼ │
//!                    Paused
//! ```
//!
//! Only `Live` integrates motion. `FullTime` is terminal.
//!
//! # Example
//!
//! ```
//! use minifootball_core::config::MatchConfig;
//! use minifootball_core::simulation::{Phase, Simulation};
//!
//! let mut sim = Simulation::with_teams(MatchConfig::default());
//! assert_eq!(sim.state().phase, Phase::Kickoff);
//!
//! let delta = sim.advance(1, &[]).unwrap();
//! assert_eq!(delta.tick, 1);
//! assert_eq!(sim.state().phase, Phase::Live);
//! ```

pub mod kinematics;
mod world;

pub use world::{BallTouch, World};

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::CommandFrame;
use crate::config::MatchConfig;
use crate::entity::{Controller, EntityId, Formation, Team};
use crate::error::{SessionError, WireError};
use crate::replication::{EntityRecord, SnapshotDelta};
use crate::resolver::{
    CollisionResolver, CommandResolver, IntegrityResolver, MovementResolver, PossessionResolver,
    Resolver, RulesResolver, TickContext, TimerResolver,
};
use crate::tags::Tag;

// =============================================================================
// Match state
// =============================================================================

/// Phase of the match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Lined up, waiting for play to start
    Kickoff,
    /// Play is running
    Live,
    /// A goal was scored; waiting for the restart
    GoalScored,
    /// Suspended by the session
    Paused,
    /// The match is over
    FullTime,
}

/// Goals per team.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    /// Goals by team A
    pub team_a: u32,
    /// Goals by team B
    pub team_b: u32,
}

impl Score {
    /// Goals by `team`.
    #[must_use]
    pub fn of(&self, team: Team) -> u32 {
        match team {
            Team::A => self.team_a,
            Team::B => self.team_b,
        }
    }

    /// Adds one goal for `team`.
    pub fn add_goal(&mut self, team: Team) {
        match team {
            Team::A => self.team_a += 1,
            Team::B => self.team_b += 1,
        }
    }

    /// The leading team, `None` on a draw.
    #[must_use]
    pub fn leader(&self) -> Option<Team> {
        match self.team_a.cmp(&self.team_b) {
            std::cmp::Ordering::Greater => Some(Team::A),
            std::cmp::Ordering::Less => Some(Team::B),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.team_a, self.team_b)
    }
}

/// Tick, score and phase of the match.
///
/// Mutated only by the simulation, through phase transitions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchState {
    /// Last completed tick (0 before the first advance)
    pub tick: u64,
    /// Current score
    pub score: Score,
    /// Current phase
    pub phase: Phase,
    /// Team taking the next (or current) kickoff
    pub kickoff_team: Team,
    /// Live ticks left on the match clock
    pub clock_remaining: u64,
    /// Ticks completed in the current phase
    pub phase_ticks: u64,
    /// Team that scored most recently
    pub last_scorer: Option<Team>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MatchState {
    /// Kickoff at tick 0 with `clock` live ticks to play.
    #[must_use]
    pub fn new(clock: u64) -> Self {
        Self {
            tick: 0,
            score: Score::default(),
            phase: Phase::Kickoff,
            kickoff_team: Team::A,
            clock_remaining: clock,
            phase_ticks: 0,
            last_scorer: None,
        }
    }

    /// Switches phase and restarts the phase counter.
    pub(crate) fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(tick = self.tick, from = ?self.phase, to = ?phase, "phase transition");
        }
        self.phase = phase;
        self.phase_ticks = 0;
    }

    /// Returns `true` once the match is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::FullTime
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// Double-buffered authoritative simulation.
pub struct Simulation {
    current: World,
    next: World,
    published: Vec<EntityRecord>,
    config: MatchConfig,
    resolvers: Vec<Box<dyn Resolver>>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.current.state().tick)
            .field("phase", &self.current.state().phase)
            .field("entities", &self.current.len())
            .field("resolvers", &format!("[{} resolvers]", self.resolvers.len()))
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a simulation with an empty world.
    ///
    /// Spawn entities through [`Simulation::world_mut`] before the first
    /// advance, or use [`Simulation::with_teams`].
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        let world = World::new(MatchState::new(config.match_ticks()));
        Self {
            next: world.clone(),
            published: world.records(),
            current: world,
            config,
            resolvers: vec![
                Box::new(TimerResolver),
                Box::new(CommandResolver),
                Box::new(MovementResolver),
                Box::new(CollisionResolver),
                Box::new(PossessionResolver),
                Box::new(IntegrityResolver),
                Box::new(RulesResolver),
            ],
        }
    }

    /// Creates a simulation with both teams lined up for kickoff.
    #[must_use]
    pub fn with_teams(config: MatchConfig) -> Self {
        let mut sim = Self::new(config);
        let formation = Formation::for_team_size(sim.config.team_size);
        let field = sim.config.field.clone();
        sim.current.spawn_teams(formation, &field);
        sim.current.reset_for_kickoff(Team::A, &field);
        sim.current.tags_mut().drain_journal();
        sim.published = sim.current.records();
        sim
    }

    /// Runs one tick.
    ///
    /// `tick` must be exactly one past the last completed tick. `frames`
    /// are applied only while the match is live; otherwise they are
    /// discarded.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminal`] after full time and
    /// [`SessionError::OutOfOrder`] if `tick` does not follow on.
    pub fn advance(
        &mut self,
        tick: u64,
        frames: &[CommandFrame],
    ) -> Result<SnapshotDelta, SessionError> {
        let state = *self.current.state();
        if state.is_terminal() {
            return Err(SessionError::Terminal { tick: state.tick });
        }
        if tick != state.tick + 1 {
            return Err(SessionError::OutOfOrder {
                expected: state.tick + 1,
                got: tick,
            });
        }

        // RESOLUTION
        self.next.clone_from(&self.current);
        self.next.state_mut().tick = tick;
        let ctx = TickContext {
            tick,
            dt: self.config.dt(),
            config: &self.config,
            frames,
            current: &self.current,
        };
        for resolver in &self.resolvers {
            if resolver.active_in(state.phase) {
                resolver.resolve(&ctx, &mut self.next);
            }
        }

        // APPLY
        std::mem::swap(&mut self.current, &mut self.next);
        let tag_changes = self.current.tags_mut().drain_journal();
        let records = self.current.records();
        let delta = SnapshotDelta::between(
            tick,
            Some(state.tick),
            *self.current.state(),
            &self.published,
            &records,
            tag_changes,
        );
        self.published = records;
        Ok(delta)
    }

    /// Suspends a live match.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] unless the match is live.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.transition(Phase::Live, Phase::Paused)?;
        self.current.freeze();
        self.current.tags_mut().add_to_all(Tag::Paused);
        info!(tick = self.tick(), "match paused");
        Ok(())
    }

    /// Resumes a paused match.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] unless the match is paused.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.transition(Phase::Paused, Phase::Live)?;
        self.current.tags_mut().remove_from_all(Tag::Paused);
        info!(tick = self.tick(), "match resumed");
        Ok(())
    }

    fn transition(&mut self, from: Phase, to: Phase) -> Result<(), SessionError> {
        let phase = self.current.state().phase;
        if phase != from {
            return Err(SessionError::InvalidTransition { from: phase, to });
        }
        self.current.state_mut().enter(to);
        Ok(())
    }

    /// Hands a player to a new controller between ticks.
    ///
    /// Handing a player to the AI after a client left marks it unmanned.
    pub fn set_controller(&mut self, id: EntityId, controller: Controller) -> bool {
        let was_human = matches!(
            self.current.entity(id).map(|e| e.controller),
            Some(Controller::Human(_))
        );
        if !self.current.set_controller(id, controller) {
            return false;
        }
        match controller {
            Controller::Ai if was_human => {
                self.current.tags_mut().add_tag(id, Tag::Unmanned);
            }
            Controller::Human(_) => {
                self.current.tags_mut().remove_tag(id, Tag::Unmanned);
            }
            Controller::Ai | Controller::None => {}
        }
        true
    }

    /// The last published world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.current
    }

    /// Mutable access to the current world.
    ///
    /// Meant for scenario setup before or between ticks. Changes show up
    /// in the next tick's delta.
    #[must_use]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.current
    }

    /// Current match state.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        self.current.state()
    }

    /// Last completed tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.current.state().tick
    }

    /// The configuration this simulation runs with.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Records as of the last published tick.
    #[must_use]
    pub fn records(&self) -> &[EntityRecord] {
        &self.published
    }

    /// Number of resolvers in the chain.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Canonical byte encoding of the current world.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Codec`] if serialization fails.
    pub fn world_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(bincode::serialize(&self.current)?)
    }

    /// Hash of [`Simulation::world_bytes`], for comparing runs.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Codec`] if serialization fails.
    pub fn world_digest(&self) -> Result<u64, WireError> {
        let bytes = self.world_bytes()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }
}
