//! Match session: tick cadence, clients and lifecycle.
//!
//! A [`MatchSession`] owns the simulation, the command pipeline, the AI
//! engine and the replication server, and wires them together once per
//! tick:
//!
//! 1. Drain every client link: commands into the pipeline, acks into the
//!    replication server, disconnects handled.
//! 2. Take the pipeline's frames for the tick (human players only).
//! 3. Let the AI decide for every AI-controlled player.
//! 4. Advance the simulation.
//! 5. Send each client its delta, and the final score at full time.
//!
//! Arrivals are only looked at in step 1, so anything a client sends while
//! a tick runs waits for the next one.
//!
//! Once the match reaches full time the session is inert: [`MatchSession::tick`]
//! reports [`SessionError::Terminal`] and nothing can reopen it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::AiEngine;
use crate::command::{CommandFrame, CommandPipeline, PipelineStats};
use crate::config::MatchConfig;
use crate::entity::{ClientId, Controller, EntityId, Team};
use crate::error::{ConfigError, SessionError};
use crate::pitch::Navigator;
use crate::replication::{
    link_pair, Delivery, EntityRecord, Link, Loss, ReplicationServer, SessionControl,
    SnapshotDelta, WireMessage,
};
use crate::simulation::{MatchState, Phase, Score, Simulation};

// =============================================================================
// Clock
// =============================================================================

/// Fixed-rate tick pacing.
///
/// Deadlines advance by exactly one tick each time. If the caller falls more
/// than a tick behind, the schedule restarts from now instead of bursting to
/// catch up.
#[derive(Debug, Clone)]
pub struct Clock {
    tick_duration: Duration,
    next_deadline: Instant,
}

impl Clock {
    /// A clock ticking `tick_rate` times per second, first deadline one tick from now.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            next_deadline: Instant::now() + tick_duration,
        }
    }

    /// Length of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Sleeps until the next deadline and schedules the one after.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next_deadline.checked_duration_since(now) {
            std::thread::sleep(remaining);
            self.next_deadline += self.tick_duration;
        } else if now.duration_since(self.next_deadline) > self.tick_duration {
            self.next_deadline = now + self.tick_duration;
        } else {
            self.next_deadline += self.tick_duration;
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Tick that ran
    pub tick: u64,
    /// Phase after the tick
    pub phase: Phase,
    /// Score after the tick
    pub score: Score,
    /// Client frames applied
    pub human_frames: usize,
    /// AI frames applied
    pub ai_frames: usize,
    /// AI decisions that reused their previous input
    pub ai_fallbacks: usize,
    /// Entities in the published delta
    pub changed_entities: usize,
    /// Snapshot messages handed to client links
    pub snapshots_sent: usize,
    /// Snapshot messages lost on client links
    pub snapshots_dropped: usize,
}

/// Final result, handed to whatever stores match history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Match id from the configuration
    pub match_id: u64,
    /// Final score
    pub score: Score,
    /// Winning team, `None` on a draw
    pub winner: Option<Team>,
    /// Tick at which the match ended
    pub ticks: u64,
}

// =============================================================================
// Clients
// =============================================================================

/// The client's side of a connection.
#[derive(Debug)]
pub struct ClientEndpoint {
    /// Assigned client id
    pub client: ClientId,
    /// Player the client drives
    pub entity: EntityId,
    /// Link to the session
    pub link: Link,
}

#[derive(Debug)]
struct ClientSlot {
    entity: EntityId,
    link: Link,
}

// =============================================================================
// Session
// =============================================================================

/// Runs one match from kickoff to full time.
pub struct MatchSession {
    sim: Simulation,
    pipeline: CommandPipeline,
    ai: AiEngine,
    replication: ReplicationServer,
    nav: Box<dyn Navigator>,
    clients: BTreeMap<ClientId, ClientSlot>,
    next_client: u32,
    started: bool,
}

impl fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchSession")
            .field("sim", &self.sim)
            .field("clients", &self.clients.len())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl MatchSession {
    /// Creates a session with both teams lined up and every player on AI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration does not validate.
    pub fn new(config: MatchConfig, nav: Box<dyn Navigator>) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = CommandPipeline::new(config.net.clone());
        let replication = ReplicationServer::new(config.net.replay_buffer_ticks);
        let sim = Simulation::with_teams(config);
        let mut ai = AiEngine::new();
        ai.sync(sim.world());

        info!(
            match_id = sim.config().match_id,
            players = sim.world().players().count(),
            tick_rate = sim.config().tick_rate,
            "match session created"
        );
        Ok(Self {
            sim,
            pipeline,
            ai,
            replication,
            nav,
            clients: BTreeMap::new(),
            next_client: 1,
            started: false,
        })
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Hands the lowest-id AI player to a new client.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminal`] after full time and
    /// [`SessionError::NoFreeSlot`] if every player already has a client.
    pub fn connect(&mut self) -> Result<ClientEndpoint, SessionError> {
        self.connect_with_loss(Loss::None)
    }

    /// Like [`MatchSession::connect`], losing server-to-client messages per `loss`.
    ///
    /// # Errors
    ///
    /// As [`MatchSession::connect`].
    pub fn connect_with_loss(&mut self, loss: Loss) -> Result<ClientEndpoint, SessionError> {
        self.ensure_open()?;
        let entity = self
            .sim
            .world()
            .players()
            .find(|p| p.is_ai())
            .map(crate::entity::Entity::id)
            .ok_or(SessionError::NoFreeSlot)?;

        let client = ClientId::new(self.next_client);
        self.next_client += 1;
        self.sim.set_controller(entity, Controller::Human(client));

        let (server_end, client_end) = link_pair();
        let mut link = server_end.with_loss(loss);
        let welcome = WireMessage::Control(SessionControl::Welcome { client, entity });
        match welcome.encode() {
            Ok(bytes) => {
                link.send(bytes);
            }
            Err(err) => warn!(%client, %err, "failed to encode welcome"),
        }
        self.clients.insert(client, ClientSlot { entity, link });
        info!(%client, %entity, "client connected");

        Ok(ClientEndpoint {
            client,
            entity,
            link: client_end,
        })
    }

    /// Removes a client and hands its player back to the AI as unmanned.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownClient`] if `client` is not connected.
    pub fn disconnect(&mut self, client: ClientId) -> Result<EntityId, SessionError> {
        let slot = self
            .clients
            .remove(&client)
            .ok_or(SessionError::UnknownClient(client))?;
        let cancelled = self.pipeline.cancel_entity(slot.entity);
        self.replication.forget(client);
        if !self.sim.state().is_terminal() {
            self.sim.set_controller(slot.entity, Controller::Ai);
        }
        info!(%client, entity = %slot.entity, cancelled, "client disconnected");
        Ok(slot.entity)
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Player driven by `client`.
    #[must_use]
    pub fn client_entity(&self, client: ClientId) -> Option<EntityId> {
        self.clients.get(&client).map(|s| s.entity)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Allows ticks to run.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            info!(match_id = self.sim.config().match_id, "kickoff");
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        let state = self.sim.state();
        if state.is_terminal() {
            return Err(SessionError::Terminal { tick: state.tick });
        }
        Ok(())
    }

    /// Suspends a live match.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminal`] after full time, otherwise
    /// [`SessionError::InvalidTransition`] unless the match is live.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.sim.pause()
    }

    /// Resumes a paused match, discarding commands buffered during the pause.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminal`] after full time, otherwise
    /// [`SessionError::InvalidTransition`] unless the match is paused.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.sim.resume()?;
        let dropped = self.pipeline.pending_len();
        self.pipeline.clear();
        debug!(dropped, "buffered commands discarded on resume");
        Ok(())
    }

    /// Returns `true` once the match reached full time.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.sim.state().is_terminal()
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotStarted`] before [`MatchSession::start`] and
    /// [`SessionError::Terminal`] after full time.
    pub fn tick(&mut self) -> Result<TickReport, SessionError> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        self.ensure_open()?;
        let tick = self.sim.tick() + 1;

        self.drain_inbound();

        let world = self.sim.world();
        let mut frames: Vec<CommandFrame> = self
            .pipeline
            .begin_tick(tick)
            .into_iter()
            .filter(|f| {
                matches!(
                    world.entity(f.entity).map(|e| e.controller),
                    Some(Controller::Human(_))
                )
            })
            .collect();
        let human_frames = frames.len();

        self.ai.sync(world);
        let intents = self
            .ai
            .decide(world, self.sim.config(), tick, self.nav.as_ref());
        let ai_fallbacks = intents.iter().filter(|i| i.fallback).count();
        for intent in &intents {
            frames.push(self.pipeline.issue_local(intent.input, intent.entity, tick));
        }
        frames.sort_by_key(|f| f.entity);

        let delta = self.sim.advance(tick, &frames)?;
        self.replication.record(&delta, self.sim.records().to_vec());
        let (snapshots_sent, snapshots_dropped) = self.broadcast(&delta);

        let state = *self.sim.state();
        if state.is_terminal() {
            self.announce_full_time(state.score);
        }

        Ok(TickReport {
            tick,
            phase: state.phase,
            score: state.score,
            human_frames,
            ai_frames: intents.len(),
            ai_fallbacks,
            changed_entities: delta.entities.len(),
            snapshots_sent,
            snapshots_dropped,
        })
    }

    fn drain_inbound(&mut self) {
        let mut leaving = Vec::new();
        for (&client, slot) in &self.clients {
            for bytes in slot.link.drain() {
                let msg = match WireMessage::decode(&bytes) {
                    Ok(msg) => msg,
                    Err(err) => {
                        warn!(%client, %err, "undecodable message discarded");
                        continue;
                    }
                };
                match msg {
                    WireMessage::Command(cmd) if cmd.entity == slot.entity => {
                        // Rejections are counted and logged by the pipeline
                        let _ = self.pipeline.submit(cmd.input, cmd.entity, cmd.client_tick);
                    }
                    WireMessage::Command(cmd) => {
                        warn!(%client, entity = %cmd.entity, "command for a player the client does not control");
                    }
                    WireMessage::Control(SessionControl::Ack { tick }) => {
                        self.replication.ack(client, tick);
                    }
                    WireMessage::Control(SessionControl::Disconnect) => leaving.push(client),
                    WireMessage::Snapshot(_) | WireMessage::Control(_) => {
                        debug!(%client, "unexpected message from client ignored");
                    }
                }
            }
        }
        for client in leaving {
            let _ = self.disconnect(client);
        }
    }

    fn broadcast(&mut self, published: &SnapshotDelta) -> (usize, usize) {
        let mut sent = 0;
        let mut dropped = 0;
        let mut gone = Vec::new();
        for (&client, slot) in &mut self.clients {
            let delta = self
                .replication
                .delta_for(client, published, self.sim.records());
            let bytes = match WireMessage::Snapshot(delta).encode() {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%client, %err, tick = published.tick, "failed to encode snapshot");
                    continue;
                }
            };
            match slot.link.send(bytes) {
                Delivery::Sent => sent += 1,
                Delivery::Dropped => dropped += 1,
                Delivery::Disconnected => gone.push(client),
            }
        }
        for client in gone {
            let _ = self.disconnect(client);
        }
        (sent, dropped)
    }

    fn announce_full_time(&mut self, score: Score) {
        info!(tick = self.sim.tick(), %score, "full time");
        let msg = WireMessage::Control(SessionControl::FullTime { score });
        let Ok(bytes) = msg.encode() else {
            return;
        };
        for slot in self.clients.values_mut() {
            slot.link.send(bytes.clone());
        }
    }

    /// Runs up to `ticks` ticks, stopping early at full time.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// As [`MatchSession::tick`] for the first tick.
    pub fn run(&mut self, ticks: u64) -> Result<u64, SessionError> {
        let mut ran = 0;
        while ran < ticks {
            self.tick()?;
            ran += 1;
            if self.is_terminal() {
                break;
            }
        }
        Ok(ran)
    }

    /// Runs at the configured tick rate until full time or until `limit` has passed.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// As [`MatchSession::tick`].
    pub fn run_realtime(&mut self, limit: Duration) -> Result<u64, SessionError> {
        let started = Instant::now();
        let mut clock = Clock::new(self.sim.config().tick_rate);
        let mut ran = 0;
        while !self.is_terminal() && started.elapsed() < limit {
            self.tick()?;
            ran += 1;
            clock.wait();
        }
        Ok(ran)
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    /// Match state as of the last completed tick.
    #[must_use]
    pub fn current_match_state(&self) -> MatchState {
        *self.sim.state()
    }

    /// Entity records as of the last completed tick.
    #[must_use]
    pub fn current_snapshot(&self) -> &[EntityRecord] {
        self.sim.records()
    }

    /// The final result, once the match is over.
    #[must_use]
    pub fn match_result(&self) -> Option<MatchResult> {
        let state = self.sim.state();
        state.is_terminal().then(|| MatchResult {
            match_id: self.sim.config().match_id,
            score: state.score,
            winner: state.score.leader(),
            ticks: state.tick,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        self.sim.config()
    }

    /// The authoritative simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// The AI engine.
    #[must_use]
    pub fn ai(&self) -> &AiEngine {
        &self.ai
    }

    /// Command pipeline counters.
    #[must_use]
    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }
}
