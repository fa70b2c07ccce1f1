//! Test helper functions for setting up matches and scripted inputs.

use glam::Vec2;

use crate::command::{CommandFrame, CommandPipeline, RawInput};
use crate::config::MatchConfig;
use crate::entity::EntityId;
use crate::pitch::{Bounds, OpenPitch};
use crate::session::MatchSession;
use crate::simulation::{Phase, Simulation};
use crate::tags::Tag;

// =============================================================================
// Setup
// =============================================================================

/// An open pitch matching `config`'s field.
pub fn open_pitch(config: &MatchConfig) -> OpenPitch {
    OpenPitch::new(Bounds::centered(config.field.length, config.field.width))
}

/// A started session on an open pitch.
pub fn started_session(config: MatchConfig) -> MatchSession {
    let nav = open_pitch(&config);
    let mut session = MatchSession::new(config, Box::new(nav)).unwrap();
    session.start();
    session
}

/// A 3v3 simulation that has completed its kickoff hold and is live.
pub fn live_simulation() -> Simulation {
    let mut sim = Simulation::with_teams(MatchConfig::default());
    sim.advance(1, &[]).unwrap();
    assert_eq!(sim.state().phase, Phase::Live);
    sim
}

/// A config with a short clock.
pub fn short_match(secs: f32) -> MatchConfig {
    MatchConfig {
        match_duration_secs: secs,
        ..MatchConfig::default()
    }
}

// =============================================================================
// Scripted input
// =============================================================================

/// A deterministic input for `entity` at `tick` that sweeps through directions.
pub fn scripted_input(entity: EntityId, tick: u64) -> RawInput {
    #[allow(clippy::cast_precision_loss)]
    let angle = (tick as f32 * 0.05) + entity.as_u32() as f32;
    RawInput::moving(Vec2::from_angle(angle))
}

/// Frames for every player in `sim` at `tick`, sequenced through `pipeline`.
pub fn scripted_frames(sim: &Simulation, pipeline: &mut CommandPipeline, tick: u64) -> Vec<CommandFrame> {
    sim.world()
        .players()
        .map(|p| pipeline.issue_local(scripted_input(p.id(), tick), p.id(), tick))
        .collect()
}

// =============================================================================
// Assertions
// =============================================================================

/// Asserts that at most one entity holds the ball.
pub fn assert_single_holder(sim: &Simulation) {
    let holders = sim.world().tags().count_with(Tag::Possession);
    assert!(
        holders <= 1,
        "tick {}: {} possession holders",
        sim.tick(),
        holders
    );
}
