//! End-to-end tests of whole matches.

use glam::Vec2;

use crate::entity::{EntityId, Formation, Team};
use crate::replication::{CommandMsg, WireMessage};
use crate::command::{ActionBits, CommandFrame, RawInput};
use crate::simulation::Phase;
use crate::tags::Tag;

use super::helpers::{assert_single_holder, live_simulation, short_match, started_session};

// =============================================================================
// Full matches
// =============================================================================

#[test]
fn ai_match_runs_to_full_time_with_one_holder_at_most() {
    let mut session = started_session(short_match(30.0));
    let mut ticks = 0;
    let mut possession_seen = false;

    while !session.is_terminal() {
        let report = session.tick().unwrap();
        assert_single_holder(session.simulation());
        possession_seen |= session.simulation().world().holder().is_some();
        ticks += 1;
        assert!(ticks < 10_000, "match never ended");
        assert_eq!(report.tick, ticks);
    }

    let state = session.current_match_state();
    assert_eq!(state.phase, Phase::FullTime);
    assert_eq!(state.clock_remaining, 0);
    assert!(ticks >= session.config().match_ticks());
    assert!(possession_seen);
    assert!(session.match_result().is_some());
}

#[test]
fn clock_stops_while_paused() {
    let mut session = started_session(short_match(30.0));
    session.run(10).unwrap();
    session.pause().unwrap();
    let clock = session.current_match_state().clock_remaining;

    session.run(30).unwrap();
    let state = session.current_match_state();
    assert_eq!(state.clock_remaining, clock);
    assert_eq!(state.tick, 40);
    assert_eq!(state.phase, Phase::Paused);

    session.resume().unwrap();
    session.tick().unwrap();
    assert_eq!(session.current_match_state().clock_remaining, clock - 1);
}

// =============================================================================
// Goals and restarts
// =============================================================================

#[test]
fn goal_freezes_scores_and_returns_to_kickoff() {
    let mut sim = live_simulation();
    let ball = sim.world().ball_id().unwrap();
    // Move the defending keeper out of the ball's path
    sim.world_mut()
        .entity_mut(EntityId::new(3))
        .unwrap()
        .place(Vec2::new(1800.0, -900.0));
    let kin = &mut sim.world_mut().entity_mut(ball).unwrap().kinematics;
    kin.position = Vec2::new(1900.0, 0.0);
    kin.velocity = Vec2::new(2500.0, 0.0);

    let mut tick = sim.tick();
    while sim.state().phase == Phase::Live {
        tick += 1;
        sim.advance(tick, &[]).unwrap();
        assert!(tick < 20, "ball never reached the goal");
    }

    let state = *sim.state();
    assert_eq!(state.phase, Phase::GoalScored);
    assert_eq!(state.score.team_a, 1);
    assert_eq!(state.score.team_b, 0);
    assert_eq!(state.kickoff_team, Team::B);
    assert!(sim.world().entities().iter().all(|e| e.kinematics.velocity == Vec2::ZERO));
    assert_eq!(sim.world().tags().count_with(Tag::Celebrating), 3);
    assert_eq!(sim.world().holder(), None);

    let frozen: Vec<_> = sim.world().entities().iter().map(|e| e.position()).collect();
    let mut held = 0;
    while sim.state().phase == Phase::GoalScored {
        tick += 1;
        sim.advance(tick, &[]).unwrap();
        held += 1;
        if sim.state().phase == Phase::GoalScored {
            let now: Vec<_> = sim.world().entities().iter().map(|e| e.position()).collect();
            assert_eq!(now, frozen);
        }
    }
    assert_eq!(held, sim.config().goal_delay_ticks());
    assert_eq!(sim.state().phase, Phase::Kickoff);
    assert_eq!(sim.world().ball().unwrap().position(), Vec2::ZERO);
    assert_eq!(sim.world().tags().count_with(Tag::Celebrating), 0);

    let formation = Formation::three_a_side();
    let field = &sim.config().field;
    for (i, id) in [0u32, 1, 2].into_iter().enumerate() {
        let spot = formation.kickoff_position(i, Team::A, false, field).unwrap();
        assert_eq!(sim.world().entity(EntityId::new(id)).unwrap().position(), spot);
    }
    for (i, id) in [3u32, 4, 5].into_iter().enumerate() {
        let spot = formation.kickoff_position(i, Team::B, true, field).unwrap();
        assert_eq!(sim.world().entity(EntityId::new(id)).unwrap().position(), spot);
    }

    tick += 1;
    sim.advance(tick, &[]).unwrap();
    assert_eq!(sim.state().phase, Phase::Live);
}

#[test]
fn kickoff_taker_collects_the_ball_on_the_first_live_tick() {
    let mut sim = live_simulation();
    assert_eq!(sim.state().kickoff_team, Team::A);
    assert_eq!(sim.world().holder(), None);

    sim.advance(sim.tick() + 1, &[]).unwrap();
    let holder = sim.world().holder().unwrap();
    assert_eq!(holder.id(), EntityId::new(2));
    assert_single_holder(&sim);
}

#[test]
fn pass_is_collected_by_the_teammate() {
    let mut sim = live_simulation();
    let passer = EntityId::new(1);
    let mate = EntityId::new(2);
    sim.world_mut().entity_mut(passer).unwrap().place(Vec2::new(-800.0, 0.0));
    sim.world_mut().entity_mut(mate).unwrap().place(Vec2::new(-200.0, 600.0));
    sim.world_mut().tags_mut().add_tag(passer, Tag::Possession);
    let aim = (Vec2::new(-200.0, 600.0) - Vec2::new(-800.0, 0.0)).normalize();

    let frame = |tick: u64, input: RawInput| CommandFrame {
        entity: passer,
        input,
        client_tick: tick,
        sequence: tick,
    };
    let mut tick = sim.tick() + 1;
    sim.advance(tick, &[frame(tick, RawInput::new(aim, ActionBits::PASS))]).unwrap();
    assert_eq!(sim.world().holder(), None);
    tick += 1;
    sim.advance(tick, &[frame(tick, RawInput::IDLE)]).unwrap();

    while sim.world().holder().is_none() {
        tick += 1;
        sim.advance(tick, &[]).unwrap();
        assert!(tick < 60, "pass never arrived");
    }
    assert_eq!(sim.world().holder().unwrap().id(), mate);
    assert_eq!(sim.world().touch().last_team, Some(Team::A));
}

#[test]
fn ball_wide_of_the_goal_restarts_for_the_other_team() {
    let mut sim = live_simulation();
    let ball = sim.world().ball_id().unwrap();
    sim.world_mut().touch_mut().last_team = Some(Team::B);
    let kin = &mut sim.world_mut().entity_mut(ball).unwrap().kinematics;
    kin.position = Vec2::new(-1950.0, 900.0);
    kin.velocity = Vec2::new(-2500.0, 0.0);

    sim.advance(2, &[]).unwrap();
    let state = *sim.state();
    assert_eq!(state.phase, Phase::Kickoff);
    assert_eq!(state.kickoff_team, Team::A);
    assert_eq!(state.score, crate::simulation::Score::default());
}

// =============================================================================
// Commands through the session
// =============================================================================

#[test]
fn stale_command_changes_nothing() {
    let mut a = started_session(short_match(30.0));
    let mut b = started_session(short_match(30.0));
    let ea = a.connect().unwrap();
    let _eb = b.connect().unwrap();
    a.run(100).unwrap();
    b.run(100).unwrap();

    let mut link = ea.link;
    let stale = WireMessage::Command(CommandMsg {
        entity: ea.entity,
        input: RawInput::moving(Vec2::X),
        client_tick: 80,
    });
    link.send(stale.encode().unwrap());

    a.tick().unwrap();
    b.tick().unwrap();
    assert_eq!(a.pipeline_stats().stale, 1);
    assert_eq!(a.pipeline_stats().accepted, 0);
    assert_eq!(
        a.simulation().world_digest().unwrap(),
        b.simulation().world_digest().unwrap()
    );
}

#[test]
fn client_commands_move_the_player() {
    let mut session = started_session(short_match(30.0));
    let endpoint = session.connect().unwrap();
    session.run(1).unwrap();
    let start = session.simulation().world().entity(endpoint.entity).unwrap().position();

    let mut link = endpoint.link;
    for _ in 0..10 {
        let tick = session.current_match_state().tick + 1;
        let cmd = WireMessage::Command(CommandMsg {
            entity: endpoint.entity,
            input: RawInput::moving(Vec2::Y),
            client_tick: tick,
        });
        link.send(cmd.encode().unwrap());
        let report = session.tick().unwrap();
        assert_eq!(report.human_frames, 1);
    }

    let end = session.simulation().world().entity(endpoint.entity).unwrap().position();
    assert!(end.y > start.y + 50.0);
    assert_eq!(session.pipeline_stats().accepted, 10);
}
