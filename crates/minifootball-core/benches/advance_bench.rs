use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minifootball_core::ai::AiEngine;
use minifootball_core::config::MatchConfig;
use minifootball_core::pitch::{Bounds, OpenPitch};
use minifootball_core::replication::{SnapshotDelta, WireMessage};
use minifootball_core::session::MatchSession;
use minifootball_core::simulation::Simulation;

fn open_pitch(config: &MatchConfig) -> OpenPitch {
    OpenPitch::new(Bounds::centered(config.field.length, config.field.width))
}

fn bench_session_tick(c: &mut Criterion) {
    // Long clock so the match never ends mid-benchmark
    let config = MatchConfig {
        match_duration_secs: 1.0e6,
        ..MatchConfig::default()
    };
    let nav = open_pitch(&config);
    let mut session = MatchSession::new(config, Box::new(nav)).unwrap();
    session.start();

    c.bench_function("session_tick_3v3", |b| {
        b.iter(|| black_box(session.tick().unwrap()))
    });
}

fn bench_ai_decide_eleven(c: &mut Criterion) {
    let config = MatchConfig {
        team_size: 11,
        ..MatchConfig::default()
    };
    let nav = open_pitch(&config);
    let mut sim = Simulation::with_teams(config);
    sim.advance(1, &[]).unwrap();
    let mut engine = AiEngine::new();
    engine.sync(sim.world());

    c.bench_function("ai_decide_11v11", |b| {
        b.iter(|| black_box(engine.decide(sim.world(), sim.config(), 2, &nav)))
    });
}

fn bench_keyframe_encode(c: &mut Criterion) {
    let config = MatchConfig {
        team_size: 11,
        ..MatchConfig::default()
    };
    let sim = Simulation::with_teams(config);
    let msg = WireMessage::Snapshot(SnapshotDelta::keyframe(
        0,
        *sim.state(),
        sim.records(),
        vec![],
    ));

    c.bench_function("keyframe_encode_11v11", |b| {
        b.iter(|| black_box(msg.encode().unwrap()))
    });
}

criterion_group!(benches, bench_session_tick, bench_ai_decide_eleven, bench_keyframe_encode);
criterion_main!(benches);
