//! A loopback client that plays through the wire protocol.

use std::time::Duration;

use glam::Vec2;
use minifootball_core::command::{ActionBits, RawInput};
use minifootball_core::config::MatchConfig;
use minifootball_core::entity::EntityKind;
use minifootball_core::replication::{
    ClientReplica, DeltaFit, Link, ReplicaEvent, ReplicaStats, WireMessage,
};
use minifootball_core::session::ClientEndpoint;
use minifootball_core::simulation::Score;
use tracing::{debug, warn};

/// How long a bot waits for the server before giving up.
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a bot saw over the match.
#[derive(Debug, Clone, Copy)]
pub struct BotReport {
    pub stats: ReplicaStats,
    pub final_score: Option<Score>,
}

/// Plays until full time: run at the ball, shoot when carrying it.
pub fn play(endpoint: ClientEndpoint, config: &MatchConfig) -> BotReport {
    let client = endpoint.client;
    let mut link = endpoint.link;
    let mut replica = ClientReplica::new(endpoint.entity, config);
    let mut final_score = None;

    loop {
        let bytes = match link.recv_timeout(IDLE_TIMEOUT) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(%client, "server went quiet");
                break;
            }
            Err(()) => break,
        };
        match replica.handle_bytes(&bytes) {
            Ok(ReplicaEvent::Snapshot(DeltaFit::Applies)) => {
                let input = choose_input(&replica, config);
                send(&mut link, &WireMessage::Command(replica.predict(input)));
                if let Some(ack) = replica.ack() {
                    send(&mut link, &ack);
                }
            }
            Ok(ReplicaEvent::FullTime(score)) => {
                final_score = Some(score);
                break;
            }
            Ok(event) => debug!(%client, ?event, "bot event"),
            Err(err) => warn!(%client, %err, "bad message from server"),
        }
    }

    BotReport {
        stats: replica.stats(),
        final_score,
    }
}

fn choose_input(replica: &ClientReplica, config: &MatchConfig) -> RawInput {
    let me = replica.predicted_position();
    let Some(ball) = replica
        .mirror_records()
        .find(|r| r.kind == EntityKind::Ball)
    else {
        return RawInput::IDLE;
    };
    let carrying = replica
        .mirror_record(replica.entity())
        .is_some_and(|r| r.has_possession());

    let (target, actions) = if carrying {
        let sign = replica
            .mirror_record(replica.entity())
            .and_then(|r| r.team)
            .map_or(1.0, |t| t.attack_sign());
        let goal = Vec2::new(sign * config.field.half_length(), 0.0);
        let mut actions = ActionBits::SPRINT;
        if me.distance(goal) <= config.ai.shoot_range {
            actions |= ActionBits::KICK;
        }
        (goal, actions)
    } else {
        (ball.kinematics.position, ActionBits::SPRINT)
    };
    RawInput::new((target - me).normalize_or_zero(), actions)
}

fn send(link: &mut Link, msg: &WireMessage) {
    match msg.encode() {
        Ok(bytes) => {
            link.send(bytes);
        }
        Err(err) => warn!(%err, "failed to encode message"),
    }
}
