//! Movement integration shared by the server and client prediction.
//!
//! Both sides must step a player identically for reconciliation to be
//! exact, so prediction calls these functions rather than its own copy.

use glam::Vec2;
use pitch::Bounds;

use crate::command::{ActionBits, RawInput};
use crate::config::{BallConfig, MovementConfig};
use crate::entity::Kinematics;

/// Inputs shorter than this do not turn the player.
const TURN_EPSILON: f32 = 1e-3;

/// Steps a player one tick.
///
/// Velocity approaches the desired velocity at the configured acceleration;
/// the player faces the input direction. A stunned player stops dead.
pub fn step_player(
    kin: &mut Kinematics,
    input: &RawInput,
    stunned: bool,
    movement: &MovementConfig,
    dt: f32,
) {
    if stunned {
        kin.velocity = Vec2::ZERO;
        return;
    }

    let top_speed = if input.actions.contains(ActionBits::SPRINT) {
        movement.sprint_speed
    } else {
        movement.walk_speed
    };
    let desired = input.movement.clamp_length_max(1.0) * top_speed;

    let delta = desired - kin.velocity;
    let max_change = movement.acceleration * dt;
    kin.velocity = if delta.length() <= max_change {
        desired
    } else {
        kin.velocity + delta.normalize() * max_change
    };
    kin.position += kin.velocity * dt;

    if input.movement.length() > TURN_EPSILON {
        kin.orientation = input.movement.y.atan2(input.movement.x);
    }
}

/// Keeps a player inside `area`, killing the velocity component that
/// pushed it out.
pub fn confine(kin: &mut Kinematics, area: &Bounds) {
    let clamped = area.clamp(kin.position);
    if clamped.x != kin.position.x {
        kin.velocity.x = 0.0;
    }
    if clamped.y != kin.position.y {
        kin.velocity.y = 0.0;
    }
    kin.position = clamped;
}

/// Steps a loose ball one tick with linear friction.
pub fn step_ball(kin: &mut Kinematics, ball: &BallConfig, dt: f32) {
    let speed = kin.velocity.length();
    if speed > 0.0 {
        let slowed = speed - ball.friction * dt;
        kin.velocity = if slowed < ball.min_speed {
            Vec2::ZERO
        } else {
            kin.velocity * (slowed / speed)
        };
    }
    kin.position += kin.velocity * dt;
}

/// Returns `true` if the input asks for sprint while actually moving.
#[must_use]
pub fn is_sprinting(input: &RawInput) -> bool {
    input.actions.contains(ActionBits::SPRINT) && input.movement.length() > TURN_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn accelerates_toward_walk_speed() {
        let movement = MovementConfig::default();
        let mut kin = Kinematics::at(Vec2::ZERO);
        let input = RawInput::moving(Vec2::X);

        step_player(&mut kin, &input, false, &movement, DT);
        // 2000 cm/s^2 over one tick
        assert!((kin.velocity.x - 2000.0 * DT).abs() < 1e-3);

        for _ in 0..30 {
            step_player(&mut kin, &input, false, &movement, DT);
        }
        assert!((kin.velocity.x - movement.walk_speed).abs() < 1e-3);
        assert!(kin.orientation.abs() < 1e-6);
    }

    #[test]
    fn sprint_raises_top_speed_and_input_is_clamped() {
        let movement = MovementConfig::default();
        let mut kin = Kinematics::at(Vec2::ZERO);
        let input = RawInput::new(Vec2::new(0.0, 1.5), ActionBits::SPRINT);
        for _ in 0..60 {
            step_player(&mut kin, &input, false, &movement, DT);
        }
        assert!((kin.velocity.length() - movement.sprint_speed).abs() < 1e-2);
        assert!(is_sprinting(&input));
    }

    #[test]
    fn stunned_player_stops() {
        let movement = MovementConfig::default();
        let mut kin = Kinematics::at(Vec2::ZERO);
        kin.velocity = Vec2::new(300.0, 0.0);
        step_player(&mut kin, &RawInput::moving(Vec2::X), true, &movement, DT);
        assert_eq!(kin.velocity, Vec2::ZERO);
        assert_eq!(kin.position, Vec2::ZERO);
    }

    #[test]
    fn ball_slows_and_stops() {
        let ball = BallConfig::default();
        let mut kin = Kinematics::at(Vec2::ZERO);
        kin.velocity = Vec2::new(100.0, 0.0);
        step_ball(&mut kin, &ball, DT);
        assert!(kin.velocity.x < 100.0 && kin.velocity.x > 0.0);

        for _ in 0..30 {
            step_ball(&mut kin, &ball, DT);
        }
        assert_eq!(kin.velocity, Vec2::ZERO);
    }

    #[test]
    fn confine_clamps_and_stops_outward_motion() {
        let area = Bounds::centered(100.0, 100.0);
        let mut kin = Kinematics::at(Vec2::new(80.0, 0.0));
        kin.velocity = Vec2::new(10.0, 5.0);
        confine(&mut kin, &area);
        assert_eq!(kin.position, Vec2::new(50.0, 0.0));
        assert_eq!(kin.velocity, Vec2::new(0.0, 5.0));
    }
}
