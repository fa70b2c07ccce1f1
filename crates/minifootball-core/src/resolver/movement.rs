//! Movement integration.

use super::{Resolver, TickContext};
use crate::simulation::kinematics::{is_sprinting, step_ball, step_player};
use crate::simulation::World;
use crate::tags::Tag;

/// Integrates every player from its intent and the ball if nobody holds it.
///
/// Maintains the `Sprinting` tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovementResolver;

impl Resolver for MovementResolver {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        let movement = &ctx.config.movement;
        let holder = next.tags().possession_holder();
        let mut sprint_changes = Vec::new();

        for index in 0..next.len() {
            let id = next.entities()[index].id();
            let stunned = next.has_tag(id, Tag::Stunned);
            let sprinting = next.has_tag(id, Tag::Sprinting);
            let e = &mut next.entities_mut()[index];

            if e.is_player() {
                let intent = e.intent;
                step_player(&mut e.kinematics, &intent, stunned, movement, ctx.dt);
                let now_sprinting = !stunned && is_sprinting(&intent);
                if now_sprinting != sprinting {
                    sprint_changes.push((id, now_sprinting));
                }
            } else if holder.is_none() {
                step_ball(&mut e.kinematics, &ctx.config.ball, ctx.dt);
            }
        }

        for (id, on) in sprint_changes {
            if on {
                next.tags_mut().add_tag(id, Tag::Sprinting);
            } else {
                next.tags_mut().remove_tag(id, Tag::Sprinting);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ActionBits, RawInput};
    use crate::config::MatchConfig;
    use crate::entity::EntityId;
    use crate::simulation::Simulation;
    use glam::Vec2;

    #[test]
    fn players_move_and_sprint_is_tagged() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let world = sim.world().clone();
        let ctx = TickContext {
            tick: 1,
            dt: config.dt(),
            config: &config,
            frames: &[],
            current: &world,
        };

        let id = EntityId::new(1);
        let mut next = world.clone();
        next.entity_mut(id).unwrap().intent = RawInput::new(Vec2::Y, ActionBits::SPRINT);
        MovementResolver.resolve(&ctx, &mut next);

        let before = world.entity(id).unwrap().position();
        assert!(next.entity(id).unwrap().position().y > before.y);
        assert!(next.has_tag(id, Tag::Sprinting));

        next.entity_mut(id).unwrap().intent = RawInput::IDLE;
        MovementResolver.resolve(&ctx, &mut next);
        assert!(!next.has_tag(id, Tag::Sprinting));
    }

    #[test]
    fn loose_ball_rolls_held_ball_does_not() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let ball = world.ball_id().unwrap();
        world.entity_mut(ball).unwrap().kinematics.velocity = Vec2::new(600.0, 0.0);
        let ctx = TickContext {
            tick: 1,
            dt: config.dt(),
            config: &config,
            frames: &[],
            current: &world,
        };

        let mut next = world.clone();
        MovementResolver.resolve(&ctx, &mut next);
        assert!(next.entity(ball).unwrap().position().x > 0.0);

        let mut next = world.clone();
        next.tags_mut().add_tag(EntityId::new(2), Tag::Possession);
        MovementResolver.resolve(&ctx, &mut next);
        assert_eq!(next.entity(ball).unwrap().position(), Vec2::ZERO);
    }
}
