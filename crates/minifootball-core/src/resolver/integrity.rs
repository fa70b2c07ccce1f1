//! Containment for corrupt kinematic state.

use glam::Vec2;
use tracing::warn;

use super::{Resolver, TickContext};
use crate::entity::EntityId;
use crate::simulation::{Phase, World};
use crate::tags::Tag;

/// Puts entities with non-finite state, or outside the world, back at their
/// last valid position, stopped and stunned.
///
/// Runs in every phase so a restart can never publish a bad position.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegrityResolver;

impl Resolver for IntegrityResolver {
    fn name(&self) -> &'static str {
        "integrity"
    }

    fn active_in(&self, _phase: Phase) -> bool {
        true
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        let world_bounds = ctx.config.field.world_bounds();
        let stun = ctx.config.stun_ticks();
        let mut clamped: Vec<EntityId> = Vec::new();

        for e in next.entities_mut() {
            let id = e.id();
            let kin = &mut e.kinematics;
            if kin.is_finite() && world_bounds.contains(kin.position) {
                e.last_valid_position = kin.position;
                continue;
            }
            warn!(
                tick = ctx.tick,
                entity = %id,
                position = ?kin.position,
                velocity = ?kin.velocity,
                "invalid kinematic state, clamping to last valid position"
            );
            kin.position = e.last_valid_position;
            kin.velocity = Vec2::ZERO;
            if !kin.orientation.is_finite() {
                kin.orientation = 0.0;
            }
            e.timers.stun = e.timers.stun.max(stun);
            clamped.push(id);
        }

        for id in clamped {
            next.tags_mut().add_tag(id, Tag::Stunned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::simulation::Simulation;

    fn run(world: &World, config: &MatchConfig) -> World {
        let ctx = TickContext {
            tick: 1,
            dt: config.dt(),
            config,
            frames: &[],
            current: world,
        };
        let mut next = world.clone();
        IntegrityResolver.resolve(&ctx, &mut next);
        next
    }

    #[test]
    fn nan_position_is_clamped_and_stunned() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let id = EntityId::new(3);
        let home = world.entity(id).unwrap().last_valid_position;
        world.entity_mut(id).unwrap().kinematics.position = Vec2::new(f32::NAN, 0.0);

        let next = run(&world, &config);
        let e = next.entity(id).unwrap();
        assert_eq!(e.position(), home);
        assert_eq!(e.kinematics.velocity, Vec2::ZERO);
        assert!(next.has_tag(id, Tag::Stunned));
        assert_eq!(e.timers.stun, config.stun_ticks());
    }

    #[test]
    fn out_of_world_is_clamped() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let ball = world.ball_id().unwrap();
        world.entity_mut(ball).unwrap().kinematics.position = Vec2::new(1.0e6, 0.0);

        let next = run(&world, &config);
        assert_eq!(next.entity(ball).unwrap().position(), Vec2::ZERO);
    }

    #[test]
    fn valid_positions_advance_last_valid() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let id = EntityId::new(0);
        world.entity_mut(id).unwrap().kinematics.position = Vec2::new(-1500.0, 10.0);

        let next = run(&world, &config);
        assert_eq!(next.entity(id).unwrap().last_valid_position, Vec2::new(-1500.0, 10.0));
        assert!(!next.has_tag(id, Tag::Stunned));
    }
}
