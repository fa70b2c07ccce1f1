//! Collisions between players, the ball and the pitch edges.

use glam::Vec2;

use super::{Resolver, TickContext};
use crate::entity::EntityId;
use crate::simulation::kinematics::confine;
use crate::simulation::World;
use crate::tags::Tag;

/// Separation direction used when two players stand on the same spot.
const COINCIDENT_AXIS: Vec2 = Vec2::Y;

/// Resolves overlaps and bounces.
///
/// - Overlapping players are pushed apart equally along the line between
///   them, pairs visited in id order.
/// - Players are kept inside the play area.
/// - A loose ball bounces off the touchlines with the configured restitution.
/// - A loose ball bounces off stunned players, who cannot pick it up.
///
/// Goal lines are left open; crossing them is a rules matter.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollisionResolver;

impl Resolver for CollisionResolver {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        separate_players(next, ctx.config.movement.player_radius);

        let area = ctx.config.field.play_area();
        for e in next.entities_mut().iter_mut().filter(|e| e.is_player()) {
            confine(&mut e.kinematics, &area);
        }

        if next.tags().possession_holder().is_none() {
            bounce_off_touchlines(next, ctx);
            bounce_off_stunned(next, ctx);
        }
    }
}

fn separate_players(next: &mut World, radius: f32) {
    let players: Vec<usize> = next
        .entities()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_player())
        .map(|(i, _)| i)
        .collect();
    let min_dist = radius * 2.0;
    let entities = next.entities_mut();

    for (n, &i) in players.iter().enumerate() {
        for &j in &players[n + 1..] {
            let d = entities[j].kinematics.position - entities[i].kinematics.position;
            let dist = d.length();
            if dist >= min_dist {
                continue;
            }
            let dir = if dist > f32::EPSILON { d / dist } else { COINCIDENT_AXIS };
            let push = dir * ((min_dist - dist) / 2.0);
            entities[i].kinematics.position -= push;
            entities[j].kinematics.position += push;
        }
    }
}

fn bounce_off_touchlines(next: &mut World, ctx: &TickContext<'_>) {
    let limit = ctx.config.field.half_width() - ctx.config.ball.radius;
    let restitution = ctx.config.ball.wall_restitution;
    let Some(ball) = next.ball_mut() else {
        return;
    };
    let kin = &mut ball.kinematics;
    if kin.position.y.abs() > limit {
        kin.position.y = limit.copysign(kin.position.y);
        kin.velocity.y = -kin.velocity.y * restitution;
    }
}

fn bounce_off_stunned(next: &mut World, ctx: &TickContext<'_>) {
    let reach = ctx.config.movement.player_radius + ctx.config.ball.radius;
    let stunned: Vec<EntityId> = next.tags().entities_with(Tag::Stunned).collect();

    for id in stunned {
        let Some(player) = next.entity(id).filter(|e| e.is_player()) else {
            continue;
        };
        let center = player.position();
        let Some(ball) = next.ball_mut() else {
            return;
        };
        let kin = &mut ball.kinematics;
        let d = kin.position - center;
        let dist = d.length();
        if dist >= reach {
            continue;
        }
        let normal = if dist > f32::EPSILON { d / dist } else { COINCIDENT_AXIS };
        kin.position = center + normal * reach;
        let along = kin.velocity.dot(normal);
        if along < 0.0 {
            kin.velocity -= normal * (2.0 * along);
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
        CollisionResolver.resolve(&ctx, &mut next);
        next
    }

    #[test]
    fn overlapping_players_are_pushed_apart() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        world.entity_mut(EntityId::new(0)).unwrap().place(Vec2::new(0.0, 500.0));
        world.entity_mut(EntityId::new(3)).unwrap().place(Vec2::new(20.0, 500.0));

        let next = run(&world, &config);
        let a = next.entity(EntityId::new(0)).unwrap().position();
        let b = next.entity(EntityId::new(3)).unwrap().position();
        assert!((a.distance(b) - 2.0 * config.movement.player_radius).abs() < 1e-3);
        // Symmetric push
        assert!((a.x + b.x - 20.0).abs() < 1e-3);
    }

    #[test]
    fn players_stay_in_play_area() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        world.entity_mut(EntityId::new(1)).unwrap().place(Vec2::new(0.0, 5000.0));
        let next = run(&world, &config);
        let max_y = config.field.play_area().max.y;
        assert_eq!(next.entity(EntityId::new(1)).unwrap().position().y, max_y);
    }

    #[test]
    fn ball_bounces_off_touchline() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let ball = world.ball_id().unwrap();
        {
            let kin = &mut world.entity_mut(ball).unwrap().kinematics;
            kin.position = Vec2::new(300.0, 1260.0);
            kin.velocity = Vec2::new(0.0, 1000.0);
        }
        let next = run(&world, &config);
        let kin = next.entity(ball).unwrap().kinematics;
        assert_eq!(kin.position.y, 1250.0 - config.ball.radius);
        assert!((kin.velocity.y + 600.0).abs() < 1e-3);
    }

    #[test]
    fn ball_bounces_off_stunned_player() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let mut world = sim.world().clone();
        let ball = world.ball_id().unwrap();
        let id = EntityId::new(4);
        world.entity_mut(id).unwrap().place(Vec2::new(500.0, 0.0));
        world.tags_mut().add_tag(id, Tag::Stunned);
        {
            let kin = &mut world.entity_mut(ball).unwrap().kinematics;
            kin.position = Vec2::new(460.0, 0.0);
            kin.velocity = Vec2::new(800.0, 0.0);
        }
        let next = run(&world, &config);
        let kin = next.entity(ball).unwrap().kinematics;
        assert!(kin.velocity.x < 0.0);
        assert!(kin.position.distance(Vec2::new(500.0, 0.0)) >= 50.0 - 1e-3);
    }
}
