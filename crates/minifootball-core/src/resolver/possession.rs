//! Possession: kicks, tackles, pickups and carrying the ball.
//!
//! All grants go through the tag store, which revokes the previous holder
//! in the same call. Within a tick the order is fixed:
//!
//! 1. The holder kicks or passes, releasing the ball. A kick wins over a
//!    pass pressed in the same tick.
//! 2. Tackles are attempted in id order; the first to succeed wins.
//! 3. A loose ball goes to the nearest eligible player (lower id on ties).
//! 4. A held ball is moved in front of its holder.

use glam::Vec2;
use tracing::debug;

use super::{Resolver, TickContext};
use crate::command::ActionBits;
use crate::entity::{EntityId, Team};
use crate::simulation::World;
use crate::tags::Tag;

/// Updates who holds the ball.
#[derive(Debug, Default, Clone, Copy)]
pub struct PossessionResolver;

impl Resolver for PossessionResolver {
    fn name(&self) -> &'static str {
        "possession"
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        if next.ball_id().is_none() {
            return;
        }
        release(ctx, next);
        tackle(ctx, next);
        pick_up(ctx, next);
        carry(ctx, next);
    }
}

fn release(ctx: &TickContext<'_>, next: &mut World) {
    let Some(holder) = next.holder() else {
        return;
    };
    let actions = holder.intent.actions;
    let (speed, action) = if actions.contains(ActionBits::KICK) {
        (ctx.config.ball.shoot_speed, "kick")
    } else if actions.contains(ActionBits::PASS) {
        (ctx.config.ball.pass_speed, "pass")
    } else {
        return;
    };
    let id = holder.id();
    let team = holder.team();
    let launch = holder.kinematics.facing() * speed;
    let spot = carry_spot(ctx, holder.kinematics.position, holder.kinematics.facing());

    next.tags_mut().remove_tag(id, Tag::Possession);
    if let Some(ball) = next.ball_mut() {
        ball.kinematics.position = spot;
        ball.kinematics.velocity = launch;
    }
    let touch = next.touch_mut();
    touch.last_team = team;
    touch.last_kicker = Some(id);
    touch.kick_grace = ctx.config.ball.kick_grace_ticks;
    debug!(tick = ctx.tick, entity = %id, action, "ball released");
}

fn tackle(ctx: &TickContext<'_>, next: &mut World) {
    let cooldown = ctx.config.tackle_cooldown_ticks();
    let stun = ctx.config.stun_ticks();

    let tacklers: Vec<EntityId> = next
        .players()
        .filter(|p| p.intent.actions.contains(ActionBits::TACKLE))
        .filter(|p| p.timers.tackle_cooldown == 0)
        .map(|p| p.id())
        .filter(|id| !next.has_tag(*id, Tag::Stunned))
        .collect();

    let mut won = false;
    for id in tacklers {
        if let Some(e) = next.entity_mut(id) {
            e.timers.tackle_cooldown = cooldown;
        }
        if won {
            continue;
        }
        let Some((holder_id, holder_team, holder_pos)) = next
            .holder()
            .map(|h| (h.id(), h.team(), h.position()))
        else {
            continue;
        };
        let Some(tackler) = next.entity(id) else {
            continue;
        };
        if tackler.team() == holder_team
            || tackler.position().distance(holder_pos) > ctx.config.rules.tackle_range
        {
            continue;
        }

        let team = tackler.team();
        next.tags_mut().add_tag(id, Tag::Possession);
        next.tags_mut().add_tag(holder_id, Tag::Stunned);
        if let Some(victim) = next.entity_mut(holder_id) {
            victim.timers.stun = stun;
            victim.kinematics.velocity = Vec2::ZERO;
        }
        next.touch_mut().last_team = team;
        won = true;
        debug!(tick = ctx.tick, tackler = %id, victim = %holder_id, "tackle won");
    }
}

fn pick_up(ctx: &TickContext<'_>, next: &mut World) {
    if next.tags().possession_holder().is_some() {
        return;
    }
    let Some(ball_pos) = next.ball().map(crate::entity::Entity::position) else {
        return;
    };
    let touch = *next.touch();
    let radius = ctx.config.ball.pickup_radius;

    let mut best: Option<(EntityId, f32, Option<Team>)> = None;
    for p in next.players() {
        if next.has_tag(p.id(), Tag::Stunned) {
            continue;
        }
        if touch.kick_grace > 0 && touch.last_kicker == Some(p.id()) {
            continue;
        }
        let dist = p.position().distance(ball_pos);
        if dist > radius {
            continue;
        }
        // Strictly closer only, so the lower id keeps ties
        if best.map_or(true, |(_, d, _)| dist < d) {
            best = Some((p.id(), dist, p.team()));
        }
    }

    if let Some((id, _, team)) = best {
        next.tags_mut().add_tag(id, Tag::Possession);
        next.touch_mut().last_team = team;
        debug!(tick = ctx.tick, entity = %id, "pickup");
    }
}

fn carry(ctx: &TickContext<'_>, next: &mut World) {
    let Some((pos, facing, velocity)) = next
        .holder()
        .map(|h| (h.position(), h.kinematics.facing(), h.kinematics.velocity))
    else {
        return;
    };
    let spot = carry_spot(ctx, pos, facing);
    if let Some(ball) = next.ball_mut() {
        ball.kinematics.position = spot;
        ball.kinematics.velocity = velocity;
    }
}

fn carry_spot(ctx: &TickContext<'_>, holder: Vec2, facing: Vec2) -> Vec2 {
    holder + facing * ctx.config.ball.possession_offset
}
