//! Countdown timers.

use tracing::trace;

use super::{Resolver, TickContext};
use crate::simulation::World;
use crate::tags::Tag;

/// Counts down stuns, tackle cooldowns and the kick grace period.
///
/// A stun that reaches zero removes the `Stunned` tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimerResolver;

impl Resolver for TimerResolver {
    fn name(&self) -> &'static str {
        "timers"
    }

    fn resolve(&self, _ctx: &TickContext<'_>, next: &mut World) {
        let mut recovered = Vec::new();
        for e in next.entities_mut() {
            if e.timers.stun > 0 {
                e.timers.stun -= 1;
                if e.timers.stun == 0 {
                    recovered.push(e.id());
                }
            }
            e.timers.tackle_cooldown = e.timers.tackle_cooldown.saturating_sub(1);
        }
        for id in recovered {
            trace!(entity = %id, "stun expired");
            next.tags_mut().remove_tag(id, Tag::Stunned);
        }

        let touch = next.touch_mut();
        touch.kick_grace = touch.kick_grace.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::entity::EntityId;
    use crate::simulation::Simulation;

    #[test]
    fn stun_expires_and_tag_is_removed() {
        let mut sim = Simulation::with_teams(MatchConfig::default());
        let id = EntityId::new(0);
        sim.world_mut().entity_mut(id).unwrap().timers.stun = 2;
        sim.world_mut().tags_mut().add_tag(id, Tag::Stunned);
        sim.world_mut().entity_mut(id).unwrap().timers.tackle_cooldown = 1;

        let config = sim.config().clone();
        let ctx_world = sim.world().clone();
        let ctx = TickContext {
            tick: 1,
            dt: config.dt(),
            config: &config,
            frames: &[],
            current: &ctx_world,
        };

        let mut next = ctx_world.clone();
        TimerResolver.resolve(&ctx, &mut next);
        assert!(next.has_tag(id, Tag::Stunned));
        assert_eq!(next.entity(id).unwrap().timers.tackle_cooldown, 0);

        TimerResolver.resolve(&ctx, &mut next);
        assert!(!next.has_tag(id, Tag::Stunned));
        assert_eq!(next.entity(id).unwrap().timers.stun, 0);
    }
}
