//! Applies command frames to player intent.

use tracing::warn;

use super::{Resolver, TickContext};
use crate::simulation::World;

/// Copies each frame's input onto its player.
///
/// Players without a frame this tick keep moving the way they were but
/// drop one-shot actions. Frames for unknown entities or the
/// ball are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandResolver;

impl Resolver for CommandResolver {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        for e in next.entities_mut() {
            e.intent = e.intent.held();
        }

        for frame in ctx.frames {
            match next.entity_mut(frame.entity) {
                Some(e) if e.is_player() => e.intent = frame.input,
                Some(_) => {
                    warn!(entity = %frame.entity, tick = ctx.tick, "command for non-player entity discarded");
                }
                None => {
                    warn!(entity = %frame.entity, tick = ctx.tick, "command for unknown entity discarded");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ActionBits, CommandFrame, RawInput};
    use crate::config::MatchConfig;
    use crate::entity::EntityId;
    use crate::simulation::Simulation;
    use glam::Vec2;

    fn frame(entity: u32, input: RawInput) -> CommandFrame {
        CommandFrame {
            entity: EntityId::new(entity),
            input,
            client_tick: 1,
            sequence: 0,
        }
    }

    #[test]
    fn frames_set_intent_and_missing_frames_hold_movement() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let config = sim.config().clone();
        let world = sim.world().clone();

        let kick = RawInput::new(Vec2::X, ActionBits::KICK);
        let frames = [frame(0, kick), frame(99, kick), frame(6, kick)];
        let ctx = TickContext {
            tick: 1,
            dt: config.dt(),
            config: &config,
            frames: &frames,
            current: &world,
        };

        let mut next = world.clone();
        CommandResolver.resolve(&ctx, &mut next);
        assert_eq!(next.entity(EntityId::new(0)).unwrap().intent, kick);
        // The ball never takes intent
        assert_eq!(next.entity(EntityId::new(6)).unwrap().intent, RawInput::IDLE);

        let ctx = TickContext { frames: &[], ..ctx };
        CommandResolver.resolve(&ctx, &mut next);
        let held = next.entity(EntityId::new(0)).unwrap().intent;
        assert_eq!(held.movement, Vec2::X);
        assert!(held.actions.is_empty());
    }
}
