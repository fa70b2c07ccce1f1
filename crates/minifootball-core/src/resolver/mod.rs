//! Resolvers: the stages of one simulation tick.
//!
//! Each resolver owns one concern and mutates the `next` world. They run in
//! a fixed order and each one sees what the previous ones wrote; `current`
//! stays available as the last published tick for anything that must be
//! judged against the start of the tick.
//!
//! # Invariants
//!
//! - Resolvers MUST be deterministic given the same world and frames
//! - Entities are visited in id order; ties always go to the lower id
//! - Anomalies are contained and logged, never returned as errors
//!
//! # Available Resolvers
//!
//! - [`TimerResolver`]: stun, tackle cooldown and kick grace countdowns
//! - [`CommandResolver`]: turns command frames into per-entity intent
//! - [`MovementResolver`]: integrates players and the loose ball
//! - [`CollisionResolver`]: player separation, pitch edges, ball bounces
//! - [`PossessionResolver`]: kicks, tackles, pickups, carrying the ball
//! - [`IntegrityResolver`]: clamps non-finite or out-of-world entities
//! - [`RulesResolver`]: goals, restarts, the match clock and phase changes

mod collision;
mod commands;
mod integrity;
mod movement;
mod possession;
mod rules;
mod timers;

pub use collision::CollisionResolver;
pub use commands::CommandResolver;
pub use integrity::IntegrityResolver;
pub use movement::MovementResolver;
pub use possession::PossessionResolver;
pub use rules::RulesResolver;
pub use timers::TimerResolver;

use crate::command::CommandFrame;
use crate::config::MatchConfig;
use crate::simulation::{Phase, World};

/// Read-only inputs for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Tick being computed
    pub tick: u64,
    /// Fixed timestep in seconds
    pub dt: f32,
    /// Match configuration
    pub config: &'a MatchConfig,
    /// Command frames for this tick, ordered by entity id
    pub frames: &'a [CommandFrame],
    /// The last published world
    pub current: &'a World,
}

impl TickContext<'_> {
    /// Phase at the start of the tick.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.current.state().phase
    }
}

/// One stage of the tick.
///
/// # Example
///
/// ```
/// use minifootball_core::resolver::{Resolver, TickContext};
/// use minifootball_core::simulation::World;
///
/// struct Noop;
///
/// impl Resolver for Noop {
///     fn name(&self) -> &'static str {
///         "noop"
///     }
///
///     fn resolve(&self, _ctx: &TickContext<'_>, _next: &mut World) {}
/// }
/// ```
pub trait Resolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this stage runs in `phase`. Defaults to live play only.
    fn active_in(&self, phase: Phase) -> bool {
        phase == Phase::Live
    }

    /// Applies this stage to `next`.
    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_is_object_safe() {
        fn _accepts_boxed(_resolver: Box<dyn Resolver>) {}
        fn _accepts_slice(_resolvers: &[Box<dyn Resolver>]) {}
    }

    #[test]
    fn only_bookkeeping_runs_outside_live() {
        let always: Vec<Box<dyn Resolver>> = vec![Box::new(IntegrityResolver), Box::new(RulesResolver)];
        let live_only: Vec<Box<dyn Resolver>> = vec![
            Box::new(TimerResolver),
            Box::new(CommandResolver),
            Box::new(MovementResolver),
            Box::new(CollisionResolver),
            Box::new(PossessionResolver),
        ];
        for phase in [Phase::Kickoff, Phase::GoalScored, Phase::Paused] {
            assert!(always.iter().all(|r| r.active_in(phase)));
            assert!(live_only.iter().all(|r| !r.active_in(phase)));
        }
        assert!(live_only.iter().all(|r| r.active_in(Phase::Live)));
    }
}
