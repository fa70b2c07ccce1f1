//! AI decision engine.
//!
//! Every AI-controlled player has an [`AiBrain`]. Once per tick the engine
//! reads the last published world, lets each brain pick a state and a
//! destination, routes that destination through the [`Navigator`] and turns
//! the result into a [`RawInput`] for the tick being computed.
//!
//! # Determinism
//!
//! Brains are evaluated in parallel, then sorted by entity id. The only
//! randomness is a `ChaCha8Rng` seeded from `(match_id, tick, entity)`, so a
//! replay of the same match makes the same decisions on any machine.
//!
//! # Budgets
//!
//! Each path query gets its own [`QueryBudget`]. A query that runs out is
//! abandoned and the brain repeats its previous movement for the tick.

mod brain;

pub use brain::{AiBrain, AiState, Goal, Plan};

use std::collections::BTreeMap;

use glam::Vec2;
use pitch::{Navigator, PathQuery, QueryBudget};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::trace;

use crate::command::{ActionBits, RawInput};
use crate::config::MatchConfig;
use crate::entity::EntityId;
use crate::simulation::World;

/// One AI decision.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AiIntent {
    /// Player it drives
    pub entity: EntityId,
    /// State the brain ended up in
    pub state: AiState,
    /// Input for the tick
    pub input: RawInput,
    /// `true` if the path query ran out of budget and the previous input was reused
    pub fallback: bool,
}

/// Mixes a match id, tick and entity into a decision seed.
#[must_use]
pub fn decision_seed(match_id: u64, tick: u64, entity: EntityId) -> u64 {
    let mut z = match_id
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ u64::from(entity.as_u32()).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The random source for one entity's decision at one tick.
#[must_use]
pub fn decision_rng(match_id: u64, tick: u64, entity: EntityId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(decision_seed(match_id, tick, entity))
}

/// Brains for every AI-controlled player.
#[derive(Debug, Clone, Default)]
pub struct AiEngine {
    brains: BTreeMap<EntityId, AiBrain>,
}

impl AiEngine {
    /// Creates an engine with no brains.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the brain set to the world's AI-controlled players.
    ///
    /// Players handed to the AI get a fresh brain; players taken over by a
    /// client lose theirs.
    pub fn sync(&mut self, world: &World) {
        self.brains
            .retain(|id, _| world.entity(*id).is_some_and(crate::entity::Entity::is_ai));
        for player in world.players().filter(|p| p.is_ai()) {
            self.brains
                .entry(player.id())
                .or_insert_with(|| AiBrain::new(player.home));
        }
    }

    /// Decides inputs for `tick` from the published `world`.
    ///
    /// Call [`AiEngine::sync`] first if controllers may have changed.
    /// Returns one intent per brain, ordered by entity id.
    pub fn decide(
        &mut self,
        world: &World,
        config: &MatchConfig,
        tick: u64,
        nav: &dyn Navigator,
    ) -> Vec<AiIntent> {
        let mut intents: Vec<AiIntent> = self
            .brains
            .par_iter_mut()
            .filter_map(|(id, brain)| {
                let me = world.entity(*id)?;
                let mut rng = decision_rng(config.match_id, tick, *id);
                let plan = brain.think(me, world, config, &mut rng);
                let (input, fallback) = steer(&plan, me.position(), *id, brain, config, nav);

                if brain.state != plan.state {
                    trace!(tick, entity = %id, from = ?brain.state, to = ?plan.state, "ai state");
                }
                brain.state = plan.state;
                brain.last_intent = input;
                Some(AiIntent {
                    entity: *id,
                    state: plan.state,
                    input,
                    fallback,
                })
            })
            .collect();

        // CRITICAL: Sort for determinism
        intents.sort_by_key(|i| i.entity);
        intents
    }

    /// The brain driving `id`.
    #[must_use]
    pub fn brain(&self, id: EntityId) -> Option<&AiBrain> {
        self.brains.get(&id)
    }

    /// Current state of `id`'s brain.
    #[must_use]
    pub fn state_of(&self, id: EntityId) -> Option<AiState> {
        self.brains.get(&id).map(|b| b.state)
    }

    /// Number of brains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.brains.len()
    }

    /// Returns `true` if no player is AI-controlled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }
}

/// Turns a plan into an input by routing it through the navigator.
fn steer(
    plan: &Plan,
    pos: Vec2,
    id: EntityId,
    brain: &AiBrain,
    config: &MatchConfig,
    nav: &dyn Navigator,
) -> (RawInput, bool) {
    let (target, sprint) = match plan.goal {
        Goal::Stand => return (RawInput::new(Vec2::ZERO, plan.actions), false),
        Goal::MoveTo { target, sprint } => (target, sprint),
    };

    let mut actions = plan.actions;
    if sprint {
        actions |= ActionBits::SPRINT;
    }

    let movement = if let Some(aim) = plan.aim {
        aim
    } else if pos.distance(target) <= config.ai.arrival_tolerance {
        Vec2::ZERO
    } else {
        let mut budget = QueryBudget::new(config.ai.nav_budget);
        match nav.query_path(pos, target, id.as_u32(), &mut budget) {
            PathQuery::Found(path) => path
                .first()
                .map_or(Vec2::ZERO, |wp| (wp - pos).normalize_or_zero()),
            PathQuery::Unreachable => Vec2::ZERO,
            PathQuery::BudgetExceeded => {
                trace!(entity = %id, spent = budget.spent(), "path budget exceeded");
                return (brain.last_intent.held(), true);
            }
        }
    };
    (RawInput::new(movement, actions), false)
}
