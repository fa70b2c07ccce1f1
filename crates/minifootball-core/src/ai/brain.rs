//! Per-player decision state machine.

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::command::{ActionBits, RawInput};
use crate::config::MatchConfig;
use crate::entity::{Entity, EntityId, Team};
use crate::simulation::{Phase, World};
use crate::tags::TagSet;

/// What an AI player is currently trying to do.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    /// Standing, or drifting back to its home spot
    #[default]
    Idle,
    /// Going for the ball, or carrying it at goal
    Chase,
    /// Offering a pass ahead of a teammate with the ball
    Support,
    /// Staying goal-side of an opponent
    Mark,
    /// Celebrating a goal
    Celebrate,
}

/// Where the brain wants to be this tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Goal {
    /// Do not move
    Stand,
    /// Steer toward a point
    MoveTo {
        /// Destination
        target: Vec2,
        /// Run at sprint speed
        sprint: bool,
    },
}

/// Output of one think step, before path finding.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plan {
    /// New state
    pub state: AiState,
    /// Movement goal
    pub goal: Goal,
    /// One-shot actions
    pub actions: ActionBits,
    /// If set, the player faces this direction instead of its path
    pub aim: Option<Vec2>,
}

impl Plan {
    fn stand(state: AiState) -> Self {
        Self {
            state,
            goal: Goal::Stand,
            actions: ActionBits::empty(),
            aim: None,
        }
    }

    fn move_to(state: AiState, target: Vec2, sprint: bool) -> Self {
        Self {
            state,
            goal: Goal::MoveTo { target, sprint },
            actions: ActionBits::empty(),
            aim: None,
        }
    }
}

/// Decision memory for one AI-controlled player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiBrain {
    /// Current state
    pub state: AiState,
    /// Spot to drift back to when idle
    pub home: Vec2,
    /// Input issued last tick, reused when a path query runs out of budget
    pub last_intent: RawInput,
}

impl AiBrain {
    /// A fresh brain in `Idle`.
    #[must_use]
    pub fn new(home: Vec2) -> Self {
        Self {
            state: AiState::Idle,
            home,
            last_intent: RawInput::IDLE,
        }
    }

    /// Decides state and goal for `me` from the published world.
    ///
    /// Rules in priority order:
    ///
    /// 1. After a goal: celebrate if our team scored, else idle.
    /// 2. Stunned, paused, lined up for kickoff or full time: idle.
    /// 3. Carrying the ball: shoot in range, else pass to a teammate further
    ///    up the pitch, else carry it toward the opponent goal.
    /// 4. Teammate has the ball: support.
    /// 5. Opponent has the ball: chase (and tackle) when close, else mark.
    /// 6. Loose ball: chase when close, with hysteresis; else drift home.
    #[must_use]
    pub fn think(
        &self,
        me: &Entity,
        world: &World,
        config: &MatchConfig,
        rng: &mut ChaCha8Rng,
    ) -> Plan {
        let Some(team) = me.team() else {
            return Plan::stand(AiState::Idle);
        };
        let state = world.state();
        let tags = world.tags().get(me.id());

        if state.phase == Phase::GoalScored {
            let celebrating = state.last_scorer == Some(team);
            return Plan::stand(if celebrating {
                AiState::Celebrate
            } else {
                AiState::Idle
            });
        }
        if state.phase != Phase::Live || tags.intersects(TagSet::STUNNED | TagSet::PAUSED) {
            return Plan::stand(AiState::Idle);
        }

        let Some(ball) = world.ball() else {
            return self.drift_home();
        };
        let pos = me.position();
        let ball_pos = ball.position();
        let ai = &config.ai;

        match world.holder() {
            Some(holder) if holder.id() == me.id() => shoot_pass_or_carry(me, team, world, config, rng),
            Some(holder) if holder.team() == Some(team) => {
                let ahead = team.attack_sign() * ai.support_offset;
                let target = Vec2::new(holder.position().x + ahead, self.home.y);
                Plan::move_to(AiState::Support, target, false)
            }
            Some(holder) => {
                let distance = pos.distance(holder.position());
                if distance < ai.chase_threshold {
                    let mut plan = Plan::move_to(AiState::Chase, holder.position(), true);
                    if distance <= config.rules.tackle_range && me.timers.tackle_cooldown == 0 {
                        plan.actions |= ActionBits::TACKLE;
                    }
                    plan
                } else {
                    Plan::move_to(AiState::Mark, mark_spot(me, team, holder.id(), world, config), false)
                }
            }
            None => {
                let distance = pos.distance(ball_pos);
                let reach = if self.state == AiState::Chase {
                    ai.chase_threshold * ai.chase_release_factor
                } else {
                    ai.chase_threshold
                };
                if distance < reach {
                    Plan::move_to(AiState::Chase, ball_pos, true)
                } else {
                    self.drift_home()
                }
            }
        }
    }

    fn drift_home(&self) -> Plan {
        Plan::move_to(AiState::Idle, self.home, false)
    }
}

/// Centre of the goal `team` attacks.
fn attacked_goal(team: Team, config: &MatchConfig) -> Vec2 {
    Vec2::new(team.attack_sign() * config.field.half_length(), 0.0)
}

fn shoot_pass_or_carry(
    me: &Entity,
    team: Team,
    world: &World,
    config: &MatchConfig,
    rng: &mut ChaCha8Rng,
) -> Plan {
    let goal = attacked_goal(team, config);
    let mut plan = Plan::move_to(AiState::Chase, goal, true);
    if me.position().distance(goal) <= config.ai.shoot_range {
        let spread = config.field.goal_width * 0.4;
        let aim_at = goal + Vec2::new(0.0, rng.gen_range(-spread..=spread));
        plan.aim = Some((aim_at - me.position()).normalize_or_zero());
        plan.actions |= ActionBits::KICK;
    } else if let Some(receiver) = pass_target(me, team, goal, world, config) {
        plan.aim = Some((receiver - me.position()).normalize_or_zero());
        plan.actions |= ActionBits::PASS;
    }
    plan
}

/// The free teammate in passing range nearest the goal, if it is at least
/// `pass_gain` closer to goal than `me`.
fn pass_target(me: &Entity, team: Team, goal: Vec2, world: &World, config: &MatchConfig) -> Option<Vec2> {
    let from = me.position();
    let own = from.distance(goal);
    let mut best: Option<(f32, Vec2)> = None;
    for mate in world.players() {
        if mate.team() != Some(team) || mate.id() == me.id() {
            continue;
        }
        if world.tags().get(mate.id()).contains(TagSet::STUNNED) {
            continue;
        }
        let at = mate.position();
        let d = at.distance(goal);
        if d + config.ai.pass_gain > own || from.distance(at) > config.ai.pass_range {
            continue;
        }
        // Strict comparison keeps the lower id on ties
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, at));
        }
    }
    best.map(|(_, at)| at)
}

/// A point `mark_distance` goal-side of the opponent nearest our home spot.
///
/// The ball carrier is left to whoever chases it; with nobody else to mark
/// the player covers the carrier instead.
fn mark_spot(me: &Entity, team: Team, holder: EntityId, world: &World, config: &MatchConfig) -> Vec2 {
    let own_goal = attacked_goal(team.opponent(), config);
    let mut best: Option<(f32, Vec2)> = None;
    for other in world.players() {
        if other.team() == Some(team) || other.id() == holder {
            continue;
        }
        let d = other.position().distance_squared(me.home);
        // Strict comparison keeps the lower id on ties
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, other.position()));
        }
    }
    let marked = best
        .map(|(_, p)| p)
        .or_else(|| world.entity(holder).map(Entity::position))
        .unwrap_or(own_goal);
    marked + (own_goal - marked).normalize_or_zero() * config.ai.mark_distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;
    use crate::tags::Tag;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn live() -> Simulation {
        let mut sim = Simulation::with_teams(MatchConfig::default());
        sim.advance(1, &[]).unwrap();
        sim
    }

    fn think(sim: &Simulation, id: u32, brain: &AiBrain) -> Plan {
        let me = sim.world().entity(EntityId::new(id)).unwrap();
        brain.think(me, sim.world(), sim.config(), &mut rng())
    }

    fn put_ball(sim: &mut Simulation, pos: Vec2) {
        let ball = sim.world().ball_id().unwrap();
        sim.world_mut().entity_mut(ball).unwrap().place(pos);
    }

    #[test]
    fn far_loose_ball_keeps_idle_and_near_ball_chases() {
        let mut sim = live();
        let me = sim.world().entity(EntityId::new(0)).unwrap().clone();
        let brain = AiBrain::new(me.home);

        put_ball(&mut sim, me.position() + Vec2::new(0.0, 1500.0));
        assert_eq!(think(&sim, 0, &brain).state, AiState::Idle);

        put_ball(&mut sim, me.position() + Vec2::new(0.0, 500.0));
        let plan = think(&sim, 0, &brain);
        assert_eq!(plan.state, AiState::Chase);
        assert!(matches!(plan.goal, Goal::MoveTo { sprint: true, .. }));
    }

    #[test]
    fn chase_releases_only_past_the_factor() {
        let mut sim = live();
        let me = sim.world().entity(EntityId::new(0)).unwrap().clone();
        let mut brain = AiBrain::new(me.home);
        brain.state = AiState::Chase;

        put_ball(&mut sim, me.position() + Vec2::new(0.0, 1000.0));
        assert_eq!(think(&sim, 0, &brain).state, AiState::Chase);
        put_ball(&mut sim, me.position() + Vec2::new(0.0, 1200.0));
        assert_eq!(think(&sim, 0, &brain).state, AiState::Idle);
    }

    #[test]
    fn holder_shoots_in_range() {
        let mut sim = live();
        let id = EntityId::new(2);
        sim.world_mut().entity_mut(id).unwrap().place(Vec2::new(1500.0, 0.0));
        sim.world_mut().tags_mut().add_tag(id, Tag::Possession);
        let brain = AiBrain::new(Vec2::ZERO);

        let plan = think(&sim, 2, &brain);
        assert_eq!(plan.state, AiState::Chase);
        assert!(plan.actions.contains(ActionBits::KICK));
        let aim = plan.aim.unwrap();
        assert!(aim.x > 0.9);
    }

    #[test]
    fn holder_out_of_range_passes_forward() {
        let mut sim = live();
        let holder = EntityId::new(1);
        let mate = EntityId::new(2);
        sim.world_mut().entity_mut(holder).unwrap().place(Vec2::new(-900.0, -300.0));
        sim.world_mut().entity_mut(mate).unwrap().place(Vec2::new(-100.0, 300.0));
        sim.world_mut().tags_mut().add_tag(holder, Tag::Possession);

        let plan = think(&sim, 1, &AiBrain::new(Vec2::ZERO));
        assert!(plan.actions.contains(ActionBits::PASS));
        assert!(!plan.actions.contains(ActionBits::KICK));
        let expected = (Vec2::new(-100.0, 300.0) - Vec2::new(-900.0, -300.0)).normalize();
        assert!(plan.aim.unwrap().dot(expected) > 0.999);

        // A stunned teammate is not an option; the holder carries on
        sim.world_mut().tags_mut().add_tag(mate, Tag::Stunned);
        let plan = think(&sim, 1, &AiBrain::new(Vec2::ZERO));
        assert!(plan.actions.is_empty());
        assert_eq!(plan.aim, None);
    }

    #[test]
    fn holder_does_not_pass_backwards() {
        let mut sim = live();
        let holder = EntityId::new(2);
        sim.world_mut().entity_mut(holder).unwrap().place(Vec2::new(-200.0, 0.0));
        sim.world_mut().tags_mut().add_tag(holder, Tag::Possession);

        let plan = think(&sim, 2, &AiBrain::new(Vec2::ZERO));
        assert_eq!(plan.state, AiState::Chase);
        assert!(!plan.actions.contains(ActionBits::PASS));
    }

    #[test]
    fn teammate_with_ball_means_support() {
        let mut sim = live();
        sim.world_mut().tags_mut().add_tag(EntityId::new(2), Tag::Possession);
        let plan = think(&sim, 1, &AiBrain::new(Vec2::new(-1000.0, -375.0)));
        assert_eq!(plan.state, AiState::Support);
    }

    #[test]
    fn opponent_with_ball_is_chased_or_marked() {
        let mut sim = live();
        let holder = EntityId::new(5);
        sim.world_mut().tags_mut().add_tag(holder, Tag::Possession);
        let holder_pos = sim.world().entity(holder).unwrap().position();

        // Keeper far away marks
        let plan = think(&sim, 0, &AiBrain::new(Vec2::new(-1800.0, 0.0)));
        assert_eq!(plan.state, AiState::Mark);

        // Right next to the carrier: chase and tackle
        sim.world_mut()
            .entity_mut(EntityId::new(2))
            .unwrap()
            .place(holder_pos + Vec2::new(50.0, 0.0));
        let plan = think(&sim, 2, &AiBrain::new(Vec2::ZERO));
        assert_eq!(plan.state, AiState::Chase);
        assert!(plan.actions.contains(ActionBits::TACKLE));
    }

    #[test]
    fn stunned_player_idles() {
        let mut sim = live();
        let id = EntityId::new(0);
        let pos = sim.world().entity(id).unwrap().position();
        put_ball(&mut sim, pos + Vec2::new(10.0, 0.0));
        sim.world_mut().tags_mut().add_tag(id, Tag::Stunned);
        let plan = think(&sim, 0, &AiBrain::new(pos));
        assert_eq!(plan, Plan::stand(AiState::Idle));
    }

    #[test]
    fn kickoff_lineup_stands_still() {
        let sim = Simulation::with_teams(MatchConfig::default());
        let me = sim.world().entity(EntityId::new(2)).unwrap();
        let plan = AiBrain::new(me.home).think(me, sim.world(), sim.config(), &mut rng());
        assert_eq!(plan.goal, Goal::Stand);
    }
}
