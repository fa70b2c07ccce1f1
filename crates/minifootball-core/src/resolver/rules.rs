//! Match rules: goals, restarts, the clock and phase transitions.

use tracing::info;

use super::{Resolver, TickContext};
use crate::entity::Team;
use crate::simulation::{Phase, World};
use crate::tags::Tag;

/// Where the ball is relative to the goal lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BallZone {
    InPlay,
    /// Over a goal line inside the mouth; the team is the scorer
    Goal(Team),
    /// Over a goal line outside the mouth
    Out,
}

/// Drives the phase machine.
///
/// - `Kickoff` goes live after the configured hold.
/// - In `Live`, a ball over a goal line inside the mouth is a goal for the
///   attacking team; outside the mouth it is out, restarted by a kickoff
///   for the team that did not touch it last. The clock runs down and
///   reaching zero ends the match.
/// - `GoalScored` holds for the goal delay, then resets for a kickoff by
///   the team that conceded.
/// - `Paused` and `FullTime` only count ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct RulesResolver;

impl Resolver for RulesResolver {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn active_in(&self, _phase: Phase) -> bool {
        true
    }

    fn resolve(&self, ctx: &TickContext<'_>, next: &mut World) {
        next.state_mut().phase_ticks += 1;
        let state = *next.state();

        match ctx.phase() {
            Phase::Kickoff => {
                if state.phase_ticks >= ctx.config.rules.kickoff_hold_ticks {
                    next.state_mut().enter(Phase::Live);
                }
            }
            Phase::Live => resolve_live(ctx, next),
            Phase::GoalScored => {
                if state.phase_ticks >= ctx.config.goal_delay_ticks() {
                    next.reset_for_kickoff(state.kickoff_team, &ctx.config.field);
                    next.state_mut().enter(Phase::Kickoff);
                }
            }
            Phase::Paused | Phase::FullTime => {}
        }
    }
}

fn resolve_live(ctx: &TickContext<'_>, next: &mut World) {
    match ball_zone(ctx, next) {
        BallZone::Goal(scorer) => {
            let state = next.state_mut();
            state.score.add_goal(scorer);
            state.last_scorer = Some(scorer);
            state.kickoff_team = scorer.opponent();
            state.enter(Phase::GoalScored);
            let score = state.score;

            next.freeze();
            next.tags_mut().release_possession();
            let scorers: Vec<_> = next
                .players()
                .filter(|p| p.team() == Some(scorer))
                .map(crate::entity::Entity::id)
                .collect();
            for id in scorers {
                next.tags_mut().add_tag(id, Tag::Celebrating);
            }
            info!(tick = ctx.tick, %scorer, %score, "goal");
        }
        BallZone::Out => {
            let restart = next.touch().last_team.map_or(Team::A, Team::opponent);
            next.reset_for_kickoff(restart, &ctx.config.field);
            next.state_mut().enter(Phase::Kickoff);
            info!(tick = ctx.tick, kickoff = %restart, "ball out of play");
        }
        BallZone::InPlay => {}
    }

    let state = next.state_mut();
    state.clock_remaining = state.clock_remaining.saturating_sub(1);
    if state.clock_remaining == 0 {
        state.enter(Phase::FullTime);
        let score = state.score;
        next.freeze();
        info!(tick = ctx.tick, %score, "full time");
    }
}

fn ball_zone(ctx: &TickContext<'_>, next: &World) -> BallZone {
    let Some(ball) = next.ball() else {
        return BallZone::InPlay;
    };
    let pos = ball.position();
    let field = &ctx.config.field;
    if pos.x.abs() <= field.half_length() {
        return BallZone::InPlay;
    }
    if pos.y.abs() < field.goal_width / 2.0 {
        // Over +x is Team B's goal, scored by Team A
        let scorer = if pos.x > 0.0 { Team::A } else { Team::B };
        BallZone::Goal(scorer)
    } else {
        BallZone::Out
    }
}
