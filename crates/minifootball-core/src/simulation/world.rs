//! The world: entities, their tags and the match state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{MatchState, Phase};
use crate::config::FieldConfig;
use crate::entity::{Controller, Entity, EntityId, Formation, Role, Team};
use crate::replication::EntityRecord;
use crate::tags::{Tag, TagStore};

/// Who touched the ball last and who may not pick it up yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallTouch {
    /// Team of the last player to hold or kick the ball
    pub last_team: Option<Team>,
    /// Player who kicked last
    pub last_kicker: Option<EntityId>,
    /// Ticks before `last_kicker` may pick the ball up again
    pub kick_grace: u32,
}

/// Complete simulation state for one tick.
///
/// Entities live in a dense vector indexed by [`EntityId`]. Iteration is
/// always in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    entities: Vec<Entity>,
    tags: TagStore,
    state: MatchState,
    formation: Option<Formation>,
    ball: Option<EntityId>,
    touch: BallTouch,
}

impl World {
    /// Creates an empty world in the given match state.
    #[must_use]
    pub fn new(state: MatchState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    fn next_id(&self) -> EntityId {
        EntityId::new(u32::try_from(self.entities.len()).unwrap_or(u32::MAX))
    }

    /// Adds a player and returns its id.
    pub fn spawn_player(&mut self, team: Team, role: Role, home: Vec2) -> EntityId {
        let id = self.next_id();
        self.entities.push(Entity::player(id, team, role, home));
        self.tags.register(id);
        id
    }

    /// Adds the ball and returns its id. A world has at most one ball.
    pub fn spawn_ball(&mut self) -> EntityId {
        if let Some(id) = self.ball {
            return id;
        }
        let id = self.next_id();
        self.entities.push(Entity::ball(id));
        self.tags.register(id);
        self.ball = Some(id);
        id
    }

    /// Spawns both teams from `formation` plus the ball.
    pub fn spawn_teams(&mut self, formation: Formation, field: &FieldConfig) {
        for team in [Team::A, Team::B] {
            for slot in formation.slots() {
                self.spawn_player(team, slot.role, slot.home(team, field));
            }
        }
        self.spawn_ball();
        self.formation = Some(formation);
    }

    /// Returns an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Returns a mutable entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// All entities in id order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_player())
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the world has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The ball's id, if spawned.
    #[must_use]
    pub fn ball_id(&self) -> Option<EntityId> {
        self.ball
    }

    /// The ball, if spawned.
    #[must_use]
    pub fn ball(&self) -> Option<&Entity> {
        self.ball.and_then(|id| self.entity(id))
    }

    pub(crate) fn ball_mut(&mut self) -> Option<&mut Entity> {
        let id = self.ball?;
        self.entities.get_mut(id.index())
    }

    /// Tag sets.
    #[must_use]
    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    /// Mutable tag sets.
    pub fn tags_mut(&mut self) -> &mut TagStore {
        &mut self.tags
    }

    /// Match state.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }

    /// Ball touch bookkeeping.
    #[must_use]
    pub fn touch(&self) -> &BallTouch {
        &self.touch
    }

    pub(crate) fn touch_mut(&mut self) -> &mut BallTouch {
        &mut self.touch
    }

    /// The player holding the ball, if any.
    #[must_use]
    pub fn holder(&self) -> Option<&Entity> {
        self.tags.possession_holder().and_then(|id| self.entity(id))
    }

    /// Returns `true` if `id` carries `tag`.
    #[must_use]
    pub fn has_tag(&self, id: EntityId, tag: Tag) -> bool {
        self.tags.has_tag(id, tag)
    }

    /// Replicated view of every entity.
    #[must_use]
    pub fn records(&self) -> Vec<EntityRecord> {
        self.entities
            .iter()
            .map(|e| EntityRecord::from_entity(e, self.tags.get(e.id())))
            .collect()
    }

    /// Hands `id` to a controller.
    pub fn set_controller(&mut self, id: EntityId, controller: Controller) -> bool {
        match self.entity_mut(id) {
            Some(e) if e.is_player() => {
                e.controller = controller;
                true
            }
            _ => false,
        }
    }

    /// Stops every entity where it stands.
    pub(crate) fn freeze(&mut self) {
        for e in &mut self.entities {
            e.kinematics.velocity = Vec2::ZERO;
        }
    }

    /// Lines both teams up for a kickoff taken by `kicking`.
    ///
    /// Players go to their formation's kickoff spots, the ball to the centre
    /// spot. Possession, stuns and celebrations are cleared.
    pub(crate) fn reset_for_kickoff(&mut self, kicking: Team, field: &FieldConfig) {
        let mut slot_a = 0;
        let mut slot_b = 0;
        for e in &mut self.entities {
            let Some(team) = e.team() else {
                e.place(Vec2::ZERO);
                continue;
            };
            let slot = match team {
                Team::A => &mut slot_a,
                Team::B => &mut slot_b,
            };
            let spot = self
                .formation
                .as_ref()
                .and_then(|f| f.kickoff_position(*slot, team, team == kicking, field))
                .unwrap_or(e.home);
            *slot += 1;

            e.place(spot);
            e.kinematics.orientation = if team.attack_sign() > 0.0 {
                0.0
            } else {
                std::f32::consts::PI
            };
            e.intent = crate::command::RawInput::IDLE;
            e.timers.stun = 0;
        }

        self.tags.release_possession();
        self.tags.remove_from_all(Tag::Stunned);
        self.tags.remove_from_all(Tag::Sprinting);
        self.tags.remove_from_all(Tag::Celebrating);
        self.touch = BallTouch::default();
        self.state.kickoff_team = kicking;
    }

    /// Returns `true` if play is running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state.phase == Phase::Live
    }
}
