//! Entities on the pitch.
//!
//! Players and the ball share one [`Entity`] record. Identity and team are
//! fixed at spawn; kinematic state, controller and timers change over the
//! match. Status flags such as possession live in the tag store, not here.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use minifootball_core::entity::{Entity, EntityId, EntityKind, Role, Team};
//!
//! let striker = Entity::player(EntityId::new(3), Team::A, Role::Striker, Vec2::new(-100.0, 0.0));
//! assert_eq!(striker.kind(), EntityKind::Player);
//! assert_eq!(striker.team(), Some(Team::A));
//! assert_eq!(striker.kinematics.position, Vec2::new(-100.0, 0.0));
//! ```

pub mod formation;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::command::RawInput;

pub use formation::{Formation, Slot};

/// Unique identifier for an entity.
///
/// Ids are dense indices into the world's entity storage and are never
/// reused during a match. Ordering by id is the tie-break for every
/// deterministic decision in the simulation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index into dense entity storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Identifier of a connected client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(u32);

impl ClientId {
    /// Creates a client id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// What an entity is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// An outfield player or goalkeeper
    Player,
    /// The match ball
    Ball,
}

/// One of the two sides.
///
/// Team A defends the goal at negative x and attacks toward positive x.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Defends negative x
    A,
    /// Defends positive x
    B,
}

impl Team {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// `+1.0` if this team attacks toward positive x, else `-1.0`.
    #[must_use]
    pub const fn attack_sign(self) -> f32 {
        match self {
            Self::A => 1.0,
            Self::B => -1.0,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Position a player takes in the formation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Stays near the own goal
    Goalkeeper,
    /// Back line
    Defender,
    /// Middle of the pitch
    Midfielder,
    /// Front line
    Striker,
}

/// Who drives an entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Controller {
    /// A connected client's commands
    Human(ClientId),
    /// The AI decision engine
    Ai,
    /// Nothing (the ball)
    None,
}

/// Position, velocity and facing.
///
/// Shared between the server simulation and client-side prediction so both
/// integrate movement with the same function.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Position on the pitch (cm)
    pub position: Vec2,
    /// Velocity (cm/s)
    pub velocity: Vec2,
    /// Facing angle in radians, 0 along +x
    pub orientation: f32,
}

impl Kinematics {
    /// At rest at `position`, facing +x.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            orientation: 0.0,
        }
    }

    /// Unit vector the entity is facing.
    #[must_use]
    pub fn facing(&self) -> Vec2 {
        Vec2::from_angle(self.orientation)
    }

    /// Returns `true` if every component is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.orientation.is_finite()
    }
}

/// Countdowns kept per entity, all in ticks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    /// Remaining stun
    pub stun: u32,
    /// Remaining tackle cooldown
    pub tackle_cooldown: u32,
}

/// A player or the ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    team: Option<Team>,
    role: Option<Role>,
    /// Current controller
    pub controller: Controller,
    /// Position, velocity and facing
    pub kinematics: Kinematics,
    /// Where the entity stands at kickoff
    pub home: Vec2,
    /// Last position that passed the integrity check
    pub last_valid_position: Vec2,
    /// Input applied this tick
    pub intent: RawInput,
    /// Countdowns
    pub timers: Timers,
}

impl Entity {
    /// Creates an AI-controlled player standing at `home`.
    #[must_use]
    pub fn player(id: EntityId, team: Team, role: Role, home: Vec2) -> Self {
        Self {
            id,
            kind: EntityKind::Player,
            team: Some(team),
            role: Some(role),
            controller: Controller::Ai,
            kinematics: Kinematics::at(home),
            home,
            last_valid_position: home,
            intent: RawInput::default(),
            timers: Timers::default(),
        }
    }

    /// Creates the ball at the centre spot.
    #[must_use]
    pub fn ball(id: EntityId) -> Self {
        Self {
            id,
            kind: EntityKind::Ball,
            team: None,
            role: None,
            controller: Controller::None,
            kinematics: Kinematics::default(),
            home: Vec2::ZERO,
            last_valid_position: Vec2::ZERO,
            intent: RawInput::default(),
            timers: Timers::default(),
        }
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the team, `None` for the ball.
    #[must_use]
    pub fn team(&self) -> Option<Team> {
        self.team
    }

    /// Returns the formation role, `None` for the ball.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Returns `true` for players.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Returns `true` if the AI engine drives this entity.
    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.controller == Controller::Ai
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.kinematics.position
    }

    /// Moves the entity, bringing the last valid position along.
    ///
    /// Used for restarts and scenario setup. Motion during play goes
    /// through the resolvers instead.
    pub fn place(&mut self, position: Vec2) {
        self.kinematics.position = position;
        self.kinematics.velocity = Vec2::ZERO;
        self.last_valid_position = position;
    }
}
