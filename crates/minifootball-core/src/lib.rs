//! # Mini Football Core
//!
//! Networked match-simulation core for a small-sided football game.
//!
//! The server runs an authoritative, fixed-timestep simulation of players,
//! AI and a ball. Clients mirror it from replicated snapshot deltas, predict
//! their own player from local input and reconcile when the server's answer
//! for a tick arrives. Status such as possession or stuns lives in a
//! tag store that every other part of the core consults.
//!
//! ## Architecture
//!
//! - [`tags`]: per-entity tag sets with the single-holder possession rule
//! - [`command`]: validated, ordered, per-tick command frames
//! - [`ai`]: finite-state decisions for AI-controlled players
//! - [`simulation`]: the authoritative world and its resolver chain
//! - [`replication`]: snapshot deltas, wire codec, server fan-out, client mirror
//! - [`session`]: tick cadence, pause/resume and lifecycle
//!
//! ## Usage
//!
//! ```
//! use minifootball_core::config::MatchConfig;
//! use minifootball_core::pitch::{Bounds, OpenPitch};
//! use minifootball_core::session::MatchSession;
//!
//! let config = MatchConfig::default();
//! let nav = OpenPitch::new(Bounds::centered(config.field.length, config.field.width));
//! let mut session = MatchSession::new(config, Box::new(nav)).unwrap();
//!
//! session.start();
//! session.run(10).unwrap();
//! assert_eq!(session.current_match_state().tick, 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export pitch for navigation queries
pub use pitch;

pub mod ai;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod replication;
pub mod resolver;
pub mod session;
pub mod simulation;
pub mod tags;

pub use command::{ActionBits, CommandFrame, CommandPipeline, RawInput};
pub use config::MatchConfig;
pub use entity::{ClientId, EntityId, Team};
pub use error::{CommandRejection, ConfigError, SessionError, WireError};
pub use replication::{ClientReplica, SnapshotDelta};
pub use session::MatchSession;
pub use simulation::{MatchState, Phase, Simulation};
pub use tags::{Tag, TagSet, TagStore};

#[cfg(test)]
mod tests;
