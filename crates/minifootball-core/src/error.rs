//! Error types for the match core.
//!
//! Errors are split by who has to react to them:
//!
//! - [`CommandRejection`]: a single inbound command was dropped. Never fatal.
//! - [`SessionError`]: the caller misused the session lifecycle.
//! - [`WireError`]: bytes from the network could not be decoded.
//! - [`ConfigError`]: a match configuration could not be loaded or is invalid.
//!
//! Anomalies that happen inside a tick (bad numbers, unknown entities) are
//! not errors at all: they are contained by the simulation and only logged.

use thiserror::Error;

use crate::entity::{ClientId, EntityId};
use crate::simulation::Phase;

/// Why the command pipeline refused a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandRejection {
    /// The command targets a tick older than the staleness bound allows.
    #[error("command for {entity} at tick {client_tick} is stale (server tick {server_tick})")]
    Stale {
        /// Entity the command was for
        entity: EntityId,
        /// Tick stamped by the client
        client_tick: u64,
        /// Server tick at arrival
        server_tick: u64,
    },
    /// The command targets a tick too far in the future.
    #[error("command for {entity} at tick {client_tick} is ahead of server tick {server_tick}")]
    TooFarAhead {
        /// Entity the command was for
        entity: EntityId,
        /// Tick stamped by the client
        client_tick: u64,
        /// Server tick at arrival
        server_tick: u64,
    },
    /// The input vector is not finite or exceeds the allowed magnitude.
    #[error("malformed input for {entity}: {reason}")]
    Malformed {
        /// Entity the command was for
        entity: EntityId,
        /// Human-readable reason
        reason: &'static str,
    },
}

/// Session lifecycle misuse surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The session has not been started yet.
    #[error("session has not been started")]
    NotStarted,
    /// The match reached full time; no further ticks are processed.
    #[error("session is terminal since tick {tick}")]
    Terminal {
        /// Tick at which the match ended
        tick: u64,
    },
    /// `advance` was called with a tick that does not follow the last one.
    #[error("expected tick {expected}, got {got}")]
    OutOfOrder {
        /// Next tick the simulation expects
        expected: u64,
        /// Tick that was requested
        got: u64,
    },
    /// The requested phase change is not legal from the current phase.
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },
    /// Every player is already controlled by a connected client.
    #[error("no free player slot for a new client")]
    NoFreeSlot,
    /// The client id is not connected.
    #[error("unknown client {0}")]
    UnknownClient(ClientId),
}

/// Failure decoding or encoding a wire message.
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than a frame header or its declared payload.
    #[error("short frame: need {needed} bytes, have {available}")]
    ShortFrame {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },
    /// The frame version byte is unknown.
    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),
    /// The declared payload exceeds the frame cap.
    #[error("frame too large: {len} > {max}")]
    FrameTooLarge {
        /// Declared length
        len: usize,
        /// Maximum accepted length
        max: usize,
    },
    /// The payload failed to (de)serialize.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failure loading a match configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
