//! Wire format.
//!
//! Every message is a bincode payload inside a versioned length frame
//! (little-endian):
//!
//! - u8 `FRAME_VERSION` (1)
//! - u32 LEN (bytes of payload)
//! - [u8; LEN] payload
//!
//! Decoding never trusts the declared length beyond [`MAX_FRAME_LEN`].

use serde::{Deserialize, Serialize};

use super::SnapshotDelta;
use crate::command::RawInput;
use crate::entity::{ClientId, EntityId};
use crate::error::WireError;
use crate::simulation::Score;

/// Current frame version.
pub const FRAME_VERSION: u8 = 1;

/// Largest payload accepted.
pub const MAX_FRAME_LEN: usize = 1_048_576;

const HEADER_LEN: usize = 5;

/// A client's input for one predicted tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandMsg {
    /// Player the input drives
    pub entity: EntityId,
    /// The input
    pub input: RawInput,
    /// Tick the client predicted it for
    pub client_tick: u64,
}

/// Session-level signalling in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SessionControl {
    /// Server to client: you are `client`, driving `entity`
    Welcome {
        /// Assigned client id
        client: ClientId,
        /// Player the client controls
        entity: EntityId,
    },
    /// Client to server: the mirror is complete up to `tick`
    Ack {
        /// Last applied tick
        tick: u64,
    },
    /// Client to server: leaving the match
    Disconnect,
    /// Server to client: the match ended
    FullTime {
        /// Final score
        score: Score,
    },
}

/// Every message that crosses the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Client input
    Command(CommandMsg),
    /// Server state update
    Snapshot(SnapshotDelta),
    /// Signalling
    Control(SessionControl),
}

impl WireMessage {
    /// Encodes into a new framed buffer.
    ///
    /// # Errors
    ///
    /// [`WireError::Codec`] if serialization fails and
    /// [`WireError::FrameTooLarge`] if the payload exceeds the cap.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let payload = bincode::serialize(self)?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        write_frame(&mut out, &payload)?;
        Ok(out)
    }

    /// Decodes one framed message.
    ///
    /// # Errors
    ///
    /// Any framing error, or [`WireError::Codec`] for a bad payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let payload = read_frame(bytes)?;
        Ok(bincode::deserialize(payload)?)
    }
}

/// Appends a framed payload to `out`.
///
/// # Errors
///
/// [`WireError::FrameTooLarge`] if `payload` exceeds [`MAX_FRAME_LEN`].
pub fn write_frame(out: &mut Vec<u8>, payload: &[u8]) -> Result<(), WireError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        len: payload.len(),
        max: MAX_FRAME_LEN,
    })?;
    out.push(FRAME_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Reads one frame from the start of `inp` and returns its payload.
///
/// # Errors
///
/// [`WireError::ShortFrame`], [`WireError::UnsupportedVersion`] or
/// [`WireError::FrameTooLarge`].
pub fn read_frame(inp: &[u8]) -> Result<&[u8], WireError> {
    if inp.len() < HEADER_LEN {
        return Err(WireError::ShortFrame {
            needed: HEADER_LEN,
            available: inp.len(),
        });
    }
    let version = inp[0];
    if version != FRAME_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&inp[1..HEADER_LEN]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    if inp.len() < HEADER_LEN + len {
        return Err(WireError::ShortFrame {
            needed: HEADER_LEN + len,
            available: inp.len(),
        });
    }
    Ok(&inp[HEADER_LEN..HEADER_LEN + len])
}
