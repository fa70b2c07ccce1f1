//! Replication between the authoritative server and its clients.
//!
//! - [`delta`]: per-tick snapshot deltas of absolute entity records
//! - [`server`]: per-client deltas against each client's acknowledged tick
//! - [`client`]: the client mirror, local prediction and reconciliation
//! - [`wire`]: versioned, length-framed bincode messages
//! - [`transport`]: in-process links with deterministic loss
//!
//! # Loss tolerance
//!
//! Clients acknowledge the last tick they applied. The server diffs each
//! client's next delta against that tick while it is still in the replay
//! buffer and sends a keyframe otherwise, so a client converges again from
//! the first delta it receives after any run of losses.

pub mod client;
pub mod delta;
pub mod server;
pub mod transport;
pub mod wire;

pub use client::{ClientReplica, ReplicaEvent, ReplicaStats};
pub use delta::{DeltaFit, EntityRecord, SnapshotDelta};
pub use server::ReplicationServer;
pub use transport::{link_pair, Delivery, Link, Loss};
pub use wire::{CommandMsg, SessionControl, WireMessage};
