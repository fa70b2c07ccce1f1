//! Cross-module tests for the match core.
//!
//! - **Determinism tests**: identical inputs give byte-identical worlds
//! - **Integration tests**: whole matches through the session
//! - **Replication tests**: loss recovery, prediction and reconciliation
//!
//! # Test Structure
//!
//! - `determinism.rs`: replay and digest comparisons
//! - `integration.rs`: goals, restarts, possession over full matches
//! - `replication.rs`: client mirrors against the server
//! - `helpers.rs`: test setup utilities and factory functions

mod helpers;
mod integration;
