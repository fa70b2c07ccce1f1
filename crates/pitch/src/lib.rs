//! # Pitch
//!
//! Navigation substrate for the mini football simulation.
//!
//! The match core never owns navigation data. It asks a [`Navigator`] for a
//! path between two points and pays for the answer out of a [`QueryBudget`].
//! A query that runs out of budget is cancelled and reported as
//! [`PathQuery::BudgetExceeded`], so a slow query can never stall a tick.
//!
//! Two backends are provided:
//!
//! - [`OpenPitch`]: an unobstructed rectangle. Every query is a straight line.
//! - [`NavGrid`]: a 4-connected occupancy grid searched with A*.
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use pitch::{Bounds, Navigator, OpenPitch, PathQuery, QueryBudget};
//!
//! let nav = OpenPitch::new(Bounds::centered(4000.0, 2500.0));
//! let mut budget = QueryBudget::new(64);
//!
//! match nav.query_path(Vec2::ZERO, Vec2::new(500.0, 0.0), 7, &mut budget) {
//!     PathQuery::Found(path) => assert_eq!(path.last(), Some(Vec2::new(500.0, 0.0))),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod budget;
pub mod grid;
pub mod navigator;

// Re-exports for convenience
pub use budget::QueryBudget;
pub use grid::{GridError, NavGrid};
pub use navigator::{Navigator, OpenPitch, PathQuery, Waypoints};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle on the pitch plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from dimensions (centered at origin).
    #[must_use]
    pub fn centered(length: f32, width: f32) -> Self {
        Self {
            min: Vec2::new(-length / 2.0, -width / 2.0),
            max: Vec2::new(length / 2.0, width / 2.0),
        }
    }

    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Check if a point is inside the bounds (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Clamp a point into the bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Grow the bounds by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }
}
