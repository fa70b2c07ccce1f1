//! Navigator trait and the straight-line backend.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Bounds, QueryBudget};

/// Ordered list of points to walk through, excluding the start point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoints {
    points: Vec<Vec2>,
}

impl Waypoints {
    /// Creates a waypoint list.
    #[must_use]
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// The next point to steer toward, if any.
    #[must_use]
    pub fn first(&self) -> Option<Vec2> {
        self.points.first().copied()
    }

    /// The final destination, if any.
    #[must_use]
    pub fn last(&self) -> Option<Vec2> {
        self.points.last().copied()
    }

    /// All points in walking order.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if there are no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Outcome of a budgeted path query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathQuery {
    /// A path was found.
    Found(Waypoints),
    /// The goal cannot be reached from the start.
    Unreachable,
    /// The query ran out of expansions and was cancelled.
    BudgetExceeded,
}

impl PathQuery {
    /// Returns the first waypoint of a found path.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<Vec2> {
        match self {
            Self::Found(path) => path.first(),
            Self::Unreachable | Self::BudgetExceeded => None,
        }
    }
}

/// Path and steering queries against navigation data owned elsewhere.
///
/// Implementations must be deterministic: the same query against the same
/// data with the same budget returns the same result and spends the same
/// number of expansions. `entity_key` identifies the asking agent so a
/// backend can apply per-agent costs; the built-in backends ignore it.
pub trait Navigator: Send + Sync {
    /// Finds a path from `from` to `to` without exceeding `budget`.
    fn query_path(
        &self,
        from: Vec2,
        to: Vec2,
        entity_key: u32,
        budget: &mut QueryBudget,
    ) -> PathQuery;
}

/// An unobstructed rectangular pitch.
///
/// Every reachable goal is one straight segment away. Goals outside the
/// rectangle are clamped onto its edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPitch {
    bounds: Bounds,
}

impl OpenPitch {
    /// Creates an open pitch covering `bounds`.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// The walkable area.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl Navigator for OpenPitch {
    fn query_path(
        &self,
        _from: Vec2,
        to: Vec2,
        _entity_key: u32,
        budget: &mut QueryBudget,
    ) -> PathQuery {
        if !budget.try_spend() {
            return PathQuery::BudgetExceeded;
        }
        if !to.is_finite() {
            return PathQuery::Unreachable;
        }
        PathQuery::Found(Waypoints::new(vec![self.bounds.clamp(to)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch() -> OpenPitch {
        OpenPitch::new(Bounds::centered(100.0, 50.0))
    }

    #[test]
    fn straight_line_path() {
        let mut budget = QueryBudget::new(4);
        let result = pitch().query_path(Vec2::ZERO, Vec2::new(10.0, 5.0), 0, &mut budget);
        assert_eq!(
            result,
            PathQuery::Found(Waypoints::new(vec![Vec2::new(10.0, 5.0)]))
        );
        assert_eq!(budget.spent(), 1);
    }

    #[test]
    fn goal_outside_is_clamped() {
        let mut budget = QueryBudget::new(4);
        let result = pitch().query_path(Vec2::ZERO, Vec2::new(500.0, 0.0), 0, &mut budget);
        assert_eq!(result.next_waypoint(), Some(Vec2::new(50.0, 0.0)));
    }

    #[test]
    fn empty_budget_cancels() {
        let mut budget = QueryBudget::new(0);
        let result = pitch().query_path(Vec2::ZERO, Vec2::X, 0, &mut budget);
        assert_eq!(result, PathQuery::BudgetExceeded);
        assert_eq!(result.next_waypoint(), None);
    }

    #[test]
    fn non_finite_goal_is_unreachable() {
        let mut budget = QueryBudget::new(4);
        let result = pitch().query_path(Vec2::ZERO, Vec2::new(f32::NAN, 0.0), 0, &mut budget);
        assert_eq!(result, PathQuery::Unreachable);
    }

    #[test]
    fn navigator_is_object_safe() {
        fn _accepts_boxed(_nav: Box<dyn Navigator>) {}
    }
}
