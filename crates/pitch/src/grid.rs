//! Occupancy grid backend searched with budgeted A*.
//!
//! The grid covers a [`Bounds`] rectangle split into square cells. Blocked
//! cells are impassable. Search order is fully deterministic: neighbours are
//! visited in a fixed N, E, S, W order and heap ties are broken by insertion
//! order, so two identical queries expand identical nodes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;
use thiserror::Error;
use tracing::trace;

use crate::{Bounds, Navigator, PathQuery, QueryBudget, Waypoints};

/// Errors building a grid.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// Cell size must be strictly positive and finite.
    #[error("cell size must be > 0, got {0}")]
    InvalidCellSize(f32),
    /// The bounds produce a grid with no cells.
    #[error("bounds {0:?} produce an empty grid")]
    Empty(Bounds),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Cell {
    x: i32,
    y: i32,
}

#[derive(Debug, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    g: u32,
    cell: Cell,
    seq: u64,
}

impl OpenNode {
    fn key(&self) -> (u32, u32, Cell, u64) {
        (self.f, self.g, self.cell, self.seq)
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest key first.
        other.key().cmp(&self.key())
    }
}

enum Search {
    Path(Vec<Cell>),
    NoPath,
    OutOfBudget,
}

/// A 4-connected navigation grid.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use pitch::{Bounds, NavGrid, Navigator, PathQuery, QueryBudget};
///
/// let mut grid = NavGrid::new(Bounds::centered(100.0, 100.0), 10.0).unwrap();
/// grid.block_rect(Vec2::new(-5.0, -40.0), Vec2::new(5.0, 40.0));
///
/// let mut budget = QueryBudget::new(500);
/// let result = grid.query_path(Vec2::new(-30.0, 0.0), Vec2::new(30.0, 0.0), 0, &mut budget);
/// assert!(matches!(result, PathQuery::Found(_)));
/// ```
#[derive(Debug, Clone)]
pub struct NavGrid {
    bounds: Bounds,
    cell_size: f32,
    width: i32,
    height: i32,
    blocked: Vec<bool>,
}

impl NavGrid {
    /// Creates an open grid over `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if `cell_size` is not positive or the bounds are
    /// smaller than one cell.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(bounds: Bounds, cell_size: f32) -> Result<Self, GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let size = bounds.size();
        let width = (size.x / cell_size).ceil() as i32;
        let height = (size.y / cell_size).ceil() as i32;
        if width <= 0 || height <= 0 {
            return Err(GridError::Empty(bounds));
        }
        #[allow(clippy::cast_sign_loss)]
        let len = (width * height) as usize;
        Ok(Self {
            bounds,
            cell_size,
            width,
            height,
            blocked: vec![false; len],
        })
    }

    /// Grid dimensions in cells.
    #[must_use]
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Marks every cell whose centre lies inside the rectangle as blocked.
    pub fn block_rect(&mut self, min: Vec2, max: Vec2) {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Cell { x, y };
                let c = self.cell_center(cell);
                if c.x >= min.x && c.x <= max.x && c.y >= min.y && c.y <= max.y {
                    if let Some(idx) = self.idx(cell) {
                        self.blocked[idx] = true;
                    }
                }
            }
        }
    }

    /// Returns `true` if the cell under `point` is blocked or off-grid.
    #[must_use]
    pub fn is_blocked_at(&self, point: Vec2) -> bool {
        self.world_to_cell(point)
            .and_then(|c| self.idx(c))
            .map_or(true, |idx| self.blocked[idx])
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    #[allow(clippy::cast_sign_loss)]
    fn idx(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn cell_from_idx(&self, idx: usize) -> Cell {
        let idx = idx as i32;
        Cell {
            x: idx % self.width,
            y: idx / self.width,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn world_to_cell(&self, p: Vec2) -> Option<Cell> {
        if !p.is_finite() {
            return None;
        }
        let local = p - self.bounds.min;
        let cell = Cell {
            x: (local.x / self.cell_size).floor() as i32,
            y: (local.y / self.cell_size).floor() as i32,
        };
        self.in_bounds(cell).then_some(cell)
    }

    #[allow(clippy::cast_precision_loss)]
    fn cell_center(&self, cell: Cell) -> Vec2 {
        self.bounds.min
            + Vec2::new(
                (cell.x as f32 + 0.5) * self.cell_size,
                (cell.y as f32 + 0.5) * self.cell_size,
            )
    }

    #[allow(clippy::cast_sign_loss)]
    fn heuristic(a: Cell, b: Cell) -> u32 {
        ((a.x - b.x).abs() + (a.y - b.y).abs()) as u32
    }

    fn neighbors(cell: Cell) -> [Cell; 4] {
        [
            Cell { x: cell.x, y: cell.y - 1 },
            Cell { x: cell.x + 1, y: cell.y },
            Cell { x: cell.x, y: cell.y + 1 },
            Cell { x: cell.x - 1, y: cell.y },
        ]
    }

    fn a_star(&self, start: Cell, goal: Cell, budget: &mut QueryBudget) -> Search {
        let (Some(start_idx), Some(goal_idx)) = (self.idx(start), self.idx(goal)) else {
            return Search::NoPath;
        };
        if self.blocked[start_idx] || self.blocked[goal_idx] {
            return Search::NoPath;
        }

        let mut open = BinaryHeap::new();
        let mut seq: u64 = 0;
        let mut g_score = vec![u32::MAX; self.blocked.len()];
        let mut came_from: Vec<Option<usize>> = vec![None; self.blocked.len()];

        g_score[start_idx] = 0;
        open.push(OpenNode {
            f: Self::heuristic(start, goal),
            g: 0,
            cell: start,
            seq,
        });

        while let Some(node) = open.pop() {
            let Some(node_idx) = self.idx(node.cell) else {
                continue;
            };
            if node.g != g_score[node_idx] {
                continue; // stale heap entry
            }
            if node.cell == goal {
                let mut out = vec![goal_idx];
                let mut current = goal_idx;
                while let Some(prev) = came_from[current] {
                    current = prev;
                    out.push(current);
                }
                out.reverse();
                return Search::Path(out.into_iter().map(|i| self.cell_from_idx(i)).collect());
            }
            if !budget.try_spend() {
                return Search::OutOfBudget;
            }

            for n in Self::neighbors(node.cell) {
                let Some(n_idx) = self.idx(n) else { continue };
                if self.blocked[n_idx] {
                    continue;
                }
                let tentative = node.g.saturating_add(1);
                if tentative >= g_score[n_idx] {
                    continue;
                }
                came_from[n_idx] = Some(node_idx);
                g_score[n_idx] = tentative;
                seq += 1;
                open.push(OpenNode {
                    f: tentative.saturating_add(Self::heuristic(n, goal)),
                    g: tentative,
                    cell: n,
                    seq,
                });
            }
        }

        Search::NoPath
    }
}

impl Navigator for NavGrid {
    fn query_path(
        &self,
        from: Vec2,
        to: Vec2,
        entity_key: u32,
        budget: &mut QueryBudget,
    ) -> PathQuery {
        let (Some(start), Some(goal)) = (self.world_to_cell(from), self.world_to_cell(to)) else {
            return PathQuery::Unreachable;
        };
        match self.a_star(start, goal, budget) {
            Search::Path(cells) => {
                // Interior cell centres, then the exact goal.
                let mut points: Vec<Vec2> = cells
                    .iter()
                    .skip(1)
                    .take(cells.len().saturating_sub(2))
                    .map(|c| self.cell_center(*c))
                    .collect();
                points.push(to);
                PathQuery::Found(Waypoints::new(points))
            }
            Search::NoPath => PathQuery::Unreachable,
            Search::OutOfBudget => {
                trace!(entity_key, spent = budget.spent(), "grid query out of budget");
                PathQuery::BudgetExceeded
            }
        }
    }
}
