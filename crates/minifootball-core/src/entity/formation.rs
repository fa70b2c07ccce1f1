//! Team formations.
//!
//! Slots are stored relative to the pitch from Team A's point of view:
//! `rel_x` is a fraction of the length (negative is the own half), `rel_y` a
//! fraction of the width. Team B mirrors x.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{Role, Team};
use crate::config::FieldConfig;

/// Kickoff placement keeps everyone at least this far (as a length
/// fraction) inside their own half, except the kicker.
const KICKOFF_LINE: f32 = -0.1;

/// Where the kicking player stands, just behind the centre spot.
const KICKER_REL_X: f32 = -0.025;

/// One position in a formation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Role of the player taking this slot
    pub role: Role,
    /// Fraction of the pitch length, negative toward the own goal
    pub rel_x: f32,
    /// Fraction of the pitch width
    pub rel_y: f32,
}

impl Slot {
    const fn new(role: Role, rel_x: f32, rel_y: f32) -> Self {
        Self { role, rel_x, rel_y }
    }

    /// The slot's home position for `team`.
    #[must_use]
    pub fn home(&self, team: Team, field: &FieldConfig) -> Vec2 {
        Vec2::new(
            self.rel_x * field.length * team.attack_sign(),
            self.rel_y * field.width,
        )
    }
}

/// An ordered list of slots. Slot 0 is always the goalkeeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    slots: Vec<Slot>,
}

impl Formation {
    /// Goalkeeper, one defender, one striker.
    #[must_use]
    pub fn three_a_side() -> Self {
        Self {
            slots: vec![
                Slot::new(Role::Goalkeeper, -0.45, 0.0),
                Slot::new(Role::Defender, -0.25, -0.15),
                Slot::new(Role::Striker, -0.05, 0.15),
            ],
        }
    }

    /// Classic 4-4-2.
    #[must_use]
    pub fn four_four_two() -> Self {
        Self {
            slots: vec![
                Slot::new(Role::Goalkeeper, -0.45, 0.0),
                Slot::new(Role::Defender, -0.35, -0.35),
                Slot::new(Role::Defender, -0.35, -0.12),
                Slot::new(Role::Defender, -0.35, 0.12),
                Slot::new(Role::Defender, -0.35, 0.35),
                Slot::new(Role::Midfielder, -0.10, -0.35),
                Slot::new(Role::Midfielder, -0.10, -0.12),
                Slot::new(Role::Midfielder, -0.10, 0.12),
                Slot::new(Role::Midfielder, -0.10, 0.35),
                Slot::new(Role::Striker, 0.30, -0.15),
                Slot::new(Role::Striker, 0.30, 0.15),
            ],
        }
    }

    /// 4-3-3 with wingers.
    #[must_use]
    pub fn four_three_three() -> Self {
        Self {
            slots: vec![
                Slot::new(Role::Goalkeeper, -0.45, 0.0),
                Slot::new(Role::Defender, -0.35, -0.35),
                Slot::new(Role::Defender, -0.35, -0.12),
                Slot::new(Role::Defender, -0.35, 0.12),
                Slot::new(Role::Defender, -0.35, 0.35),
                Slot::new(Role::Midfielder, -0.15, 0.0),
                Slot::new(Role::Midfielder, -0.05, -0.20),
                Slot::new(Role::Midfielder, -0.05, 0.20),
                Slot::new(Role::Striker, 0.25, -0.35),
                Slot::new(Role::Striker, 0.30, 0.0),
                Slot::new(Role::Striker, 0.25, 0.35),
            ],
        }
    }

    /// Picks a formation for `team_size` players.
    ///
    /// Sizes without a named formation get a goalkeeper plus outfield
    /// players spread in lines across the own half.
    #[must_use]
    pub fn for_team_size(team_size: usize) -> Self {
        match team_size {
            3 => Self::three_a_side(),
            11 => Self::four_four_two(),
            n => Self::spread(n),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn spread(team_size: usize) -> Self {
        let mut slots = vec![Slot::new(Role::Goalkeeper, -0.45, 0.0)];
        let outfield = team_size.saturating_sub(1);
        for i in 0..outfield {
            let t = (i as f32 + 1.0) / (outfield as f32 + 1.0);
            let role = if t < 0.4 {
                Role::Defender
            } else if t < 0.7 {
                Role::Midfielder
            } else {
                Role::Striker
            };
            // Alternate sides so neighbours in the list do not overlap
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            slots.push(Slot::new(role, -0.35 + 0.3 * t, side * 0.3 * t));
        }
        slots.truncate(team_size);
        Self { slots }
    }

    /// The slots in order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the formation has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot that takes the kickoff: the most advanced one.
    #[must_use]
    pub fn kicker_index(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.rel_x.total_cmp(&b.rel_x).then(ib.cmp(ia)))
            .map(|(i, _)| i)
    }

    /// Kickoff position of slot `index` for `team`.
    ///
    /// Everyone stands in their own half, clear of the centre. The kicker of
    /// the team taking the kickoff stands right behind the ball.
    #[must_use]
    pub fn kickoff_position(
        &self,
        index: usize,
        team: Team,
        kicking: bool,
        field: &FieldConfig,
    ) -> Option<Vec2> {
        let slot = self.slots.get(index)?;
        let placed = if kicking && Some(index) == self.kicker_index() {
            Slot {
                rel_x: KICKER_REL_X,
                rel_y: 0.0,
                ..*slot
            }
        } else {
            Slot {
                rel_x: slot.rel_x.min(KICKOFF_LINE),
                ..*slot
            }
        };
        Some(placed.home(team, field))
    }
}
