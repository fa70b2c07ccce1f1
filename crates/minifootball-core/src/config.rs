//! Match configuration.
//!
//! All distances are in centimetres, speeds in centimetres per second and
//! durations in seconds unless a field name says `ticks`. Durations are
//! converted to whole ticks once, through [`MatchConfig::secs_to_ticks`], so
//! the simulation itself only ever counts ticks.
//!
//! Every section implements [`Default`] with the standard 3v3 values, and
//! deserialization fills missing fields from those defaults, so a config
//! file only needs the values it changes:
//!
//! ```
//! use minifootball_core::config::MatchConfig;
//!
//! let config = MatchConfig::from_json_str(r#"{ "tick_rate": 60, "ball": { "friction": 300.0 } }"#).unwrap();
//! assert_eq!(config.tick_rate, 60);
//! assert_eq!(config.ball.friction, 300.0);
//! assert_eq!(config.team_size, 3);
//! ```

use std::path::Path;

use pitch::Bounds;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Match identifier, also the root of all AI randomness
    pub match_id: u64,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Playing time in seconds (the clock only runs while live)
    pub match_duration_secs: f32,
    /// Players per team
    pub team_size: usize,
    /// Pitch geometry
    pub field: FieldConfig,
    /// Player movement
    pub movement: MovementConfig,
    /// Ball physics and possession
    pub ball: BallConfig,
    /// Tackles, stuns and restarts
    pub rules: RulesConfig,
    /// Command acceptance and replication
    pub net: NetConfig,
    /// AI tuning
    pub ai: AiConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_id: 0,
            tick_rate: 30,
            match_duration_secs: 180.0,
            team_size: 3,
            field: FieldConfig::default(),
            movement: MovementConfig::default(),
            ball: BallConfig::default(),
            rules: RulesConfig::default(),
            net: NetConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

/// Pitch geometry.
///
/// The length runs along x with the goals at `x = ±length / 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Goal line to goal line
    pub length: f32,
    /// Touchline to touchline
    pub width: f32,
    /// Goal mouth width, centred on y = 0
    pub goal_width: f32,
    /// How far players may run past the touch and goal lines
    pub out_of_bounds_buffer: f32,
    /// Margin around the pitch beyond which a position is invalid
    pub world_margin: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            length: 4000.0,
            width: 2500.0,
            goal_width: 400.0,
            out_of_bounds_buffer: 100.0,
            world_margin: 500.0,
        }
    }
}

impl FieldConfig {
    /// Half the pitch length.
    #[must_use]
    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }

    /// Half the pitch width.
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// The pitch rectangle.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::centered(self.length, self.width)
    }

    /// The area players are kept inside.
    #[must_use]
    pub fn play_area(&self) -> Bounds {
        self.bounds().expanded(self.out_of_bounds_buffer)
    }

    /// The area outside of which any position is treated as corrupt.
    #[must_use]
    pub fn world_bounds(&self) -> Bounds {
        self.bounds().expanded(self.world_margin)
    }
}

/// Player movement tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Top speed without sprint
    pub walk_speed: f32,
    /// Top speed while sprinting
    pub sprint_speed: f32,
    /// How quickly velocity approaches the desired velocity
    pub acceleration: f32,
    /// Collision radius of a player
    pub player_radius: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 400.0,
            sprint_speed: 600.0,
            acceleration: 2000.0,
            player_radius: 40.0,
        }
    }
}

/// Ball physics and possession tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// Launch speed of a kick
    pub shoot_speed: f32,
    /// Launch speed of a pass
    pub pass_speed: f32,
    /// Linear deceleration of a loose ball
    pub friction: f32,
    /// Below this speed a loose ball stops
    pub min_speed: f32,
    /// Ball radius
    pub radius: f32,
    /// Distance within which a free player picks the ball up
    pub pickup_radius: f32,
    /// Distance in front of the holder at which a held ball sits
    pub possession_offset: f32,
    /// Velocity kept when bouncing off a touchline
    pub wall_restitution: f32,
    /// Ticks after a kick during which the kicker cannot pick the ball up
    pub kick_grace_ticks: u32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            shoot_speed: 2500.0,
            pass_speed: 1200.0,
            friction: 500.0,
            min_speed: 10.0,
            radius: 11.0,
            pickup_radius: 150.0,
            possession_offset: 60.0,
            wall_restitution: 0.6,
            kick_grace_ticks: 6,
        }
    }
}

/// Match rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Maximum distance between tackler and ball holder
    pub tackle_range: f32,
    /// Seconds before a player may tackle again
    pub tackle_cooldown_secs: f32,
    /// Seconds a tackled player stays stunned
    pub stun_secs: f32,
    /// Seconds between a goal and the next kickoff
    pub goal_delay_secs: f32,
    /// Ticks spent frozen in kickoff before play goes live
    pub kickoff_hold_ticks: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            tackle_range: 100.0,
            tackle_cooldown_secs: 1.0,
            stun_secs: 0.5,
            goal_delay_secs: 2.0,
            kickoff_hold_ticks: 1,
        }
    }
}

/// Command acceptance window and replication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// How many ticks behind the server a command may still target
    pub staleness_bound: u64,
    /// How many ticks ahead of the server a command may target
    pub max_lead: u64,
    /// Per-entity frames buffered for future ticks
    pub reorder_capacity: usize,
    /// Past ticks kept for building deltas against acknowledged baselines
    pub replay_buffer_ticks: usize,
    /// Largest accepted movement input length
    pub max_input_magnitude: f32,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            staleness_bound: 8,
            max_lead: 1,
            reorder_capacity: 16,
            replay_buffer_ticks: 64,
            max_input_magnitude: 1.5,
        }
    }
}

/// AI tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Distance to a loose ball under which a player starts chasing
    pub chase_threshold: f32,
    /// Chasing continues until the ball is `threshold * factor` away
    pub chase_release_factor: f32,
    /// Distance kept between a marker and the ball holder, goal side
    pub mark_distance: f32,
    /// How far ahead of a teammate holder a supporter runs
    pub support_offset: f32,
    /// Distance to the opponent goal from which a holder shoots
    pub shoot_range: f32,
    /// Furthest teammate a holder passes to
    pub pass_range: f32,
    /// How much closer to goal a teammate must be to receive a pass
    pub pass_gain: f32,
    /// Node expansions each AI player may spend per tick on pathing
    pub nav_budget: u32,
    /// Distance at which a target counts as reached
    pub arrival_tolerance: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            chase_threshold: 900.0,
            chase_release_factor: 1.25,
            mark_distance: 300.0,
            support_offset: 400.0,
            shoot_range: 1000.0,
            pass_range: 1200.0,
            pass_gain: 300.0,
            nav_budget: 256,
            arrival_tolerance: 50.0,
        }
    }
}

impl MatchConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`MatchConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }

        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be non-zero".into()));
        }
        if self.team_size == 0 {
            return Err(ConfigError::Invalid("team_size must be non-zero".into()));
        }
        positive("match_duration_secs", self.match_duration_secs)?;
        positive("field.length", self.field.length)?;
        positive("field.width", self.field.width)?;
        positive("field.goal_width", self.field.goal_width)?;
        if self.field.goal_width >= self.field.width {
            return Err(ConfigError::Invalid(
                "field.goal_width must be narrower than the pitch".into(),
            ));
        }
        positive("movement.walk_speed", self.movement.walk_speed)?;
        positive("movement.sprint_speed", self.movement.sprint_speed)?;
        positive("movement.acceleration", self.movement.acceleration)?;
        positive("movement.player_radius", self.movement.player_radius)?;
        positive("ball.shoot_speed", self.ball.shoot_speed)?;
        positive("ball.pass_speed", self.ball.pass_speed)?;
        positive("ball.radius", self.ball.radius)?;
        positive("ball.pickup_radius", self.ball.pickup_radius)?;
        if !(0.0..=1.0).contains(&self.ball.wall_restitution) {
            return Err(ConfigError::Invalid(
                "ball.wall_restitution must be within [0, 1]".into(),
            ));
        }
        positive("rules.tackle_range", self.rules.tackle_range)?;
        positive("net.max_input_magnitude", self.net.max_input_magnitude)?;
        if self.net.reorder_capacity == 0 {
            return Err(ConfigError::Invalid("net.reorder_capacity must be non-zero".into()));
        }
        if self.net.replay_buffer_ticks == 0 {
            return Err(ConfigError::Invalid(
                "net.replay_buffer_ticks must be non-zero".into(),
            ));
        }
        positive("ai.chase_threshold", self.ai.chase_threshold)?;
        positive("ai.pass_range", self.ai.pass_range)?;
        if self.ai.chase_release_factor < 1.0 {
            return Err(ConfigError::Invalid(
                "ai.chase_release_factor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Fixed timestep in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Converts a duration to whole ticks, rounding up, never below one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn secs_to_ticks(&self, secs: f32) -> u64 {
        let ticks = (f64::from(secs) * f64::from(self.tick_rate)).ceil();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks as u64
        } else {
            1
        }
    }

    /// Length of the match in live ticks.
    #[must_use]
    pub fn match_ticks(&self) -> u64 {
        self.secs_to_ticks(self.match_duration_secs)
    }

    /// Ticks spent in the goal celebration before the next kickoff.
    #[must_use]
    pub fn goal_delay_ticks(&self) -> u64 {
        self.secs_to_ticks(self.rules.goal_delay_secs)
    }

    /// Ticks a tackled player stays stunned.
    #[must_use]
    pub fn stun_ticks(&self) -> u32 {
        saturate_u32(self.secs_to_ticks(self.rules.stun_secs))
    }

    /// Ticks between two tackles by the same player.
    #[must_use]
    pub fn tackle_cooldown_ticks(&self) -> u32 {
        saturate_u32(self.secs_to_ticks(self.rules.tackle_cooldown_secs))
    }
}

fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn default_tick_conversions() {
        let config = MatchConfig::default();
        assert_eq!(config.match_ticks(), 5400);
        assert_eq!(config.goal_delay_ticks(), 60);
        assert_eq!(config.stun_ticks(), 15);
        assert_eq!(config.tackle_cooldown_ticks(), 30);
    }

    #[test]
    fn secs_to_ticks_rounds_up_and_floors_at_one() {
        let config = MatchConfig::default();
        assert_eq!(config.secs_to_ticks(0.01), 1);
        assert_eq!(config.secs_to_ticks(0.0), 1);
        assert_eq!(config.secs_to_ticks(0.05), 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MatchConfig::from_json_str(r#"{"net": {"staleness_bound": 4}}"#).unwrap();
        assert_eq!(config.net.staleness_bound, 4);
        assert_eq!(config.net.reorder_capacity, 16);
        assert_eq!(config.field, FieldConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = MatchConfig::from_json_str(r#"{"tick_rate": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MatchConfig::from_json_str(r#"{"ball": {"wall_restitution": 2.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MatchConfig::from_json_str(r#"{"field": {"goal_width": 9000.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MatchConfig::from_json_str(r#"{"ball": {"pass_speed": 0.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = MatchConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MatchConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn field_areas_nest() {
        let field = FieldConfig::default();
        let pitch = field.bounds();
        let play = field.play_area();
        let world = field.world_bounds();
        assert!(play.contains(pitch.max));
        assert!(world.contains(play.max));
        assert_eq!(field.half_length(), 2000.0);
    }
}
