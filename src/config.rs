//! Round configuration
//!
//! Every value here is a load-time constant for a round. On the web the last used
//! configuration is kept in LocalStorage; natively it can be read from a JSON file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Longest accepted player name
pub const MAX_PLAYER_NAME_LEN: usize = 12;
/// Name used when the player leaves the field empty
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("arena too small for balls of radius {radius}")]
    ArenaTooSmall { radius: f32 },
    #[error("player name `{0}` must contain only letters")]
    InvalidPlayerName(String),
    #[error("malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Arena shape and its dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ArenaConfig {
    /// Canvas inset by `boundary_offset` on every side, plus `bottom_extra_offset` at the bottom
    Rectangle {
        boundary_offset: f32,
        bottom_extra_offset: f32,
    },
    /// Circle centred on the canvas
    Circle { radius: f32 },
    /// Axis-aligned ellipse centred on the canvas
    Oval { radius_x: f32, radius_y: f32 },
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig::Rectangle {
            boundary_offset: BOUNDARY_OFFSET,
            bottom_extra_offset: BOTTOM_EXTRA_OFFSET,
        }
    }
}

impl ArenaConfig {
    pub fn circle() -> Self {
        ArenaConfig::Circle {
            radius: CIRCLE_RADIUS,
        }
    }

    pub fn oval() -> Self {
        ArenaConfig::Oval {
            radius_x: OVAL_RADIUS_X,
            radius_y: OVAL_RADIUS_Y,
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rectangle" | "rect" => Some(ArenaConfig::default()),
            "circle" => Some(ArenaConfig::circle()),
            "oval" | "ellipse" => Some(ArenaConfig::oval()),
            _ => None,
        }
    }
}

/// Named obstacle layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstaclePreset {
    #[default]
    None,
    Light,
    Standard,
    Heavy,
    Maze,
    Pinball,
    /// One of the non-empty presets, chosen with the round's RNG
    Random,
}

impl ObstaclePreset {
    /// Presets `Random` picks from
    pub const CONCRETE: [ObstaclePreset; 5] = [
        ObstaclePreset::Light,
        ObstaclePreset::Standard,
        ObstaclePreset::Heavy,
        ObstaclePreset::Maze,
        ObstaclePreset::Pinball,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObstaclePreset::None => "none",
            ObstaclePreset::Light => "light",
            ObstaclePreset::Standard => "standard",
            ObstaclePreset::Heavy => "heavy",
            ObstaclePreset::Maze => "maze",
            ObstaclePreset::Pinball => "pinball",
            ObstaclePreset::Random => "random",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(ObstaclePreset::None),
            "light" => Some(ObstaclePreset::Light),
            "standard" => Some(ObstaclePreset::Standard),
            "heavy" => Some(ObstaclePreset::Heavy),
            "maze" => Some(ObstaclePreset::Maze),
            "pinball" => Some(ObstaclePreset::Pinball),
            "random" => Some(ObstaclePreset::Random),
            _ => None,
        }
    }
}

/// Complete round configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Canvas size the arena is centred in
    pub width: f32,
    pub height: f32,
    pub arena: ArenaConfig,
    pub obstacles: ObstaclePreset,

    // === Population ===
    pub player_name: String,
    pub bot_count: usize,
    pub initial_radius: f32,

    // === Timing ===
    /// Fixed simulation step (seconds)
    pub time_step: f32,
    /// Cap on wall-clock time fed to the accumulator per frame (milliseconds)
    pub max_frame_time_ms: f64,
    pub countdown_secs: f32,
    pub absorb_cooldown: f32,

    // === Motion ===
    pub move_speed: f32,
    pub base_velocity: f32,
    pub min_velocity: f32,
    pub max_velocity: f32,
    pub velocity_decay: f32,
    pub bounce_multiplier: f32,
    pub restitution: f32,

    // === Effects ===
    pub particle_pool_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            arena: ArenaConfig::default(),
            obstacles: ObstaclePreset::None,

            player_name: DEFAULT_PLAYER_NAME.to_string(),
            bot_count: BOT_COUNT,
            initial_radius: INITIAL_RADIUS,

            time_step: TIME_STEP,
            max_frame_time_ms: MAX_FRAME_TIME_MS,
            countdown_secs: COUNTDOWN_SECS,
            absorb_cooldown: ABSORB_COOLDOWN,

            move_speed: MOVE_SPEED,
            base_velocity: BASE_VELOCITY,
            min_velocity: MIN_VELOCITY,
            max_velocity: MAX_VELOCITY,
            velocity_decay: VELOCITY_DECAY,
            bounce_multiplier: BOUNCE_MULTIPLIER,
            restitution: RESTITUTION,

            particle_pool_size: PARTICLE_POOL_SIZE,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl GameConfig {
    /// Parse and validate a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: GameConfig = serde_json::from_str(json)?;
        config.player_name = normalize_player_name(&config.player_name)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of fixed ticks the pre-round countdown lasts
    pub fn countdown_ticks(&self) -> u32 {
        (self.countdown_secs / self.time_step).round() as u32
    }

    /// Total number of balls in a round (player included)
    pub fn population(&self) -> usize {
        self.bot_count + 1
    }

    /// Check value ranges and that the arena can hold a ball
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(invalid("width/height", "canvas must have a positive size"));
        }
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(invalid("time_step", "must be a positive number of seconds"));
        }
        if self.max_frame_time_ms < f64::from(self.time_step) * 1000.0 {
            return Err(invalid(
                "max_frame_time_ms",
                "must be at least one time step long",
            ));
        }
        if !(self.initial_radius > 0.0) {
            return Err(invalid("initial_radius", "must be positive"));
        }
        if self.absorb_cooldown < 0.0 || self.countdown_secs < 0.0 {
            return Err(invalid("absorb_cooldown/countdown_secs", "must not be negative"));
        }
        if !(self.move_speed > 0.0) {
            return Err(invalid("move_speed", "must be positive"));
        }
        if !(self.min_velocity > 0.0
            && self.min_velocity <= self.base_velocity
            && self.base_velocity <= self.max_velocity)
        {
            return Err(invalid(
                "velocity",
                format!(
                    "expected 0 < min ({}) <= base ({}) <= max ({})",
                    self.min_velocity, self.base_velocity, self.max_velocity
                ),
            ));
        }
        if !(self.velocity_decay > 0.0 && self.velocity_decay <= 1.0) {
            return Err(invalid("velocity_decay", "must be in (0, 1]"));
        }
        if !(self.bounce_multiplier > 0.0) {
            return Err(invalid("bounce_multiplier", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(invalid("restitution", "must be in [0, 1]"));
        }

        // Spawning keeps a 10 unit buffer from curved walls
        let r = self.initial_radius;
        let fits = match self.arena {
            ArenaConfig::Rectangle {
                boundary_offset,
                bottom_extra_offset,
            } => {
                let inner_w = self.width - 2.0 * boundary_offset;
                let inner_h = self.height - 2.0 * boundary_offset - bottom_extra_offset;
                boundary_offset >= 0.0 && inner_w > 2.0 * r && inner_h > 2.0 * r
            }
            ArenaConfig::Circle { radius } => radius > r + 10.0,
            ArenaConfig::Oval { radius_x, radius_y } => {
                radius_x > r + 10.0 && radius_y > r + 10.0
            }
        };
        if !fits {
            return Err(ConfigError::ArenaTooSmall { radius: r });
        }
        Ok(())
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "blob_arena_config";

    /// Load the last used configuration from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored config: {e}"),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save configuration to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
        }
    }

    /// Read a configuration file (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Trim and check a player name: letters only, at most 12 of them, empty means "Player"
pub fn normalize_player_name(raw: &str) -> Result<String, ConfigError> {
    let name = raw.trim();
    if name.is_empty() {
        return Ok(DEFAULT_PLAYER_NAME.to_string());
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidPlayerName(name.to_string()));
    }
    Ok(name.chars().take(MAX_PLAYER_NAME_LEN).collect())
}
