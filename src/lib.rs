//! Blob Arena - a blob absorption arena game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, physics, absorption, round state)
//! - `game`: Fixed-timestep frame driver that feeds the simulation and its collaborators
//! - `sinks`: Renderer / audio / score collaborator interfaces
//! - `config`: Data-driven round configuration
//! - `standings`: Leaderboard ranking and round summaries

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod config;
pub mod game;
pub mod sim;
pub mod sinks;
pub mod standings;

pub use config::{ConfigError, GameConfig};
pub use game::{FrameStatus, Game};
pub use standings::Standings;

use glam::Vec2;
use rand::Rng;

/// Game configuration defaults
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const TIME_STEP: f32 = 1.0 / 60.0;
    /// Longest wall-clock frame fed into the accumulator, to prevent spiral of death
    pub const MAX_FRAME_TIME_MS: f64 = 200.0;

    /// Canvas dimensions the arena presets are laid out for
    pub const CANVAS_WIDTH: f32 = 1600.0;
    pub const CANVAS_HEIGHT: f32 = 900.0;
    /// Rectangle arena inset from the canvas edge
    pub const BOUNDARY_OFFSET: f32 = 100.0;
    /// Additional inset of the rectangle arena's bottom edge
    pub const BOTTOM_EXTRA_OFFSET: f32 = 50.0;
    pub const CIRCLE_RADIUS: f32 = 375.0;
    pub const OVAL_RADIUS_X: f32 = 600.0;
    pub const OVAL_RADIUS_Y: f32 = 375.0;

    /// Ball defaults
    pub const INITIAL_RADIUS: f32 = 15.0;
    pub const BOT_COUNT: usize = 19;
    /// Base movement multiplier (position += velocity * move_speed each tick)
    pub const MOVE_SPEED: f32 = 2.0;
    /// Seconds a ball must wait after absorbing before it can absorb again
    pub const ABSORB_COOLDOWN: f32 = 3.0;
    pub const COUNTDOWN_SECS: f32 = 3.0;

    /// Velocity band (units per tick, before the move speed multiplier)
    pub const BASE_VELOCITY: f32 = 1.5;
    pub const MIN_VELOCITY: f32 = 1.0;
    pub const MAX_VELOCITY: f32 = 2.0;
    /// Per-tick decay applied while faster than the base velocity
    pub const VELOCITY_DECAY: f32 = 0.97;
    /// Speed gain on wall/obstacle contact
    pub const BOUNCE_MULTIPLIER: f32 = 1.05;
    /// Restitution of ball-ball elastic contacts
    pub const RESTITUTION: f32 = 0.85;

    /// Visual particle pool size
    pub const PARTICLE_POOL_SIZE: usize = 500;
}

/// Unit vector pointing along `theta` (radians)
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Uniformly random unit direction
#[inline]
pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    unit_from_angle(rng.random::<f32>() * std::f32::consts::TAU)
}

/// Both components finite (no NaN / infinity)
#[inline]
pub fn is_finite_vec(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}
