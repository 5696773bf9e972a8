//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by ball ID)
//! - No rendering, audio or platform dependencies (those consume [`GameEvent`]s)

pub mod arena;
pub mod ball;
pub mod collision;
pub mod color;
pub mod obstacle;
pub mod particles;
pub mod state;
pub mod tick;

pub use arena::{Arena, ArenaShape};
pub use ball::{Ball, BallId, BallKind, Controller, HeldKeys, PlayerControl, Wander};
pub use collision::{CollisionResult, ElasticOutcome, reflect_velocity};
pub use color::{Color, ColorPicker, PALETTE};
pub use obstacle::{Obstacle, ObstacleField, ObstacleShape};
pub use particles::{Particle, ParticlePool};
pub use state::{GameEvent, GameState, RoundPhase};
pub use tick::{PairOutcome, TickInput, resolve_pair, tick};
