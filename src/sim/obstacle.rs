//! Static obstacles and the preset layouts
//!
//! Preset coordinates are laid out for the default 1600x900 canvas.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::ball::Ball;
use super::collision::{
    CollisionResult, ball_circle_collision, ball_rect_collision, reflect_velocity,
};
use super::color::Color;
use crate::config::ObstaclePreset;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObstacleShape {
    /// Axis-aligned rectangle, `min` is the top-left corner
    Rectangle { min: Vec2, size: Vec2 },
    Circle { center: Vec2, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    pub shape: ObstacleShape,
    pub color: Color,
}

impl Obstacle {
    pub const fn rect(x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        Self {
            shape: ObstacleShape::Rectangle {
                min: Vec2::new(x, y),
                size: Vec2::new(width, height),
            },
            color,
        }
    }

    pub const fn circle(x: f32, y: f32, radius: f32, color: Color) -> Self {
        Self {
            shape: ObstacleShape::Circle {
                center: Vec2::new(x, y),
                radius,
            },
            color,
        }
    }

    /// Contact between a ball and this obstacle; normal points out of the obstacle
    pub fn contact(&self, pos: Vec2, radius: f32) -> CollisionResult {
        match self.shape {
            ObstacleShape::Rectangle { min, size } => {
                ball_rect_collision(pos, radius, min, min + size)
            }
            ObstacleShape::Circle { center, radius: r } => {
                ball_circle_collision(pos, radius, center, r)
            }
        }
    }
}

/// Clearance added when pushing a ball out, so rounding cannot leave it touching
pub const PUSH_SLOP: f32 = 1e-3;

const BLUE: Color = Color::rgba(100, 100, 220, 0.7);
const YELLOW: Color = Color::rgba(220, 220, 100, 0.7);
const RED: Color = Color::rgba(220, 100, 100, 0.7);
const GREEN: Color = Color::rgba(100, 220, 100, 0.7);
const LANE: Color = Color::rgba(180, 180, 220, 0.7);

const LIGHT: &[Obstacle] = &[
    Obstacle::rect(400.0, 200.0, 100.0, 30.0, BLUE),
    Obstacle::rect(800.0, 600.0, 100.0, 30.0, BLUE),
    Obstacle::circle(1200.0, 300.0, 40.0, RED),
];

const STANDARD: &[Obstacle] = &[
    Obstacle::rect(400.0, 200.0, 200.0, 40.0, BLUE),
    Obstacle::rect(1200.0, 600.0, 200.0, 40.0, BLUE),
    Obstacle::rect(800.0, 400.0, 40.0, 200.0, YELLOW),
    Obstacle::circle(250.0, 600.0, 60.0, RED),
    Obstacle::circle(1350.0, 200.0, 60.0, RED),
];

const HEAVY: &[Obstacle] = &[
    Obstacle::rect(400.0, 200.0, 300.0, 50.0, BLUE),
    Obstacle::rect(1200.0, 600.0, 300.0, 50.0, BLUE),
    Obstacle::rect(800.0, 400.0, 50.0, 300.0, YELLOW),
    Obstacle::rect(300.0, 500.0, 50.0, 200.0, YELLOW),
    Obstacle::rect(1300.0, 300.0, 50.0, 200.0, YELLOW),
    Obstacle::circle(250.0, 200.0, 70.0, RED),
    Obstacle::circle(1350.0, 200.0, 70.0, RED),
    Obstacle::circle(800.0, 700.0, 70.0, GREEN),
];

const MAZE: &[Obstacle] = &[
    // Vertical walls
    Obstacle::rect(400.0, 400.0, 30.0, 500.0, Color::rgba(242, 116, 116, 0.7)),
    Obstacle::rect(800.0, 400.0, 30.0, 500.0, Color::rgba(104, 220, 98, 0.7)),
    Obstacle::rect(1200.0, 400.0, 30.0, 500.0, Color::rgba(244, 207, 74, 0.7)),
    // Horizontal walls with gaps
    Obstacle::rect(200.0, 150.0, 300.0, 30.0, Color::rgba(14, 143, 93, 0.7)),
    Obstacle::rect(700.0, 150.0, 300.0, 30.0, Color::rgba(104, 1, 107, 0.86)),
    Obstacle::rect(1300.0, 150.0, 300.0, 30.0, Color::rgba(214, 18, 106, 0.7)),
    Obstacle::rect(200.0, 650.0, 300.0, 30.0, Color::rgba(4, 97, 236, 0.7)),
    Obstacle::rect(700.0, 650.0, 300.0, 30.0, Color::hex(0x4BA700)),
    Obstacle::rect(1300.0, 650.0, 300.0, 30.0, Color::rgba(150, 150, 150, 0.7)),
];

const PINBALL: &[Obstacle] = &[
    // Bumpers
    Obstacle::circle(400.0, 250.0, 30.0, Color::rgba(255, 50, 50, 0.8)),
    Obstacle::circle(1200.0, 250.0, 30.0, Color::rgba(50, 255, 50, 0.8)),
    Obstacle::circle(600.0, 400.0, 25.0, Color::rgba(50, 50, 255, 0.8)),
    Obstacle::circle(1000.0, 400.0, 25.0, Color::rgba(255, 255, 50, 0.8)),
    Obstacle::circle(400.0, 600.0, 30.0, Color::rgba(255, 50, 255, 0.8)),
    Obstacle::circle(1200.0, 600.0, 30.0, Color::rgba(50, 255, 255, 0.8)),
    Obstacle::circle(800.0, 300.0, 35.0, Color::rgba(255, 150, 50, 0.8)),
    Obstacle::circle(800.0, 550.0, 35.0, Color::rgba(150, 50, 255, 0.8)),
    // Lanes
    Obstacle::rect(300.0, 350.0, 20.0, 200.0, LANE),
    Obstacle::rect(1300.0, 350.0, 20.0, 200.0, LANE),
];

/// Obstacle layout for a concrete preset (`Random` yields no obstacles)
pub fn preset_layout(preset: ObstaclePreset) -> &'static [Obstacle] {
    match preset {
        ObstaclePreset::None | ObstaclePreset::Random => &[],
        ObstaclePreset::Light => LIGHT,
        ObstaclePreset::Standard => STANDARD,
        ObstaclePreset::Heavy => HEAVY,
        ObstaclePreset::Maze => MAZE,
        ObstaclePreset::Pinball => PINBALL,
    }
}

/// The obstacles of one round, fixed for its whole duration
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    preset: Option<ObstaclePreset>,
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self {
            preset: None,
            obstacles,
        }
    }

    /// Build the field for a preset, resolving `Random` to one of the non-empty presets
    pub fn from_preset<R: Rng + ?Sized>(preset: ObstaclePreset, rng: &mut R) -> Self {
        let resolved = match preset {
            ObstaclePreset::Random => {
                ObstaclePreset::CONCRETE[rng.random_range(0..ObstaclePreset::CONCRETE.len())]
            }
            other => other,
        };
        log::info!("Obstacle preset: {}", resolved.as_str());
        Self {
            preset: Some(resolved),
            obstacles: preset_layout(resolved).to_vec(),
        }
    }

    /// Preset this field was built from (never `Random`)
    pub fn preset(&self) -> Option<ObstaclePreset> {
        self.preset
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Whether a disc at `pos` overlaps any obstacle
    pub fn overlaps(&self, pos: Vec2, radius: f32) -> bool {
        self.obstacles.iter().any(|o| o.contact(pos, radius).hit)
    }

    /// First obstacle the ball overlaps, with its contact
    pub fn first_contact(&self, pos: Vec2, radius: f32) -> Option<CollisionResult> {
        self.obstacles
            .iter()
            .map(|o| o.contact(pos, radius))
            .find(|c| c.hit)
    }

    /// Bounce a ball off the first obstacle it overlaps
    ///
    /// Reflects the velocity, pushes the ball out along the contact normal and
    /// scales the velocity by `bounce_multiplier`. Returns true on contact.
    pub fn resolve(&self, ball: &mut Ball, bounce_multiplier: f32) -> bool {
        let Some(contact) = self.first_contact(ball.pos, ball.radius) else {
            return false;
        };
        ball.vel = reflect_velocity(ball.vel, contact.normal);
        ball.pos += contact.normal * contact.penetration;
        ball.vel *= bounce_multiplier;
        true
    }

    /// Positional-only push out of every overlapped obstacle, leaving [`PUSH_SLOP`] of clearance
    pub fn push_out(&self, ball: &mut Ball) {
        for obstacle in &self.obstacles {
            let contact = obstacle.contact(ball.pos, ball.radius);
            if contact.hit {
                ball.pos += contact.normal * (contact.penetration + PUSH_SLOP);
            }
        }
    }
}
