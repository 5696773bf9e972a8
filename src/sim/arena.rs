//! Arena boundary geometry
//!
//! Rectangle arenas are inset from the canvas edge; circle and oval arenas are
//! ellipses centred on the canvas. Circles use the ellipse code with equal radii.

use glam::Vec2;
use rand::Rng;

use super::ball::Ball;
use super::collision::{CollisionResult, reflect_velocity};
use super::obstacle::ObstacleField;
use crate::config::{ArenaConfig, GameConfig};
use crate::unit_from_angle;

/// Extra clearance kept between a spawned ball and a curved boundary
const SPAWN_EDGE_BUFFER: f32 = 10.0;
/// Fraction of the usable radii spawn points are placed at
const SPAWN_RING_FACTOR: f32 = 0.8;
/// Random spawn attempts before falling back to a grid scan
pub const SPAWN_ATTEMPTS: usize = 50;
/// Grid spacing of the fallback spawn scan
const SPAWN_SCAN_STEP: f32 = 10.0;
/// Ring spacing and count of the free-space search around a stuck ball
const FREE_SEARCH_STEP: f32 = 5.0;
const FREE_SEARCH_RINGS: usize = 40;
const FREE_SEARCH_DIRECTIONS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaShape {
    /// Axis-aligned playable rectangle spanning `min..max`
    Rectangle { min: Vec2, max: Vec2 },
    /// Ellipse with the given half-axes
    Ellipse { center: Vec2, radii: Vec2 },
}

/// Playable region of a round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub shape: ArenaShape,
}

impl Arena {
    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        Self {
            shape: ArenaShape::Rectangle { min, max },
        }
    }

    pub fn ellipse(center: Vec2, radii: Vec2) -> Self {
        Self {
            shape: ArenaShape::Ellipse { center, radii },
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        let center = Vec2::new(config.width * 0.5, config.height * 0.5);
        match config.arena {
            ArenaConfig::Rectangle {
                boundary_offset,
                bottom_extra_offset,
            } => Self::rectangle(
                Vec2::splat(boundary_offset),
                Vec2::new(
                    config.width - boundary_offset,
                    config.height - boundary_offset - bottom_extra_offset,
                ),
            ),
            ArenaConfig::Circle { radius } => Self::ellipse(center, Vec2::splat(radius)),
            ArenaConfig::Oval { radius_x, radius_y } => {
                Self::ellipse(center, Vec2::new(radius_x, radius_y))
            }
        }
    }

    /// Axis-aligned bounding box of the playable region
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match self.shape {
            ArenaShape::Rectangle { min, max } => (min, max),
            ArenaShape::Ellipse { center, radii } => (center - radii, center + radii),
        }
    }

    /// Whether a disc of `radius` at `pos` lies entirely inside the arena
    pub fn contains_fully(&self, pos: Vec2, radius: f32) -> bool {
        match self.shape {
            ArenaShape::Rectangle { min, max } => {
                pos.x - radius >= min.x
                    && pos.x + radius <= max.x
                    && pos.y - radius >= min.y
                    && pos.y + radius <= max.y
            }
            ArenaShape::Ellipse { center, radii } => {
                if pos == center {
                    return radius <= radii.min_element();
                }
                !ellipse_contact(center, radii, pos, radius).hit
            }
        }
    }

    /// Keep a ball inside the arena, reflecting its velocity on contact
    ///
    /// Returns true if the ball touched the boundary.
    pub fn resolve_boundary_collision(&self, ball: &mut Ball, bounce_multiplier: f32) -> bool {
        match self.shape {
            ArenaShape::Rectangle { min, max } => {
                let mut bounced = false;
                if ball.pos.x - ball.radius < min.x {
                    ball.pos.x = min.x + ball.radius;
                    ball.vel.x *= -bounce_multiplier;
                    bounced = true;
                } else if ball.pos.x + ball.radius > max.x {
                    ball.pos.x = max.x - ball.radius;
                    ball.vel.x *= -bounce_multiplier;
                    bounced = true;
                }
                if ball.pos.y - ball.radius < min.y {
                    ball.pos.y = min.y + ball.radius;
                    ball.vel.y *= -bounce_multiplier;
                    bounced = true;
                } else if ball.pos.y + ball.radius > max.y {
                    ball.pos.y = max.y - ball.radius;
                    ball.vel.y *= -bounce_multiplier;
                    bounced = true;
                }
                bounced
            }
            ArenaShape::Ellipse { center, radii } => {
                let contact = ellipse_contact(center, radii, ball.pos, ball.radius);
                if !contact.hit {
                    return false;
                }
                ball.pos += contact.normal * contact.penetration;
                ball.vel = reflect_velocity(ball.vel, contact.normal) * bounce_multiplier;
                true
            }
        }
    }

    /// Positional-only containment, used after ball-ball separation
    pub fn push_inside(&self, ball: &mut Ball) {
        match self.shape {
            ArenaShape::Rectangle { min, max } => {
                ball.pos.x = clamp_span(ball.pos.x, min.x + ball.radius, max.x - ball.radius);
                ball.pos.y = clamp_span(ball.pos.y, min.y + ball.radius, max.y - ball.radius);
            }
            ArenaShape::Ellipse { center, radii } => {
                let contact = ellipse_contact(center, radii, ball.pos, ball.radius);
                if contact.hit {
                    ball.pos += contact.normal * contact.penetration;
                }
            }
        }
    }

    /// Candidate spawn point for a ball of `radius`, ignoring obstacles
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R, radius: f32) -> Vec2 {
        match self.shape {
            ArenaShape::Rectangle { min, max } => {
                let span = (max - min - Vec2::splat(radius * 2.0)).max(Vec2::ZERO);
                Vec2::new(
                    min.x + radius + rng.random::<f32>() * span.x,
                    min.y + radius + rng.random::<f32>() * span.y,
                )
            }
            ArenaShape::Ellipse { center, radii } => {
                let usable = (radii - Vec2::splat(radius + SPAWN_EDGE_BUFFER)).max(Vec2::ZERO);
                let angle = rng.random::<f32>() * std::f32::consts::TAU;
                center + usable * SPAWN_RING_FACTOR * unit_from_angle(angle)
            }
        }
    }

    /// Spawn point inside the arena that avoids every obstacle
    ///
    /// Tries [`SPAWN_ATTEMPTS`] random candidates, then scans a grid over the
    /// arena. If nothing fits, the last random candidate is returned.
    pub fn spawn_point<R: Rng + ?Sized>(
        &self,
        obstacles: &ObstacleField,
        rng: &mut R,
        radius: f32,
    ) -> Vec2 {
        let mut candidate = self.random_point(rng, radius);
        for _ in 0..SPAWN_ATTEMPTS {
            if self.contains_fully(candidate, radius) && !obstacles.overlaps(candidate, radius) {
                return candidate;
            }
            candidate = self.random_point(rng, radius);
        }

        if let Some(pos) = self.scan_for_free_point(obstacles, radius) {
            log::debug!("Spawn fell back to grid scan at ({:.1}, {:.1})", pos.x, pos.y);
            return pos;
        }

        log::warn!("No obstacle-free spawn point for radius {radius}; spawning unchecked");
        candidate
    }

    /// Closest point to `origin` (on rings of growing radius) where a ball fits
    /// inside the arena without touching an obstacle
    pub fn nearest_free_point(
        &self,
        obstacles: &ObstacleField,
        origin: Vec2,
        radius: f32,
    ) -> Option<Vec2> {
        for ring in 1..=FREE_SEARCH_RINGS {
            let dist = ring as f32 * FREE_SEARCH_STEP;
            for k in 0..FREE_SEARCH_DIRECTIONS {
                let angle = k as f32 / FREE_SEARCH_DIRECTIONS as f32 * std::f32::consts::TAU;
                let pos = origin + unit_from_angle(angle) * dist;
                if self.contains_fully(pos, radius) && !obstacles.overlaps(pos, radius) {
                    return Some(pos);
                }
            }
        }
        None
    }

    fn scan_for_free_point(&self, obstacles: &ObstacleField, radius: f32) -> Option<Vec2> {
        let (min, max) = self.bounds();
        let mut y = min.y + radius;
        while y <= max.y - radius {
            let mut x = min.x + radius;
            while x <= max.x - radius {
                let pos = Vec2::new(x, y);
                if self.contains_fully(pos, radius) && !obstacles.overlaps(pos, radius) {
                    return Some(pos);
                }
                x += SPAWN_SCAN_STEP;
            }
            y += SPAWN_SCAN_STEP;
        }
        None
    }
}

/// Clamp into `[lo, hi]`, centring when the span is narrower than the ball
fn clamp_span(value: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        (lo + hi) * 0.5
    } else {
        value.clamp(lo, hi)
    }
}

/// Radial contact test against the inside of an ellipse
///
/// The boundary distance `L` is measured along the ray from the centre through
/// the ball; the ball is outside when `|d| + r > L`. The returned normal points
/// back toward the centre.
fn ellipse_contact(center: Vec2, radii: Vec2, pos: Vec2, radius: f32) -> CollisionResult {
    let offset = pos - center;
    let scaled_dist = (offset / radii).length();

    if scaled_dist <= 0.0 {
        // No direction to push along from the centre
        return CollisionResult::miss();
    }

    let dist = offset.length();
    let outward = offset / dist;
    // Distance from centre to the boundary along this ray
    let boundary = dist / scaled_dist;
    let effective_radius = radius / boundary;

    if scaled_dist + effective_radius > 1.0 {
        let penetration = (scaled_dist + effective_radius - 1.0) * boundary;
        return CollisionResult::hit(center + outward * boundary, -outward, penetration);
    }

    CollisionResult::miss()
}
