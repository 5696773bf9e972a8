//! Collision detection and response primitives
//!
//! Shape queries return a [`CollisionResult`] whose normal points from the
//! surface toward the ball centre, so resolution is always
//! `pos += normal * penetration` followed by a reflection.

use glam::Vec2;

use super::ball::Ball;

/// Result of a collision check
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Closest surface point to the ball centre (if hit)
    pub point: Vec2,
    /// Surface normal at contact (pointing toward ball center, for reflection)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    pub fn hit(point: Vec2, normal: Vec2, penetration: f32) -> Self {
        Self {
            hit: true,
            point,
            normal,
            penetration,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Clamp each velocity component to `[-max, max]`, replacing NaN with zero
#[inline]
pub fn limit_velocity(velocity: Vec2, max: f32) -> Vec2 {
    let limit = |c: f32| if c.is_nan() { 0.0 } else { c.clamp(-max, max) };
    Vec2::new(limit(velocity.x), limit(velocity.y))
}

/// Two discs overlap (touching does not count)
#[inline]
pub fn discs_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a_pos.distance_squared(b_pos) < reach * reach
}

/// Disc against a solid circle
pub fn ball_circle_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    radius: f32,
) -> CollisionResult {
    let offset = ball_pos - center;
    let dist = offset.length();
    let reach = ball_radius + radius;
    if dist >= reach {
        return CollisionResult::miss();
    }
    // Concentric: no defined direction, push out along +x
    let normal = if dist > 0.0 { offset / dist } else { Vec2::X };
    CollisionResult::hit(center + normal * radius, normal, reach - dist)
}

/// Disc against a solid axis-aligned rectangle spanning `min..max`
///
/// A centre inside the rectangle is pushed out through the nearest face.
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, min: Vec2, max: Vec2) -> CollisionResult {
    let closest = ball_pos.clamp(min, max);
    let offset = ball_pos - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 0.0 {
        if dist_sq >= ball_radius * ball_radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        return CollisionResult::hit(closest, offset / dist, ball_radius - dist);
    }

    // Centre inside (or on the edge of) the rectangle
    let faces = [
        (ball_pos.x - min.x, Vec2::NEG_X),
        (max.x - ball_pos.x, Vec2::X),
        (ball_pos.y - min.y, Vec2::NEG_Y),
        (max.y - ball_pos.y, Vec2::Y),
    ];
    let mut nearest = faces[0];
    for face in &faces[1..] {
        if face.0 < nearest.0 {
            nearest = *face;
        }
    }
    let (depth, normal) = nearest;
    CollisionResult::hit(ball_pos + normal * depth, normal, depth + ball_radius)
}

/// Outcome of an elastic ball-ball contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElasticOutcome {
    /// Centres coincided; balls were nudged apart
    Nudged,
    /// Already moving apart; positions separated, velocities untouched
    Separating,
    /// Impulse applied
    Bounced,
}

/// Distance below which two centres are treated as coincident
const COINCIDENT_DISTANCE: f32 = 0.1;

/// Resolve an overlapping pair as an elastic contact
///
/// Overlap is split in proportion to the other ball's radius (the smaller ball
/// moves further), then the impulse `-(1 + e)·vn` is shared equally.
pub fn resolve_elastic(a: &mut Ball, b: &mut Ball, restitution: f32) -> ElasticOutcome {
    let delta = b.pos - a.pos;
    let dist = delta.length();

    if dist < COINCIDENT_DISTANCE {
        b.pos += Vec2::splat(COINCIDENT_DISTANCE);
        return ElasticOutcome::Nudged;
    }

    let normal = delta / dist;
    let overlap = a.radius + b.radius - dist;
    if overlap > 0.0 {
        let total = a.radius + b.radius;
        a.pos -= normal * overlap * (b.radius / total);
        b.pos += normal * overlap * (a.radius / total);
    }

    let normal_speed = (b.vel - a.vel).dot(normal);
    if normal_speed > 0.0 {
        return ElasticOutcome::Separating;
    }

    let impulse = -(1.0 + restitution) * normal_speed;
    a.vel -= normal * (impulse * 0.5);
    b.vel += normal * (impulse * 0.5);
    ElasticOutcome::Bounced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::Ball;
    use crate::sim::color::Color;

    fn ball_at(id: u32, pos: Vec2, radius: f32, vel: Vec2) -> Ball {
        let mut ball = Ball::new_bot(id, "Test Bot".into(), pos, radius, Color::WHITE);
        ball.vel = vel;
        ball
    }

    #[test]
    fn test_reflect_velocity() {
        // Ball moving right, hits vertical wall (normal pointing left)
        let velocity = Vec2::new(100.0, 0.0);
        let normal = Vec2::new(-1.0, 0.0);

        let reflected = reflect_velocity(velocity, normal);
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_limit_velocity() {
        let v = limit_velocity(Vec2::new(5.0, -5.0), 2.0);
        assert_eq!(v, Vec2::new(2.0, -2.0));

        let v = limit_velocity(Vec2::new(f32::NAN, 1.5), 2.0);
        assert_eq!(v, Vec2::new(0.0, 1.5));
    }

    #[test]
    fn test_discs_touching_do_not_overlap() {
        assert!(!discs_overlap(Vec2::ZERO, 10.0, Vec2::new(20.0, 0.0), 10.0));
        assert!(discs_overlap(Vec2::ZERO, 10.0, Vec2::new(19.9, 0.0), 10.0));
    }

    #[test]
    fn test_rect_collision_outside_face() {
        let result = ball_rect_collision(
            Vec2::new(95.0, 150.0),
            10.0,
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 200.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::NEG_X);
        assert!((result.penetration - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_rect_collision_centre_inside_uses_nearest_face() {
        let result = ball_rect_collision(
            Vec2::new(150.0, 195.0),
            10.0,
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 200.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::Y);
        assert!((result.penetration - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_rect_collision_miss() {
        let result = ball_rect_collision(
            Vec2::new(50.0, 50.0),
            10.0,
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 200.0),
        );
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_collision() {
        let result = ball_circle_collision(Vec2::new(0.0, 45.0), 10.0, Vec2::ZERO, 40.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::Y).length() < 1e-5);
        assert!((result.penetration - 5.0).abs() < 1e-5);

        assert!(!ball_circle_collision(Vec2::new(0.0, 60.0), 10.0, Vec2::ZERO, 40.0).hit);
    }

    #[test]
    fn test_elastic_head_on() {
        let mut a = ball_at(0, Vec2::new(0.0, 0.0), 15.0, Vec2::new(1.0, 0.0));
        let mut b = ball_at(1, Vec2::new(28.0, 0.0), 15.0, Vec2::new(-1.0, 0.0));

        let outcome = resolve_elastic(&mut a, &mut b, 0.85);
        assert_eq!(outcome, ElasticOutcome::Bounced);
        assert!(a.vel.x < 0.0);
        assert!(b.vel.x > 0.0);
        // Equal radii split the overlap evenly
        assert!((a.pos.distance(b.pos) - 30.0).abs() < 1e-4);
        // Equal mass treatment conserves momentum
        assert!((a.vel + b.vel).length() < 1e-5);
    }

    #[test]
    fn test_elastic_separating_keeps_velocity() {
        let mut a = ball_at(0, Vec2::new(0.0, 0.0), 15.0, Vec2::new(-1.0, 0.0));
        let mut b = ball_at(1, Vec2::new(28.0, 0.0), 15.0, Vec2::new(1.0, 0.0));

        let outcome = resolve_elastic(&mut a, &mut b, 0.85);
        assert_eq!(outcome, ElasticOutcome::Separating);
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
        assert_eq!(b.vel, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_elastic_coincident_nudge() {
        let mut a = ball_at(0, Vec2::new(10.0, 10.0), 15.0, Vec2::ZERO);
        let mut b = ball_at(1, Vec2::new(10.0, 10.0), 15.0, Vec2::ZERO);

        assert_eq!(resolve_elastic(&mut a, &mut b, 0.85), ElasticOutcome::Nudged);
        assert!(a.pos.distance(b.pos) > 0.0);
    }

    #[test]
    fn test_smaller_ball_moves_further() {
        let mut big = ball_at(0, Vec2::new(0.0, 0.0), 30.0, Vec2::ZERO);
        let mut small = ball_at(1, Vec2::new(35.0, 0.0), 10.0, Vec2::ZERO);

        resolve_elastic(&mut big, &mut small, 0.85);
        let big_shift = big.pos.length();
        let small_shift = small.pos.x - 35.0;
        assert!(small_shift > big_shift);
    }
}
