//! Fixed-size particle pool for absorption bursts
//!
//! Particles are purely visual: the pool never grows, spawns past capacity are
//! dropped, and expired particles go back on the free list.

use glam::Vec2;
use rand::Rng;

use super::color::Color;
use crate::random_unit;

/// Per-frame speed decay
const SPEED_DECAY: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub size: f32,
    pub color: Color,
    /// Remaining lifetime (seconds)
    pub life: f32,
    pub max_life: f32,
    pub active: bool,
}

impl Particle {
    const DEAD: Particle = Particle {
        pos: Vec2::ZERO,
        dir: Vec2::ZERO,
        speed: 0.0,
        size: 0.0,
        color: Color::WHITE,
        life: 0.0,
        max_life: 0.0,
        active: false,
    };

    /// Remaining life as a fraction, for fading
    pub fn alpha(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticlePool {
    slots: Vec<Particle>,
    /// Indices of inactive slots
    free: Vec<usize>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Particle::DEAD; capacity],
            // Reversed so slot 0 is handed out first
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().filter(|p| p.active)
    }

    /// Claim a free slot; returns false when the pool is exhausted
    pub fn spawn(&mut self, particle: Particle) -> bool {
        let Some(index) = self.free.pop() else {
            return false;
        };
        self.slots[index] = Particle {
            active: true,
            ..particle
        };
        true
    }

    /// Emit `count` particles radiating from `pos`; returns how many fit in the pool
    pub fn burst<R: Rng + ?Sized>(&mut self, rng: &mut R, pos: Vec2, color: Color, count: usize) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            let life = rng.random_range(0.5..1.0);
            let particle = Particle {
                pos,
                dir: random_unit(rng),
                speed: rng.random_range(2.0..4.0),
                size: rng.random_range(2.0..4.0),
                color,
                life,
                max_life: life,
                active: true,
            };
            if !self.spawn(particle) {
                log::debug!("Particle pool exhausted, dropped {} particles", count - spawned);
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Advance every live particle by one frame of `dt` seconds
    pub fn update(&mut self, dt: f32) {
        for (index, particle) in self.slots.iter_mut().enumerate() {
            if !particle.active {
                continue;
            }
            particle.life -= dt;
            if particle.life <= 0.0 {
                particle.active = false;
                self.free.push(index);
                continue;
            }
            particle.pos += particle.dir * particle.speed;
            particle.speed *= SPEED_DECAY;
        }
    }

    pub fn clear(&mut self) {
        let capacity = self.slots.len();
        self.slots.fill(Particle::DEAD);
        self.free = (0..capacity).rev().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_burst_respects_capacity() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut pool = ParticlePool::new(10);

        assert_eq!(pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 6), 6);
        assert_eq!(pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 6), 4);
        assert_eq!(pool.active_count(), 10);
        assert_eq!(pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 1), 0);
    }

    #[test]
    fn test_expired_particles_are_recycled() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut pool = ParticlePool::new(4);
        pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 4);

        // Lifetimes are under one second
        pool.update(1.0);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 4), 4);
    }

    #[test]
    fn test_particles_move_and_slow() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(Particle {
            pos: Vec2::ZERO,
            dir: Vec2::X,
            speed: 3.0,
            size: 2.0,
            color: Color::WHITE,
            life: 1.0,
            max_life: 1.0,
            active: true,
        });

        pool.update(0.1);
        let p = pool.iter_active().next().copied().unwrap_or(Particle::DEAD);
        assert!(p.active);
        assert_eq!(p.pos, Vec2::new(3.0, 0.0));
        assert!((p.speed - 2.97).abs() < 1e-6);
        assert!((p.alpha() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_clear() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut pool = ParticlePool::new(8);
        pool.burst(&mut rng, Vec2::ZERO, Color::WHITE, 8);
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.capacity(), 8);
    }
}
