//! Ball entity and its controllers
//!
//! A ball is a single record; what differs between the player and the bots is
//! the [`Controller`] that picks a heading once per tick.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::color::Color;
use crate::config::GameConfig;
use crate::random_unit;

/// Stable ball identifier (index into the round's ball list)
pub type BallId = u32;

/// Minimum move speed multiplier a ball slows down to as it grows
const MIN_MOVE_SPEED: f32 = 1.0;
/// Radius growth that costs one unit of move speed
const SLOWDOWN_PER_RADIUS: f32 = 30.0;

/// Wander decision cooldown range in ticks
const WANDER_COOLDOWN_TICKS: std::ops::Range<u32> = 30..90;
/// Chance a bot picks a new heading when its decision cooldown expires
const WANDER_TURN_CHANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BallKind {
    Player,
    Bot,
}

/// Autonomous idle movement: hold heading, occasionally turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wander {
    /// Ticks until the next turn decision
    pub decision_ticks: u32,
}

impl Wander {
    /// Run one tick of the wander countdown; returns a new heading when turning
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Vec2> {
        if self.decision_ticks > 0 {
            self.decision_ticks -= 1;
        }
        if self.decision_ticks > 0 {
            return None;
        }

        let turn = rng.random_bool(WANDER_TURN_CHANCE).then(|| random_unit(rng));
        self.decision_ticks = rng.random_range(WANDER_COOLDOWN_TICKS);
        turn
    }
}

/// Direction keys currently held down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    /// Unit heading for the held keys, `None` when nothing (or only opposing keys) is held
    ///
    /// Screen coordinates: up is -y.
    pub fn heading(&self) -> Option<Vec2> {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        let dir = Vec2::new(axis(self.left, self.right), axis(self.up, self.down));
        dir.try_normalize()
    }
}

/// Player steering state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerControl {
    /// Point the player is steering toward
    pub target: Option<Vec2>,
    pub keys: HeldKeys,
    pub wander: Wander,
}

/// Per-tick steering behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Controller {
    Bot(Wander),
    Player(PlayerControl),
}

impl Controller {
    pub fn kind(&self) -> BallKind {
        match self {
            Controller::Bot(_) => BallKind::Bot,
            Controller::Player(_) => BallKind::Player,
        }
    }

    /// Pick this tick's heading; `None` keeps the current velocity
    ///
    /// Held keys win over the pointer target, which wins over wandering. A target
    /// is dropped once the ball centre comes within `reach` of it.
    pub fn steer<R: Rng + ?Sized>(&mut self, pos: Vec2, reach: f32, rng: &mut R) -> Option<Vec2> {
        match self {
            Controller::Bot(wander) => wander.step(rng),
            Controller::Player(control) => {
                if let Some(heading) = control.keys.heading() {
                    return Some(heading);
                }
                if let Some(target) = control.target {
                    let to_target = target - pos;
                    if to_target.length() < reach {
                        control.target = None;
                    } else {
                        return to_target.try_normalize();
                    }
                }
                control.wander.step(rng)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ball {
    pub id: BallId,
    pub name: String,
    pub pos: Vec2,
    /// Position at the start of the last tick, for render interpolation
    pub prev_pos: Vec2,
    /// Heading and speed in units per tick (before `move_speed`)
    pub vel: Vec2,
    pub radius: f32,
    /// Per-ball movement multiplier, shrinks as the ball grows
    pub move_speed: f32,
    pub color: Color,
    pub active: bool,
    pub can_absorb: bool,
    /// Seconds until `can_absorb` is restored
    pub absorb_cooldown: f32,
    pub score: u32,
    #[serde(skip)]
    pub controller: Controller,
}

impl Ball {
    fn new(id: BallId, name: String, pos: Vec2, radius: f32, color: Color, controller: Controller) -> Self {
        Self {
            id,
            name,
            pos,
            prev_pos: pos,
            vel: Vec2::ZERO,
            radius,
            move_speed: crate::consts::MOVE_SPEED,
            color,
            active: true,
            can_absorb: false,
            absorb_cooldown: 0.0,
            score: 0,
            controller,
        }
    }

    pub fn new_bot(id: BallId, name: String, pos: Vec2, radius: f32, color: Color) -> Self {
        Self::new(id, name, pos, radius, color, Controller::Bot(Wander::default()))
    }

    pub fn new_player(id: BallId, name: String, pos: Vec2, radius: f32, color: Color) -> Self {
        Self::new(
            id,
            name,
            pos,
            radius,
            color,
            Controller::Player(PlayerControl::default()),
        )
    }

    pub fn kind(&self) -> BallKind {
        self.controller.kind()
    }

    pub fn is_player(&self) -> bool {
        self.kind() == BallKind::Player
    }

    /// Player steering state, if this is the player
    pub fn player_control_mut(&mut self) -> Option<&mut PlayerControl> {
        match &mut self.controller {
            Controller::Player(control) => Some(control),
            Controller::Bot(_) => None,
        }
    }

    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }

    /// Strict disc overlap between two active balls
    pub fn collides_with(&self, other: &Ball) -> bool {
        self.active
            && other.active
            && super::collision::discs_overlap(self.pos, self.radius, other.pos, other.radius)
    }

    /// Position blended between the last two ticks
    pub fn interpolated_position(&self, alpha: f32) -> Vec2 {
        self.prev_pos.lerp(self.pos, alpha)
    }

    /// Absorb `loser`, conserving total area
    ///
    /// The loser's score (or 1 if it had none) is added, the loser is deactivated
    /// and this ball waits out the absorb cooldown before absorbing again.
    pub fn absorb(&mut self, loser: &mut Ball, rules: &GameConfig) {
        self.radius = self.radius.hypot(loser.radius);
        self.score += loser.score.max(1);
        self.can_absorb = false;
        self.absorb_cooldown = rules.absorb_cooldown;
        self.move_speed = (rules.move_speed
            - (self.radius - rules.initial_radius) / SLOWDOWN_PER_RADIUS)
            .max(MIN_MOVE_SPEED);

        loser.active = false;
        loser.vel = Vec2::ZERO;
    }

    /// Count down the absorb cooldown, re-enabling absorption when it expires
    ///
    /// A remainder below a thousandth of a step counts as expired, so a cooldown
    /// of `n * dt` seconds ends after exactly `n` steps despite f32 rounding.
    pub fn tick_cooldown(&mut self, dt: f32) {
        if self.absorb_cooldown > 0.0 {
            self.absorb_cooldown -= dt;
            if self.absorb_cooldown <= dt * 1e-3 {
                self.absorb_cooldown = 0.0;
                self.can_absorb = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn bot(id: BallId, radius: f32) -> Ball {
        Ball::new_bot(id, format!("Bot {id}"), Vec2::ZERO, radius, Color::WHITE)
    }

    #[test]
    fn test_absorb_conserves_area() {
        let mut winner = bot(0, 15.0);
        let mut loser = bot(1, 15.0);
        let before = winner.area() + loser.area();

        winner.absorb(&mut loser, &GameConfig::default());

        assert!((winner.radius - 21.213).abs() < 1e-3);
        assert!((winner.area() - before).abs() < 1e-2);
        assert!(!loser.active);
        assert_eq!(winner.score, 1);
        assert!(!winner.can_absorb);
        assert_eq!(winner.absorb_cooldown, 3.0);
    }

    #[test]
    fn test_absorb_transfers_score() {
        let mut winner = bot(0, 20.0);
        let mut loser = bot(1, 18.0);
        winner.score = 2;
        loser.score = 5;

        winner.absorb(&mut loser, &GameConfig::default());
        assert_eq!(winner.score, 7);
    }

    #[test]
    fn test_growth_slows_down() {
        let mut winner = bot(0, 40.0);
        let mut loser = bot(1, 40.0);
        winner.absorb(&mut loser, &GameConfig::default());
        assert!(winner.move_speed < crate::consts::MOVE_SPEED);
        assert!(winner.move_speed >= MIN_MOVE_SPEED);

        let mut huge = bot(2, 200.0);
        let mut other = bot(3, 100.0);
        huge.absorb(&mut other, &GameConfig::default());
        assert_eq!(huge.move_speed, MIN_MOVE_SPEED);
    }

    #[test]
    fn test_cooldown_restores_absorb() {
        let mut ball = bot(0, 15.0);
        ball.absorb_cooldown = 0.05;
        ball.tick_cooldown(1.0 / 60.0);
        assert!(!ball.can_absorb);
        ball.tick_cooldown(1.0 / 60.0);
        ball.tick_cooldown(1.0 / 60.0);
        ball.tick_cooldown(1.0 / 60.0);
        assert!(ball.can_absorb);
        assert_eq!(ball.absorb_cooldown, 0.0);
    }

    #[test]
    fn test_cooldown_expires_on_exact_step() {
        let dt = 1.0 / 60.0;
        let mut ball = bot(0, 15.0);
        ball.can_absorb = false;
        ball.absorb_cooldown = 3.0;

        for _ in 0..179 {
            ball.tick_cooldown(dt);
        }
        assert!(!ball.can_absorb, "expired early at {}", ball.absorb_cooldown);
        ball.tick_cooldown(dt);
        assert!(ball.can_absorb);
        assert_eq!(ball.absorb_cooldown, 0.0);
    }

    #[test]
    fn test_collides_with_skips_inactive() {
        let a = bot(0, 15.0);
        let mut b = bot(1, 15.0);
        b.pos = Vec2::new(20.0, 0.0);
        assert!(a.collides_with(&b));
        assert!(b.collides_with(&a));

        b.active = false;
        assert!(!a.collides_with(&b));
    }

    #[test]
    fn test_keys_override_target() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut controller = Controller::Player(PlayerControl {
            target: Some(Vec2::new(100.0, 0.0)),
            keys: HeldKeys {
                up: true,
                ..Default::default()
            },
            wander: Wander::default(),
        });

        let heading = controller.steer(Vec2::ZERO, 15.0, &mut rng);
        assert_eq!(heading, Some(Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn test_target_steering_and_clearing() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut controller = Controller::Player(PlayerControl {
            target: Some(Vec2::new(100.0, 0.0)),
            ..Default::default()
        });

        let heading = controller.steer(Vec2::ZERO, 15.0, &mut rng);
        assert_eq!(heading, Some(Vec2::X));

        controller.steer(Vec2::new(90.0, 0.0), 15.0, &mut rng);
        match controller {
            Controller::Player(control) => assert!(control.target.is_none()),
            Controller::Bot(_) => unreachable!(),
        }
    }

    #[test]
    fn test_diagonal_keys_are_unit() {
        let keys = HeldKeys {
            down: true,
            right: true,
            ..Default::default()
        };
        let heading = keys.heading().unwrap_or_default();
        assert!((heading.length() - 1.0).abs() < 1e-6);

        let opposed = HeldKeys {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(opposed.heading(), None);
    }

    #[test]
    fn test_wander_cooldown_range() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut wander = Wander::default();
        for _ in 0..1000 {
            wander.step(&mut rng);
            assert!(wander.decision_ticks < 90);
        }
    }
}
