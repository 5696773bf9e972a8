//! Round state and core simulation types
//!
//! Everything a tick reads or writes lives here, including the single seeded RNG.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::ball::{Ball, BallId};
use super::color::ColorPicker;
use super::obstacle::ObstacleField;
use super::particles::ParticlePool;
use crate::config::GameConfig;
use crate::random_unit;

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Balls placed, nothing moves yet
    PreRound,
    /// Balls move and bounce; every contact is elastic
    Countdown,
    /// Absorption enabled
    Active,
    /// One (or no) ball left; terminal
    RoundOver,
}

/// Something that happened during a tick, drained by the frame driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// Ball bounced off a wall or obstacle fast enough to be heard
    Bounce { ball: BallId, intensity: f32 },
    /// `winner` absorbed `loser` at `pos`
    Merge {
        winner: BallId,
        loser: BallId,
        pos: Vec2,
    },
    ScoreChanged { ball: BallId },
    /// The player was absorbed (emitted once per round)
    PlayerEliminated { ball: BallId },
    /// Countdown finished, absorption enabled
    RoundStarted,
    RoundOver { winner: Option<BallId> },
    /// A ball with corrupted coordinates was moved to a fresh spawn point
    Relocated { ball: BallId },
}

/// Complete round state (deterministic for a given config and seed)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Round seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub config: GameConfig,
    pub arena: Arena,
    pub obstacles: ObstacleField,
    /// All balls of the round, inactive ones included (sorted by id)
    pub balls: Vec<Ball>,
    /// Visual particles (not gameplay-affecting)
    pub particles: ParticlePool,
    pub phase: RoundPhase,
    /// Countdown ticks remaining
    pub countdown_ticks: u32,
    /// Ticks spent in the Active phase
    pub time_ticks: u64,
    /// Total ticks simulated
    pub tick_count: u64,
    pub player_id: Option<BallId>,
    pub winner: Option<BallId>,
    pub player_eliminated: bool,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Arena, obstacles and RNG for a round, with no balls yet
    pub fn empty(config: &GameConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let obstacles = ObstacleField::from_preset(config.obstacles, &mut rng);

        Self {
            seed,
            rng,
            config: config.clone(),
            arena: Arena::from_config(config),
            obstacles,
            balls: Vec::new(),
            particles: ParticlePool::new(config.particle_pool_size),
            phase: RoundPhase::PreRound,
            countdown_ticks: 0,
            time_ticks: 0,
            tick_count: 0,
            player_id: None,
            winner: None,
            player_eliminated: false,
            events: Vec::new(),
        }
    }

    /// Fresh round: the player plus `bot_count` bots on obstacle-free spawn points
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let mut state = Self::empty(config, seed);
        let mut colors = ColorPicker::new();
        let radius = config.initial_radius;

        let (color, _) = colors.pick(&mut state.rng);
        let pos = state.spawn_point(radius);
        let id = state.next_ball_id();
        state.add_ball(Ball::new_player(id, config.player_name.clone(), pos, radius, color));

        for _ in 0..config.bot_count {
            let (color, color_name) = colors.pick(&mut state.rng);
            let pos = state.spawn_point(radius);
            let id = state.next_ball_id();
            state.add_ball(Ball::new_bot(id, format!("{color_name} Bot"), pos, radius, color));
        }

        log::info!(
            "Round ready: seed={} balls={} arena={:?}",
            seed,
            state.balls.len(),
            state.arena.shape
        );
        state
    }

    pub fn next_ball_id(&self) -> BallId {
        self.balls.len() as BallId
    }

    /// Add a ball with a random starting heading
    pub fn add_ball(&mut self, mut ball: Ball) {
        ball.move_speed = self.config.move_speed;
        if ball.vel == Vec2::ZERO {
            ball.vel = random_unit(&mut self.rng);
        }
        if ball.is_player() {
            self.player_id = Some(ball.id);
        }
        self.balls.push(ball);
        self.normalize_order();
    }

    /// Obstacle-free point inside the arena for a ball of `radius`
    pub fn spawn_point(&mut self, radius: f32) -> Vec2 {
        self.arena.spawn_point(&self.obstacles, &mut self.rng, radius)
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn ball_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn player(&self) -> Option<&Ball> {
        self.player_id.and_then(|id| self.ball(id))
    }

    pub fn player_mut(&mut self) -> Option<&mut Ball> {
        let id = self.player_id?;
        self.ball_mut(id)
    }

    pub fn active_count(&self) -> usize {
        self.balls.iter().filter(|b| b.active).count()
    }

    pub fn active_balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.active)
    }

    /// PreRound -> Countdown; a zero-length countdown goes straight to Active
    pub fn start_countdown(&mut self) {
        if self.phase != RoundPhase::PreRound {
            return;
        }
        self.phase = RoundPhase::Countdown;
        self.countdown_ticks = self.config.countdown_ticks();
        log::info!("Countdown started ({} ticks)", self.countdown_ticks);
        if self.countdown_ticks == 0 {
            self.enter_active();
        }
    }

    /// Enable absorption on every ball at once
    pub fn enter_active(&mut self) {
        self.phase = RoundPhase::Active;
        for ball in &mut self.balls {
            ball.can_absorb = true;
            ball.absorb_cooldown = 0.0;
        }
        self.events.push(GameEvent::RoundStarted);
        log::info!("Round active: absorption enabled");
    }

    /// Enter RoundOver if at most one ball is left
    pub fn check_round_over(&mut self) -> bool {
        if !matches!(self.phase, RoundPhase::Countdown | RoundPhase::Active) {
            return false;
        }
        if self.active_count() > 1 {
            return false;
        }
        let winner = self.active_balls().next().map(|b| b.id);
        self.winner = winner;
        self.phase = RoundPhase::RoundOver;
        self.events.push(GameEvent::RoundOver {
            winner: self.winner,
        });
        match self.winner.and_then(|id| self.ball(id)) {
            Some(winner) => log::info!(
                "Round over: {} wins with score {} after {:.1}s",
                winner.name,
                winner.score,
                self.elapsed_secs()
            ),
            None => log::info!("Round over: no survivors"),
        }
        true
    }

    /// Seconds of Active play
    pub fn elapsed_secs(&self) -> f32 {
        self.time_ticks as f32 * self.config.time_step
    }

    /// Seconds left on the countdown (0 outside Countdown)
    pub fn countdown_secs_left(&self) -> f32 {
        match self.phase {
            RoundPhase::Countdown => self.countdown_ticks as f32 * self.config.time_step,
            _ => 0.0,
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ensure balls are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
    }
}
