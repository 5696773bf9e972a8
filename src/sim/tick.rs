//! Fixed timestep simulation tick
//!
//! Advances a round deterministically. Steps run in a fixed order and ball
//! pairs resolve in index order, so a seed and an input sequence fully
//! determine the outcome.

use glam::Vec2;
use rand::Rng;

use super::arena::Arena;
use super::ball::{Ball, HeldKeys};
use super::collision::{ElasticOutcome, limit_velocity, resolve_elastic};
use super::obstacle::ObstacleField;
use super::state::{GameEvent, GameState, RoundPhase};
use crate::{is_finite_vec, random_unit};

/// Per-axis jitter added after a wall or obstacle bounce
const BOUNCE_JITTER: f32 = 0.1;
/// Post-bounce speed above which a bounce cue is emitted
const BOUNCE_CUE_SPEED: f32 = 1.0;
/// Push-out / push-in rounds before searching for free space
const CONFINE_PASSES: usize = 8;

/// Input polled at the start of a tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// New pointer target (click/tap), if one arrived since the last tick
    pub pointer_target: Option<Vec2>,
    /// Direction keys currently held
    pub keys: HeldKeys,
}

/// What happened to a colliding pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Not touching, or one side inactive
    Apart,
    Elastic(ElasticOutcome),
    /// Ball at index `winner` absorbed the ball at index `loser`
    Absorbed { winner: usize, loser: usize },
}

/// Cue intensity for a bounce of a ball of `radius`
pub fn bounce_intensity(radius: f32) -> f32 {
    (0.3 + radius / 100.0).min(1.0)
}

/// Particles emitted when a ball of `radius` is absorbed
pub fn merge_particle_count(radius: f32) -> usize {
    (radius * 2.0).floor().max(0.0) as usize
}

/// Advance the round by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if !matches!(state.phase, RoundPhase::Countdown | RoundPhase::Active) {
        return;
    }
    state.tick_count += 1;
    apply_input(state, input);
    let counting_down = state.phase == RoundPhase::Countdown;

    // 1. Interpolation snapshot
    for ball in state.balls.iter_mut().filter(|b| b.active) {
        ball.prev_pos = ball.pos;
    }

    // 2. Absorb cooldowns only run once absorption is live
    if !counting_down {
        for ball in state.balls.iter_mut().filter(|b| b.active) {
            ball.tick_cooldown(dt);
        }
    }

    // 3. Speed band, then steering
    steer(state);

    // 4. Integrate
    for ball in state.balls.iter_mut().filter(|b| b.active) {
        ball.pos += ball.vel * ball.move_speed;
    }

    // 5. Obstacles and arena walls
    bounce_off_walls(state);

    // 6. Ball-ball contacts, then re-confine anything pushed out
    resolve_pairs(state);
    confine(state);

    // 7. Numerical corruption
    recover_corrupted(state);

    // 8. Velocity cap
    let max = state.config.max_velocity;
    for ball in state.balls.iter_mut().filter(|b| b.active) {
        ball.vel = limit_velocity(ball.vel, max);
    }

    if state.phase == RoundPhase::Active {
        state.time_ticks += 1;
    }
    if state.check_round_over() {
        return;
    }
    if state.phase == RoundPhase::Countdown {
        state.countdown_ticks = state.countdown_ticks.saturating_sub(1);
        if state.countdown_ticks == 0 {
            state.enter_active();
        }
    }
}

/// Latest pointer target wins; keys are level state
fn apply_input(state: &mut GameState, input: &TickInput) {
    let Some(control) = state.player_mut().and_then(|b| b.player_control_mut()) else {
        return;
    };
    if let Some(target) = input.pointer_target {
        control.target = Some(target);
    }
    control.keys = input.keys;
}

/// Pull speed back into the `[min, base]` band and let each controller pick a heading
fn steer(state: &mut GameState) {
    let base = state.config.base_velocity;
    let min = state.config.min_velocity;
    let decay = state.config.velocity_decay;
    let rng = &mut state.rng;

    for ball in state.balls.iter_mut().filter(|b| b.active) {
        let speed = ball.vel.length();
        if speed > base {
            ball.vel *= decay;
        } else if speed < min {
            ball.vel = if speed > 0.0 {
                ball.vel * (base / speed)
            } else {
                random_unit(rng) * base
            };
        }

        let (pos, reach) = (ball.pos, ball.radius);
        if let Some(heading) = ball.controller.steer(pos, reach, rng) {
            ball.vel = heading;
        }
    }
}

/// Obstacles take priority: the arena boundary only responds when no obstacle was hit
fn bounce_off_walls(state: &mut GameState) {
    let bounce = state.config.bounce_multiplier;

    for ball in state.balls.iter_mut().filter(|b| b.active) {
        let bounced = state.obstacles.resolve(ball, bounce)
            || state.arena.resolve_boundary_collision(ball, bounce);
        if !bounced {
            continue;
        }

        ball.vel.x += (state.rng.random::<f32>() - 0.5) * BOUNCE_JITTER;
        ball.vel.y += (state.rng.random::<f32>() - 0.5) * BOUNCE_JITTER;
        if ball.vel.length() > BOUNCE_CUE_SPEED {
            state.events.push(GameEvent::Bounce {
                ball: ball.id,
                intensity: bounce_intensity(ball.radius),
            });
        }
    }
}

fn resolve_pairs(state: &mut GameState) {
    let count = state.balls.len();
    for i in 0..count {
        for j in (i + 1)..count {
            if !state.balls[i].active {
                break;
            }
            resolve_pair(state, i, j);
        }
    }
}

/// Mutable references to two distinct balls, `i < j`
fn pair_mut(balls: &mut [Ball], i: usize, j: usize) -> (&mut Ball, &mut Ball) {
    let (head, tail) = balls.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Resolve the contact between balls at indices `i < j`
///
/// During the countdown, or when neither ball may absorb, the contact is
/// elastic. Otherwise the strictly larger ball wins (a fair coin decides
/// ties); a winner still on cooldown bounces instead of absorbing. Indices
/// that are not an in-range `i < j` pair are reported as [`PairOutcome::Apart`].
pub fn resolve_pair(state: &mut GameState, i: usize, j: usize) -> PairOutcome {
    if i >= j || j >= state.balls.len() {
        return PairOutcome::Apart;
    }
    if !state.balls[i].collides_with(&state.balls[j]) {
        return PairOutcome::Apart;
    }

    let restitution = state.config.restitution;
    let (a, b) = pair_mut(&mut state.balls, i, j);

    let absorbing = state.phase == RoundPhase::Active && (a.can_absorb || b.can_absorb);
    if !absorbing {
        return PairOutcome::Elastic(resolve_elastic(a, b, restitution));
    }

    let a_wins = if a.radius > b.radius {
        true
    } else if b.radius > a.radius {
        false
    } else {
        state.rng.random_bool(0.5)
    };
    let (winner, loser, winner_index, loser_index) = if a_wins {
        (a, b, i, j)
    } else {
        (b, a, j, i)
    };
    if !winner.can_absorb {
        return PairOutcome::Elastic(resolve_elastic(winner, loser, restitution));
    }

    let (loser_pos, loser_radius, loser_color) = (loser.pos, loser.radius, loser.color);
    winner.absorb(loser, &state.config);
    log::debug!(
        "{} absorbed {} (radius {:.2}, score {})",
        winner.name,
        loser.name,
        winner.radius,
        winner.score
    );

    let (winner_id, loser_id) = (winner.id, loser.id);
    let loser_is_player = loser.is_player();

    state.events.push(GameEvent::Merge {
        winner: winner_id,
        loser: loser_id,
        pos: loser_pos,
    });
    state.events.push(GameEvent::ScoreChanged { ball: winner_id });
    state.particles.burst(
        &mut state.rng,
        loser_pos,
        loser_color,
        merge_particle_count(loser_radius),
    );

    if loser_is_player && !state.player_eliminated {
        state.player_eliminated = true;
        state.events.push(GameEvent::PlayerEliminated { ball: loser_id });
        log::info!("Player absorbed by ball {winner_id}");
    }

    PairOutcome::Absorbed {
        winner: winner_index,
        loser: loser_index,
    }
}

/// Positional-only pass: push balls out of obstacles and back inside the arena
///
/// A ball wedged between the wall and an obstacle (or between obstacles) is
/// moved to the nearest spot where it fits.
fn confine(state: &mut GameState) {
    for index in 0..state.balls.len() {
        let ball = &mut state.balls[index];
        if !ball.active || settle(&state.arena, &state.obstacles, ball) {
            continue;
        }

        let (id, origin, radius) = (ball.id, ball.pos, ball.radius);
        let pos = match state.arena.nearest_free_point(&state.obstacles, origin, radius) {
            Some(pos) => pos,
            None => {
                log::warn!("Ball {id} has no room near ({:.1}, {:.1})", origin.x, origin.y);
                state.arena.spawn_point(&state.obstacles, &mut state.rng, radius)
            }
        };
        log::debug!("Ball {id} unwedged to ({:.1}, {:.1})", pos.x, pos.y);
        state.balls[index].pos = pos;
    }
}

/// Alternate obstacle push-out and arena push-in; true once the ball is clear of both
fn settle(arena: &Arena, obstacles: &ObstacleField, ball: &mut Ball) -> bool {
    for _ in 0..CONFINE_PASSES {
        obstacles.push_out(ball);
        arena.push_inside(ball);
        if !obstacles.overlaps(ball.pos, ball.radius) {
            return true;
        }
    }
    false
}

/// Relocate any ball whose position went non-finite
fn recover_corrupted(state: &mut GameState) {
    for index in 0..state.balls.len() {
        let ball = &state.balls[index];
        if !ball.active || is_finite_vec(ball.pos) {
            continue;
        }
        let (id, radius) = (ball.id, ball.radius);
        let pos = state.arena.spawn_point(&state.obstacles, &mut state.rng, radius);
        let ball = &mut state.balls[index];
        log::warn!("Ball {id} had non-finite position {:?}; relocated", ball.pos);
        ball.pos = pos;
        ball.prev_pos = pos;
        ball.vel = Vec2::ZERO;
        state.events.push(GameEvent::Relocated { ball: id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::consts::TIME_STEP;
    use crate::sim::ball::{Controller, Wander};
    use crate::sim::color::Color;

    /// Active round with just the given balls
    fn arena_with(balls: Vec<Ball>) -> GameState {
        let mut state = GameState::empty(&GameConfig::default(), 12345);
        for ball in balls {
            state.add_ball(ball);
        }
        state.start_countdown();
        state.enter_active();
        state.drain_events();
        state
    }

    fn bot(id: u32, pos: Vec2, radius: f32) -> Ball {
        let mut ball = Ball::new_bot(id, format!("Bot {id}"), pos, radius, Color::WHITE);
        ball.vel = Vec2::new(1.5, 0.0);
        // Hold heading for the length of a test
        ball.controller = Controller::Bot(Wander {
            decision_ticks: 1000,
        });
        ball
    }

    #[test]
    fn test_preround_does_not_move() {
        let mut state = GameState::new(&GameConfig::default(), 1);
        let before: Vec<Vec2> = state.balls.iter().map(|b| b.pos).collect();
        tick(&mut state, &TickInput::default(), TIME_STEP);
        let after: Vec<Vec2> = state.balls.iter().map(|b| b.pos).collect();
        assert_eq!(before, after);
        assert_eq!(state.tick_count, 0);
    }

    #[test]
    fn test_countdown_runs_then_activates() {
        let mut state = GameState::new(&GameConfig::default(), 1);
        state.start_countdown();
        let countdown = state.countdown_ticks;

        for _ in 0..countdown - 1 {
            tick(&mut state, &TickInput::default(), TIME_STEP);
            assert_eq!(state.phase, RoundPhase::Countdown);
            assert!(state.balls.iter().all(|b| b.active && !b.can_absorb));
        }
        tick(&mut state, &TickInput::default(), TIME_STEP);
        assert_eq!(state.phase, RoundPhase::Active);
        assert!(state.balls.iter().all(|b| b.can_absorb));
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_equal_merge() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 15.0),
            bot(1, Vec2::new(420.0, 400.0), 15.0),
        ]);

        let outcome = resolve_pair(&mut state, 0, 1);
        let PairOutcome::Absorbed { winner, loser } = outcome else {
            panic!("expected absorption, got {outcome:?}");
        };
        let w = &state.balls[winner];
        assert!((w.radius - 21.213).abs() < 1e-3);
        assert_eq!(w.score, 1);
        assert!(!w.can_absorb);
        assert_eq!(w.absorb_cooldown, 3.0);
        assert!(!state.balls[loser].active);

        // 15 * 2 particles at the loser's position
        assert_eq!(state.particles.active_count(), 30);
        let events = state.drain_events();
        assert!(matches!(events[0], GameEvent::Merge { .. }));
        assert_eq!(
            events.iter().filter(|e| matches!(e, GameEvent::Merge { .. })).count(),
            1
        );
    }

    #[test]
    fn test_larger_ball_wins() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 15.0),
            bot(1, Vec2::new(425.0, 400.0), 20.0),
        ]);
        assert_eq!(
            resolve_pair(&mut state, 0, 1),
            PairOutcome::Absorbed { winner: 1, loser: 0 }
        );
    }

    #[test]
    fn test_cooldown_winner_bounces() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 30.0),
            bot(1, Vec2::new(440.0, 400.0), 15.0),
        ]);
        state.balls[0].can_absorb = false;
        state.balls[0].absorb_cooldown = 2.0;

        let outcome = resolve_pair(&mut state, 0, 1);
        assert!(matches!(outcome, PairOutcome::Elastic(_)));
        assert!(state.balls.iter().all(|b| b.active));
        assert_eq!(state.balls[1].radius, 15.0);
    }

    #[test]
    fn test_countdown_contacts_are_elastic() {
        let mut state = GameState::empty(&GameConfig::default(), 3);
        state.add_ball(bot(0, Vec2::new(400.0, 400.0), 30.0));
        state.add_ball(bot(1, Vec2::new(440.0, 400.0), 15.0));
        state.start_countdown();

        let outcome = resolve_pair(&mut state, 0, 1);
        assert!(matches!(outcome, PairOutcome::Elastic(_)));
        assert_eq!(state.active_count(), 2);
    }

    #[test]
    fn test_rectangle_wall_scenario() {
        // One unit past the wall inset
        let mut state = arena_with(vec![bot(0, Vec2::new(99.0, 400.0), 15.0)]);
        // A lone ball ends the round; keep a far-away partner alive
        state.add_ball(bot(1, Vec2::new(1200.0, 400.0), 15.0));
        state.balls[0].vel = Vec2::new(-1.0, 0.0);

        tick(&mut state, &TickInput::default(), TIME_STEP);
        let ball = &state.balls[0];
        assert_eq!(ball.pos.x, 115.0);
        assert!(ball.vel.x > 0.0);
    }

    #[test]
    fn test_wedged_ball_leaves_obstacle() {
        use crate::sim::obstacle::{Obstacle, ObstacleField};

        let mut state = arena_with(vec![
            bot(0, Vec2::new(200.0, 125.0), 30.0),
            bot(1, Vec2::new(1200.0, 500.0), 15.0),
        ]);
        // Bar 50 units below the top wall: too narrow for a radius-30 ball
        state.obstacles =
            ObstacleField::from_obstacles(vec![Obstacle::rect(100.0, 150.0, 200.0, 30.0, Color::WHITE)]);

        for _ in 0..5 {
            tick(&mut state, &TickInput::default(), TIME_STEP);
            let ball = &state.balls[0];
            assert!(!state.obstacles.overlaps(ball.pos, ball.radius), "stuck at {:?}", ball.pos);
            assert!(state.arena.contains_fully(ball.pos, ball.radius));
        }
    }

    #[test]
    fn test_resolve_pair_rejects_bad_indices() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 15.0),
            bot(1, Vec2::new(420.0, 400.0), 15.0),
        ]);
        assert_eq!(resolve_pair(&mut state, 1, 1), PairOutcome::Apart);
        assert_eq!(resolve_pair(&mut state, 1, 0), PairOutcome::Apart);
        assert_eq!(resolve_pair(&mut state, 0, 5), PairOutcome::Apart);
        assert_eq!(state.active_count(), 2);
    }

    #[test]
    fn test_bounce_event_intensity() {
        assert!((bounce_intensity(15.0) - 0.45).abs() < 1e-6);
        assert_eq!(bounce_intensity(90.0), 1.0);
        assert_eq!(merge_particle_count(21.9), 43);
    }

    #[test]
    fn test_round_over_after_last_merge() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 20.0),
            bot(1, Vec2::new(420.0, 400.0), 15.0),
        ]);
        tick(&mut state, &TickInput::default(), TIME_STEP);
        assert_eq!(state.phase, RoundPhase::RoundOver);
        assert_eq!(state.winner, Some(0));

        // Terminal: further ticks change nothing
        let pos = state.balls[0].pos;
        tick(&mut state, &TickInput::default(), TIME_STEP);
        assert_eq!(state.balls[0].pos, pos);
    }

    #[test]
    fn test_player_eliminated_once() {
        let mut state = GameState::empty(&GameConfig::default(), 5);
        state.add_ball(Ball::new_player(0, "Player".into(), Vec2::new(400.0, 400.0), 15.0, Color::WHITE));
        state.add_ball(bot(1, Vec2::new(420.0, 400.0), 25.0));
        state.add_ball(bot(2, Vec2::new(1000.0, 400.0), 15.0));
        state.start_countdown();
        state.enter_active();

        resolve_pair(&mut state, 0, 1);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PlayerEliminated { ball: 0 }));
        assert!(state.player_eliminated);
    }

    #[test]
    fn test_nan_position_relocated() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 15.0),
            bot(1, Vec2::new(1000.0, 400.0), 15.0),
        ]);
        state.balls[0].pos = Vec2::new(f32::NAN, 400.0);

        tick(&mut state, &TickInput::default(), TIME_STEP);
        let ball = &state.balls[0];
        assert!(is_finite_vec(ball.pos));
        assert!(state.arena.contains_fully(ball.pos, ball.radius));
        assert!(state.drain_events().contains(&GameEvent::Relocated { ball: 0 }));
    }

    #[test]
    fn test_velocity_clamped() {
        let mut state = arena_with(vec![
            bot(0, Vec2::new(400.0, 400.0), 15.0),
            bot(1, Vec2::new(1000.0, 400.0), 15.0),
        ]);
        state.balls[0].vel = Vec2::new(50.0, -50.0);

        tick(&mut state, &TickInput::default(), TIME_STEP);
        let v = state.balls[0].vel;
        assert!(v.x.abs() <= 2.0 && v.y.abs() <= 2.0);
    }

    #[test]
    fn test_player_follows_keys() {
        let mut state = GameState::empty(&GameConfig::default(), 5);
        state.add_ball(Ball::new_player(0, "Player".into(), Vec2::new(800.0, 400.0), 15.0, Color::WHITE));
        state.add_ball(bot(1, Vec2::new(200.0, 200.0), 15.0));
        state.start_countdown();

        let input = TickInput {
            keys: HeldKeys {
                right: true,
                ..Default::default()
            },
            ..Default::default()
        };
        tick(&mut state, &input, TIME_STEP);
        let player = &state.balls[0];
        assert!(player.pos.x > 800.0);
        assert_eq!(player.vel, Vec2::X);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let config = GameConfig::default();
        let mut state1 = GameState::new(&config, 99999);
        let mut state2 = GameState::new(&config, 99999);
        state1.start_countdown();
        state2.start_countdown();

        let inputs = [
            TickInput {
                pointer_target: Some(Vec2::new(300.0, 300.0)),
                ..Default::default()
            },
            TickInput::default(),
        ];

        for step in 0..600 {
            let input = &inputs[step % inputs.len()];
            tick(&mut state1, input, TIME_STEP);
            tick(&mut state2, input, TIME_STEP);
        }

        assert_eq!(state1.tick_count, state2.tick_count);
        assert_eq!(state1.active_count(), state2.active_count());
        for (a, b) in state1.balls.iter().zip(&state2.balls) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.radius, b.radius);
        }
    }
}
