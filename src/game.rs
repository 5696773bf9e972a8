//! Fixed-timestep frame driver
//!
//! The host calls [`Game::frame`] once per display frame with a timestamp. Wall
//! time is capped, accumulated and consumed in fixed simulation steps; the
//! remainder becomes the render interpolation factor. Tick events are turned
//! into collaborator calls here, so the simulation itself stays pure.

use glam::Vec2;

use crate::config::{ConfigError, GameConfig};
use crate::sim::{GameEvent, GameState, HeldKeys, RoundPhase, TickInput, tick};
use crate::sinks::{
    AudioSink, CollaboratorError, FrameView, NullSink, Renderer, ScoreSink, SoundCue,
};
use crate::standings::{RoundSummary, Standings};

/// Whether the host should schedule another frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    /// Round over; stop scheduling frames
    Stop,
}

/// Direction keys the player can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" => Some(Key::Up),
            "ArrowDown" => Some(Key::Down),
            "ArrowLeft" => Some(Key::Left),
            "ArrowRight" => Some(Key::Right),
            _ => None,
        }
    }
}

/// Input received between ticks; the latest value wins
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pending_target: Option<Vec2>,
    keys: HeldKeys,
}

impl InputState {
    pub fn pointer_target(&mut self, pos: Vec2) {
        self.pending_target = Some(pos);
    }

    pub fn key_state(&mut self, key: Key, pressed: bool) {
        match key {
            Key::Up => self.keys.up = pressed,
            Key::Down => self.keys.down = pressed,
            Key::Left => self.keys.left = pressed,
            Key::Right => self.keys.right = pressed,
        }
    }

    /// Snapshot for the next tick; a pointer target is delivered once
    pub fn poll(&mut self) -> TickInput {
        TickInput {
            pointer_target: self.pending_target.take(),
            keys: self.keys,
        }
    }
}

/// Wall-clock to fixed-step accumulator
#[derive(Debug, Clone)]
pub struct FrameClock {
    time_step: f32,
    max_frame_ms: f64,
    accumulator: f32,
    last_timestamp_ms: Option<f64>,
}

impl FrameClock {
    pub fn new(time_step: f32, max_frame_ms: f64) -> Self {
        Self {
            time_step,
            max_frame_ms,
            accumulator: 0.0,
            last_timestamp_ms: None,
        }
    }

    /// Seconds since the previous frame, capped to prevent spiral of death
    pub fn advance(&mut self, timestamp_ms: f64) -> f32 {
        let elapsed_ms = match self.last_timestamp_ms {
            Some(last) => (timestamp_ms - last).clamp(0.0, self.max_frame_ms),
            None => 0.0,
        };
        self.last_timestamp_ms = Some(timestamp_ms);
        (elapsed_ms / 1000.0) as f32
    }

    pub fn accumulate(&mut self, secs: f32) {
        self.accumulator += secs;
    }

    /// Consume one fixed step if enough time has accumulated
    pub fn take_step(&mut self) -> bool {
        if self.accumulator >= self.time_step {
            self.accumulator -= self.time_step;
            true
        } else {
            false
        }
    }

    /// Fraction of a step left in the accumulator
    pub fn interpolation(&self) -> f32 {
        (self.accumulator / self.time_step).clamp(0.0, 1.0)
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_timestamp_ms = None;
    }
}

fn report(what: &str, result: Result<(), CollaboratorError>) {
    if let Err(e) = result {
        log::warn!("{what}: {e}");
    }
}

/// One round plus the collaborators it reports to
pub struct Game {
    state: GameState,
    clock: FrameClock,
    input: InputState,
    renderer: Box<dyn Renderer>,
    audio: Box<dyn AudioSink>,
    scores: Box<dyn ScoreSink>,
}

impl Game {
    /// Validate `config` and set up a round; collaborators default to no-ops
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = FrameClock::new(config.time_step, config.max_frame_time_ms);
        Ok(Self {
            state: GameState::new(&config, seed),
            clock,
            input: InputState::default(),
            renderer: Box::new(NullSink),
            audio: Box::new(NullSink),
            scores: Box::new(NullSink),
        })
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_scores(mut self, scores: impl ScoreSink + 'static) -> Self {
        self.scores = Box::new(scores);
        self
    }

    /// Start the pre-round countdown
    pub fn start(&mut self) {
        self.clock.reset();
        self.state.start_countdown();
        self.dispatch_events();
    }

    /// Fresh round with the same configuration
    pub fn restart(&mut self, seed: u64) {
        self.state = GameState::new(&self.state.config, seed);
        self.clock.reset();
        self.input = InputState::default();
        log::info!("Round restarted with seed: {seed}");
    }

    pub fn pointer_target(&mut self, x: f32, y: f32) {
        self.input.pointer_target(Vec2::new(x, y));
    }

    pub fn key_state(&mut self, key: Key, pressed: bool) {
        self.input.key_state(key, pressed);
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }

    pub fn standings(&self) -> Standings {
        Standings::from_balls(&self.state.balls)
    }

    /// End-of-round text, once the round is over
    pub fn summary(&self) -> Option<RoundSummary> {
        (self.state.phase == RoundPhase::RoundOver).then(|| {
            let winner = self.state.winner.and_then(|id| self.state.ball(id));
            RoundSummary::new(winner, self.state.elapsed_secs())
        })
    }

    /// Run one display frame at `timestamp_ms`
    pub fn frame(&mut self, timestamp_ms: f64) -> FrameStatus {
        if self.state.phase == RoundPhase::RoundOver {
            return FrameStatus::Stop;
        }

        let elapsed = self.clock.advance(timestamp_ms);
        if self.state.phase != RoundPhase::PreRound {
            self.clock.accumulate(elapsed);
            let dt = self.clock.time_step();
            while self.clock.take_step() {
                let input = self.input.poll();
                tick(&mut self.state, &input, dt);
                self.dispatch_events();
                if self.state.phase == RoundPhase::RoundOver {
                    break;
                }
            }
        }

        self.state.particles.update(elapsed);
        self.render();

        if self.state.phase == RoundPhase::RoundOver {
            FrameStatus::Stop
        } else {
            FrameStatus::Continue
        }
    }

    fn render(&mut self) {
        let state = &self.state;
        let view = FrameView {
            balls: &state.balls,
            interpolation: self.clock.interpolation(),
            arena: &state.arena,
            obstacles: state.obstacles.obstacles(),
            particles: &state.particles,
            phase: state.phase,
            countdown_secs_left: state.countdown_secs_left(),
            elapsed_secs: state.elapsed_secs(),
        };
        report("Render", self.renderer.submit_frame(&view));
    }

    fn dispatch_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::Bounce { intensity, .. } => {
                    report("Audio", self.audio.play_cue(SoundCue::Bounce, intensity));
                }
                GameEvent::Merge { .. } => {
                    report("Audio", self.audio.play_cue(SoundCue::Merge, 1.0));
                }
                GameEvent::ScoreChanged { ball } => {
                    let standings = Standings::from_balls(&self.state.balls);
                    if let Some(ball) = self.state.ball(ball) {
                        report("Score", self.scores.on_score_changed(ball, &standings));
                    }
                }
                GameEvent::PlayerEliminated { ball } => {
                    report(
                        "Audio",
                        self.audio.play_cue(SoundCue::PlayerEliminated, 1.0),
                    );
                    if let Some(player) = self.state.ball(ball) {
                        report("Score", self.scores.on_player_eliminated(player));
                    }
                }
                GameEvent::RoundOver { winner } => {
                    report("Audio", self.audio.play_cue(SoundCue::RoundOver, 1.0));
                    let standings = Standings::from_balls(&self.state.balls);
                    let winner = winner.and_then(|id| self.state.ball(id));
                    let summary = RoundSummary::new(winner, self.state.elapsed_secs());
                    report(
                        "Score",
                        self.scores.on_round_over(winner, &summary, &standings),
                    );
                }
                GameEvent::RoundStarted | GameEvent::Relocated { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Ball;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[derive(Default)]
    struct Recorded {
        frames: usize,
        last_interpolation: f32,
        cues: Vec<SoundCue>,
        score_changes: usize,
        eliminations: usize,
        round_overs: Vec<Option<String>>,
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Recorded>>);

    impl Renderer for Recorder {
        fn submit_frame(&mut self, frame: &FrameView<'_>) -> Result<(), CollaboratorError> {
            let mut r = self.0.borrow_mut();
            r.frames += 1;
            r.last_interpolation = frame.interpolation;
            Ok(())
        }
    }

    impl AudioSink for Recorder {
        fn play_cue(&mut self, cue: SoundCue, _intensity: f32) -> Result<(), CollaboratorError> {
            self.0.borrow_mut().cues.push(cue);
            Ok(())
        }
    }

    impl ScoreSink for Recorder {
        fn on_score_changed(&mut self, _ball: &Ball, _standings: &Standings) -> Result<(), CollaboratorError> {
            self.0.borrow_mut().score_changes += 1;
            Ok(())
        }

        fn on_player_eliminated(&mut self, _player: &Ball) -> Result<(), CollaboratorError> {
            self.0.borrow_mut().eliminations += 1;
            Ok(())
        }

        fn on_round_over(
            &mut self,
            winner: Option<&Ball>,
            _summary: &RoundSummary,
            _standings: &Standings,
        ) -> Result<(), CollaboratorError> {
            self.0
                .borrow_mut()
                .round_overs
                .push(winner.map(|w| w.name.clone()));
            Ok(())
        }
    }

    struct BrokenRenderer;

    impl Renderer for BrokenRenderer {
        fn submit_frame(&mut self, _frame: &FrameView<'_>) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Render("context lost".into()))
        }
    }

    fn small_config() -> GameConfig {
        GameConfig {
            bot_count: 3,
            countdown_secs: 0.5,
            ..GameConfig::default()
        }
    }

    fn recorded_game(config: GameConfig, seed: u64) -> (Game, Recorder) {
        let recorder = Recorder::default();
        let game = Game::new(config, seed)
            .map(|g| {
                g.with_renderer(recorder.clone())
                    .with_audio(recorder.clone())
                    .with_scores(recorder.clone())
            })
            .unwrap_or_else(|e| panic!("config rejected: {e}"));
        (game, recorder)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            min_velocity: 3.0,
            ..GameConfig::default()
        };
        assert!(Game::new(config, 1).is_err());
    }

    #[test]
    fn test_no_ticks_before_start() {
        let (mut game, recorder) = recorded_game(small_config(), 1);
        game.frame(0.0);
        game.frame(FRAME_MS);
        assert_eq!(game.state().tick_count, 0);
        assert_eq!(recorder.0.borrow().frames, 2);
    }

    #[test]
    fn test_frame_time_is_capped() {
        let (mut game, _) = recorded_game(small_config(), 1);
        game.start();
        game.frame(0.0);
        game.frame(10_000.0);
        // 200 ms at 60 Hz, give or take float rounding on the last step
        let ticks = game.state().tick_count;
        assert!((11..=12).contains(&ticks), "ran {ticks} ticks");
    }

    #[test]
    fn test_interpolation_factor() {
        let (mut game, recorder) = recorded_game(small_config(), 1);
        game.start();
        game.frame(0.0);
        game.frame(FRAME_MS * 1.5);
        assert_eq!(game.state().tick_count, 1);
        let alpha = recorder.0.borrow().last_interpolation;
        assert!((alpha - 0.5).abs() < 0.01, "alpha = {alpha}");
    }

    #[test]
    fn test_renderer_failure_keeps_running() {
        let mut game = match Game::new(small_config(), 1) {
            Ok(g) => g.with_renderer(BrokenRenderer),
            Err(e) => panic!("{e}"),
        };
        game.start();
        let mut t = 0.0;
        for _ in 0..10 {
            assert_eq!(game.frame(t), FrameStatus::Continue);
            t += FRAME_MS;
        }
        assert!(game.state().tick_count >= 8);
    }

    #[test]
    fn test_pointer_target_reaches_player() {
        let (mut game, _) = recorded_game(small_config(), 1);
        game.start();
        game.frame(0.0);
        game.pointer_target(100.0, 100.0);
        game.frame(FRAME_MS);

        let target = game
            .state()
            .player()
            .and_then(|p| match p.controller {
                crate::sim::Controller::Player(control) => control.target,
                crate::sim::Controller::Bot(_) => None,
            });
        assert_eq!(target, Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_round_runs_to_completion() {
        let config = GameConfig {
            arena: crate::config::ArenaConfig::circle(),
            ..small_config()
        };
        let (mut game, recorder) = recorded_game(config, 2024);
        game.start();

        let mut t = 0.0;
        let mut status = FrameStatus::Continue;
        for _ in 0..50_000 {
            status = game.frame(t);
            if status == FrameStatus::Stop {
                break;
            }
            t += 200.0;
        }
        assert_eq!(status, FrameStatus::Stop);
        assert_eq!(game.phase(), RoundPhase::RoundOver);
        assert_eq!(game.state().active_count(), 1);

        let r = recorder.0.borrow();
        // 4 balls: three merges, one cue and score change each
        assert_eq!(r.cues.iter().filter(|c| **c == SoundCue::Merge).count(), 3);
        assert_eq!(r.score_changes, 3);
        assert_eq!(r.round_overs.len(), 1);
        assert!(r.eliminations <= 1);
        assert!(game.summary().is_some());

        // Terminal: nothing more is scheduled
        drop(r);
        let ticks = game.state().tick_count;
        assert_eq!(game.frame(t + 200.0), FrameStatus::Stop);
        assert_eq!(game.state().tick_count, ticks);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Key::from_key_name("ArrowLeft"), Some(Key::Left));
        assert_eq!(Key::from_key_name("a"), None);

        let mut input = InputState::default();
        input.key_state(Key::Up, true);
        input.pointer_target(Vec2::new(5.0, 5.0));
        let first = input.poll();
        assert!(first.keys.up);
        assert_eq!(first.pointer_target, Some(Vec2::new(5.0, 5.0)));
        // Target is delivered once, keys persist
        let second = input.poll();
        assert!(second.keys.up);
        assert_eq!(second.pointer_target, None);
    }
}
