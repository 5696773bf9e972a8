//! Blob Arena entry point
//!
//! On the web this wires the canvas, DOM and input to a [`Game`] and drives it from
//! `requestAnimationFrame`. Natively it runs one seeded round headless and prints the
//! final standings.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlInputElement, KeyboardEvent,
        MouseEvent, TouchEvent,
    };

    use blob_arena::audio::AudioManager;
    use blob_arena::config::normalize_player_name;
    use blob_arena::game::Key;
    use blob_arena::sim::{ArenaShape, Ball, ObstacleShape, RoundPhase};
    use blob_arena::sinks::{CollaboratorError, FrameView, Renderer, ScoreSink};
    use blob_arena::standings::{RoundSummary, Standings, format_elapsed};
    use blob_arena::{FrameStatus, Game, GameConfig};

    const BACKGROUND: &str = "#101018";
    const ARENA_FILL: &str = "#1b1b29";
    const ARENA_EDGE: &str = "#5a5a7a";
    /// How long the "absorbed" notification stays up
    const NOTIFICATION_MS: i32 = 3000;

    fn document() -> Option<Document> {
        web_sys::window().and_then(|w| w.document())
    }

    fn set_class(id: &str, class: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            let _ = el.set_attribute("class", class);
        }
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    /// Canvas 2D renderer
    struct CanvasRenderer {
        ctx: CanvasRenderingContext2d,
        width: f64,
        height: f64,
    }

    impl CanvasRenderer {
        fn new(canvas: &HtmlCanvasElement) -> Option<Self> {
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()?
                .dyn_into::<CanvasRenderingContext2d>()
                .ok()?;
            Some(Self {
                ctx,
                width: canvas.width() as f64,
                height: canvas.height() as f64,
            })
        }

        fn disc(&self, x: f64, y: f64, r: f64) -> Result<(), JsValue> {
            self.ctx.begin_path();
            self.ctx.arc(x, y, r, 0.0, TAU)
        }

        fn draw_arena(&self, shape: &ArenaShape) -> Result<(), JsValue> {
            let ctx = &self.ctx;
            ctx.set_fill_style_str(ARENA_FILL);
            ctx.set_stroke_style_str(ARENA_EDGE);
            ctx.set_line_width(3.0);
            match *shape {
                ArenaShape::Rectangle { min, max } => {
                    let size = max - min;
                    ctx.fill_rect(min.x as f64, min.y as f64, size.x as f64, size.y as f64);
                    ctx.stroke_rect(min.x as f64, min.y as f64, size.x as f64, size.y as f64);
                }
                ArenaShape::Ellipse { center, radii } => {
                    ctx.begin_path();
                    ctx.ellipse(
                        center.x as f64,
                        center.y as f64,
                        radii.x as f64,
                        radii.y as f64,
                        0.0,
                        0.0,
                        TAU,
                    )?;
                    ctx.fill();
                    ctx.stroke();
                }
            }
            Ok(())
        }

        fn draw_ball(&self, ball: &Ball, alpha: f32) -> Result<(), JsValue> {
            let ctx = &self.ctx;
            let pos = ball.interpolated_position(alpha);
            let (x, y, r) = (pos.x as f64, pos.y as f64, ball.radius as f64);

            self.disc(x, y, r)?;
            ctx.set_fill_style_str(&ball.color.to_string());
            ctx.fill();
            if ball.is_player() {
                ctx.set_stroke_style_str("#ffffff");
                ctx.set_line_width(2.0);
                ctx.stroke();
            }

            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("12px sans-serif");
            ctx.set_text_align("center");
            ctx.fill_text(&ball.name, x, y - r - 6.0)?;
            Ok(())
        }

        fn draw(&self, frame: &FrameView<'_>) -> Result<(), JsValue> {
            let ctx = &self.ctx;
            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str(BACKGROUND);
            ctx.fill_rect(0.0, 0.0, self.width, self.height);

            self.draw_arena(&frame.arena.shape)?;

            for obstacle in frame.obstacles {
                ctx.set_fill_style_str(&obstacle.color.to_string());
                match obstacle.shape {
                    ObstacleShape::Rectangle { min, size } => {
                        ctx.fill_rect(min.x as f64, min.y as f64, size.x as f64, size.y as f64);
                    }
                    ObstacleShape::Circle { center, radius } => {
                        self.disc(center.x as f64, center.y as f64, radius as f64)?;
                        ctx.fill();
                    }
                }
            }

            for ball in frame.active_balls() {
                self.draw_ball(ball, frame.interpolation)?;
            }

            for p in frame.particles.iter_active() {
                ctx.set_global_alpha(p.alpha() as f64);
                ctx.set_fill_style_str(&p.color.to_string());
                self.disc(p.pos.x as f64, p.pos.y as f64, p.size as f64)?;
                ctx.fill();
            }
            ctx.set_global_alpha(1.0);

            ctx.set_fill_style_str("#ffffff");
            ctx.set_text_align("left");
            ctx.set_font("20px monospace");
            ctx.fill_text(&format_elapsed(frame.elapsed_secs), 20.0, 36.0)?;

            if frame.phase == RoundPhase::Countdown {
                let secs = frame.countdown_secs_left.ceil().max(1.0);
                ctx.set_text_align("center");
                ctx.set_font("bold 96px sans-serif");
                ctx.fill_text(&format!("{secs}"), self.width / 2.0, self.height / 2.0)?;
            }
            Ok(())
        }
    }

    impl Renderer for CanvasRenderer {
        fn submit_frame(&mut self, frame: &FrameView<'_>) -> Result<(), CollaboratorError> {
            self.draw(frame)
                .map_err(|e| CollaboratorError::Render(format!("{e:?}")))
        }
    }

    /// Leaderboard, notifications and the game-over dialog
    struct DomScores;

    impl DomScores {
        fn update_leaderboard(standings: &Standings) -> Result<(), CollaboratorError> {
            let board = document()
                .and_then(|d| d.get_element_by_id("leaderboard"))
                .ok_or_else(|| CollaboratorError::Score("no #leaderboard element".into()))?;

            let mut html = String::new();
            for entry in standings.top() {
                let class = if entry.active { "entry" } else { "entry out" };
                html.push_str(&format!(
                    "<li class=\"{class}\"><span style=\"color:{}\">{}. {}</span> <b>{}</b></li>",
                    entry.color, entry.rank, entry.name, entry.score
                ));
            }
            board.set_inner_html(&html);
            Ok(())
        }
    }

    impl ScoreSink for DomScores {
        fn on_score_changed(&mut self, _ball: &Ball, standings: &Standings) -> Result<(), CollaboratorError> {
            Self::update_leaderboard(standings)
        }

        fn on_player_eliminated(&mut self, _player: &Ball) -> Result<(), CollaboratorError> {
            set_text("notification", "You were absorbed! Spectating...");
            set_class("notification", "show");

            let hide = Closure::once(move || set_class("notification", "hidden"));
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    hide.as_ref().unchecked_ref(),
                    NOTIFICATION_MS,
                );
            }
            hide.forget();
            Ok(())
        }

        fn on_round_over(
            &mut self,
            _winner: Option<&Ball>,
            summary: &RoundSummary,
            standings: &Standings,
        ) -> Result<(), CollaboratorError> {
            Self::update_leaderboard(standings)?;
            set_text("game-over-title", &summary.title);
            set_text("game-over-message", &summary.message);
            set_class("game-over", "");
            Ok(())
        }
    }

    /// The running game plus page-level state
    struct Shell {
        game: Game,
        canvas: HtmlCanvasElement,
        config: GameConfig,
        /// A frame callback is scheduled
        running: bool,
    }

    impl Shell {
        fn build_game(config: &GameConfig, canvas: &HtmlCanvasElement) -> Option<Game> {
            let seed = js_sys::Date::now() as u64;
            let game = match Game::new(config.clone(), seed) {
                Ok(game) => game,
                Err(e) => {
                    log::error!("Invalid configuration: {e}");
                    return None;
                }
            };
            let game = game.with_audio(AudioManager::new()).with_scores(DomScores);
            let game = match CanvasRenderer::new(canvas) {
                Some(renderer) => game.with_renderer(renderer),
                None => {
                    log::error!("Canvas 2D context unavailable");
                    game
                }
            };
            log::info!("Round ready with seed: {seed}");
            Some(game)
        }

        /// Canvas-space position of a client point
        fn to_canvas(&self, client_x: i32, client_y: i32) -> (f32, f32) {
            let rect = self.canvas.get_bounding_client_rect();
            let sx = self.canvas.width() as f64 / rect.width().max(1.0);
            let sy = self.canvas.height() as f64 / rect.height().max(1.0);
            (
                ((client_x as f64 - rect.left()) * sx) as f32,
                ((client_y as f64 - rect.top()) * sy) as f32,
            )
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialised".into());
        }

        log::info!("Blob Arena starting...");

        let Some(document) = document() else {
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element");
            return;
        };

        let config = GameConfig::load();
        canvas.set_width(config.width as u32);
        canvas.set_height(config.height as u32);

        let Some(game) = Shell::build_game(&config, &canvas) else {
            return;
        };
        let shell = Rc::new(RefCell::new(Shell {
            game,
            canvas: canvas.clone(),
            config,
            running: false,
        }));

        setup_input_handlers(&canvas, shell.clone());
        setup_start_button(shell.clone());
        setup_restart_button(shell.clone());

        // Draw the idle arena behind the name dialog
        shell.borrow_mut().game.frame(0.0);

        log::info!("Blob Arena running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, shell: Rc<RefCell<Shell>>) {
        // Mouse click - steer towards the point
        {
            let shell = shell.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut s = shell.borrow_mut();
                let (x, y) = s.to_canvas(event.client_x(), event.client_y());
                s.game.pointer_target(x, y);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start
        {
            let shell = shell.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut s = shell.borrow_mut();
                    let (x, y) = s.to_canvas(touch.client_x(), touch.client_y());
                    s.game.pointer_target(x, y);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Arrow keys
        let Some(window) = web_sys::window() else {
            return;
        };
        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let shell = shell.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = Key::from_key_name(&event.key()) {
                    event.prevent_default();
                    shell.borrow_mut().game.key_state(key, pressed);
                }
            });
            let _ = window
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Name dialog: validate, then start the countdown
    fn setup_start_button(shell: Rc<RefCell<Shell>>) {
        let Some(btn) = document().and_then(|d| d.get_element_by_id("start-btn")) else {
            // No dialog on the page: start straight away
            begin_round(&shell);
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let raw = document()
                .and_then(|d| d.get_element_by_id("player-name"))
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                .map(|input| input.value())
                .unwrap_or_default();

            let name = match normalize_player_name(&raw) {
                Ok(name) => name,
                Err(e) => {
                    set_text("name-error", &e.to_string());
                    return;
                }
            };

            {
                let mut s = shell.borrow_mut();
                s.config.player_name = name;
                s.config.save();
                let config = s.config.clone();
                let Some(game) = Shell::build_game(&config, &s.canvas) else {
                    return;
                };
                s.game = game;
            }
            set_class("name-dialog", "hidden");
            begin_round(&shell);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_restart_button(shell: Rc<RefCell<Shell>>) {
        let Some(btn) = document().and_then(|d| d.get_element_by_id("restart-btn")) else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            shell
                .borrow_mut()
                .game
                .restart(js_sys::Date::now() as u64);
            set_class("game-over", "hidden");
            set_class("notification", "hidden");
            begin_round(&shell);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn begin_round(shell: &Rc<RefCell<Shell>>) {
        let schedule = {
            let mut s = shell.borrow_mut();
            s.game.start();
            let schedule = !s.running;
            s.running = true;
            schedule
        };
        if schedule {
            request_animation_frame(shell.clone());
        }
    }

    fn request_animation_frame(shell: Rc<RefCell<Shell>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(shell, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(shell: Rc<RefCell<Shell>>, time: f64) {
        let status = {
            let mut s = shell.borrow_mut();
            let status = s.game.frame(time);
            if status == FrameStatus::Stop {
                s.running = false;
            }
            status
        };

        if status == FrameStatus::Continue {
            request_animation_frame(shell);
        } else {
            log::info!("Round over - frame loop stopped");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = headless::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

/// Seeded round run to completion without a display
///
/// Usage: `blob-arena [SEED] [CONFIG.json]`
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;

    use serde::Serialize;

    use blob_arena::config::ConfigError;
    use blob_arena::sinks::LogSink;
    use blob_arena::standings::{RoundSummary, Standings};
    use blob_arena::{FrameStatus, Game, GameConfig};

    const DEFAULT_SEED: u64 = 42;
    /// Simulated wall time per frame
    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Give up after this many frames (about 4.6 simulated hours)
    const MAX_FRAMES: u64 = 1_000_000;

    #[derive(Serialize)]
    struct Report {
        seed: u64,
        frames: u64,
        ticks: u64,
        elapsed_secs: f32,
        summary: Option<RoundSummary>,
        standings: Standings,
    }

    pub fn run() -> Result<(), ConfigError> {
        let mut args = std::env::args().skip(1);

        let seed = match args.next() {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                field: "seed",
                reason: format!("`{raw}` is not an unsigned integer"),
            })?,
            None => DEFAULT_SEED,
        };
        let config = match args.next() {
            Some(path) => GameConfig::load_from(Path::new(&path))?,
            None => GameConfig::default(),
        };

        log::info!(
            "Blob Arena (headless) seed {seed}: {} balls, {} obstacles",
            config.population(),
            config.obstacles.as_str()
        );

        let mut game = Game::new(config, seed)?
            .with_audio(LogSink)
            .with_scores(LogSink);
        game.start();

        let mut frames = 0;
        let mut t = 0.0;
        while frames < MAX_FRAMES {
            frames += 1;
            if game.frame(t) == FrameStatus::Stop {
                break;
            }
            t += FRAME_MS;
        }
        if game.summary().is_none() {
            log::warn!("Round still running after {frames} frames, stopping");
        }

        let report = Report {
            seed,
            frames,
            ticks: game.state().tick_count,
            elapsed_secs: game.state().elapsed_secs(),
            summary: game.summary(),
            standings: game.standings(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
