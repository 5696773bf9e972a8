//! Collaborator interfaces the frame driver calls into
//!
//! Rendering, audio and score/UI updates live outside the simulation. A failing
//! collaborator returns a [`CollaboratorError`]; the driver logs it and keeps going.

use thiserror::Error;

use crate::sim::{Arena, Ball, Obstacle, ParticlePool, RoundPhase};
use crate::standings::{RoundSummary, Standings};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("renderer failed: {0}")]
    Render(String),
    #[error("audio failed: {0}")]
    Audio(String),
    #[error("score display failed: {0}")]
    Score(String),
}

/// Sound cues the simulation can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Bounce,
    Merge,
    PlayerEliminated,
    RoundOver,
}

impl SoundCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::Bounce => "bounce",
            SoundCue::Merge => "merge",
            SoundCue::PlayerEliminated => "player_eliminated",
            SoundCue::RoundOver => "round_over",
        }
    }
}

/// Read-only view of the round handed to the renderer once per frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// All balls; only active ones are drawn
    pub balls: &'a [Ball],
    /// Blend factor between `prev_pos` and `pos` (0.0 - 1.0)
    pub interpolation: f32,
    pub arena: &'a Arena,
    pub obstacles: &'a [Obstacle],
    pub particles: &'a ParticlePool,
    pub phase: RoundPhase,
    pub countdown_secs_left: f32,
    pub elapsed_secs: f32,
}

impl FrameView<'_> {
    pub fn active_balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.active)
    }
}

pub trait Renderer {
    fn submit_frame(&mut self, frame: &FrameView<'_>) -> Result<(), CollaboratorError>;
}

/// Fire-and-forget audio cues
pub trait AudioSink {
    /// `intensity` is a volume factor in 0.0 - 1.0
    fn play_cue(&mut self, cue: SoundCue, intensity: f32) -> Result<(), CollaboratorError>;
}

pub trait ScoreSink {
    /// A ball's score changed; `standings` is the updated ranking
    fn on_score_changed(&mut self, ball: &Ball, standings: &Standings) -> Result<(), CollaboratorError>;

    fn on_player_eliminated(&mut self, _player: &Ball) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn on_round_over(
        &mut self,
        winner: Option<&Ball>,
        summary: &RoundSummary,
        standings: &Standings,
    ) -> Result<(), CollaboratorError>;
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Renderer for NullSink {
    fn submit_frame(&mut self, _frame: &FrameView<'_>) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl AudioSink for NullSink {
    fn play_cue(&mut self, _cue: SoundCue, _intensity: f32) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl ScoreSink for NullSink {
    fn on_score_changed(&mut self, _ball: &Ball, _standings: &Standings) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn on_round_over(
        &mut self,
        _winner: Option<&Ball>,
        _summary: &RoundSummary,
        _standings: &Standings,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Reports cues and score changes through the `log` facade (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play_cue(&mut self, cue: SoundCue, intensity: f32) -> Result<(), CollaboratorError> {
        log::trace!("cue {} ({intensity:.2})", cue.as_str());
        Ok(())
    }
}

impl ScoreSink for LogSink {
    fn on_score_changed(&mut self, ball: &Ball, standings: &Standings) -> Result<(), CollaboratorError> {
        log::debug!(
            "{} scored: {} (rank {})",
            ball.name,
            ball.score,
            standings.rank_of(ball.id).unwrap_or(0)
        );
        Ok(())
    }

    fn on_player_eliminated(&mut self, player: &Ball) -> Result<(), CollaboratorError> {
        log::info!("{} was absorbed! Spectating...", player.name);
        Ok(())
    }

    fn on_round_over(
        &mut self,
        _winner: Option<&Ball>,
        summary: &RoundSummary,
        _standings: &Standings,
    ) -> Result<(), CollaboratorError> {
        log::info!("{}: {}", summary.title, summary.message);
        Ok(())
    }
}
