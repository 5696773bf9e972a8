//! Audio cues using the Web Audio API
//!
//! Procedurally generated sounds - no external files needed.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::sinks::{AudioSink, CollaboratorError, SoundCue};

/// Web Audio backed cue player
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Result<(OscillatorNode, GainNode), CollaboratorError> {
        let fail = |what: &str| CollaboratorError::Audio(format!("could not create {what}"));
        let osc = ctx.create_oscillator().map_err(|_| fail("oscillator"))?;
        let gain = ctx.create_gain().map_err(|_| fail("gain node"))?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain)
            .map_err(|_| fail("oscillator route"))?;
        gain.connect_with_audio_node(&ctx.destination())
            .map_err(|_| fail("output route"))?;

        Ok((osc, gain))
    }

    /// Wall/obstacle bounce - short ping, louder for bigger balls
    fn play_bounce(ctx: &AudioContext, vol: f32) -> Result<(), CollaboratorError> {
        let (osc, gain) = Self::create_osc(ctx, 420.0, OscillatorType::Sine)?;
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.08)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.1).ok();
        Ok(())
    }

    /// Absorption - rising gulp
    fn play_merge(ctx: &AudioContext, vol: f32) -> Result<(), CollaboratorError> {
        let t = ctx.current_time();

        let (osc, gain) = Self::create_osc(ctx, 180.0, OscillatorType::Sine)?;
        gain.gain().set_value_at_time(vol * 0.5, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.25)
            .ok();
        osc.frequency().set_value_at_time(180.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(640.0, t + 0.2)
            .ok();
        osc.start().ok();
        osc.stop_with_when(t + 0.3).ok();

        // Soft body under the sweep
        let (osc, gain) = Self::create_osc(ctx, 90.0, OscillatorType::Triangle)?;
        gain.gain().set_value_at_time(vol * 0.25, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.2)
            .ok();
        osc.start().ok();
        osc.stop_with_when(t + 0.22).ok();
        Ok(())
    }

    /// Player absorbed - falling buzz
    fn play_player_eliminated(ctx: &AudioContext, vol: f32) -> Result<(), CollaboratorError> {
        let (osc, gain) = Self::create_osc(ctx, 440.0, OscillatorType::Sawtooth)?;
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.35, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.6)
            .ok();
        osc.frequency().set_value_at_time(440.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(70.0, t + 0.55)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.65).ok();
        Ok(())
    }

    /// Round over - ascending arpeggio
    fn play_round_over(ctx: &AudioContext, vol: f32) -> Result<(), CollaboratorError> {
        let t = ctx.current_time();
        let notes = [523.25, 659.25, 783.99, 1046.5];

        for (i, freq) in notes.iter().enumerate() {
            let (osc, gain) = Self::create_osc(ctx, *freq, OscillatorType::Triangle)?;
            let start = t + i as f64 * 0.12;
            gain.gain().set_value_at_time(0.0, t).ok();
            gain.gain().set_value_at_time(vol * 0.3, start).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, start + 0.3)
                .ok();
            osc.start_with_when(start).ok();
            osc.stop_with_when(start + 0.35).ok();
        }
        Ok(())
    }
}

impl AudioSink for AudioManager {
    fn play_cue(&mut self, cue: SoundCue, intensity: f32) -> Result<(), CollaboratorError> {
        let vol = self.master_volume * intensity.clamp(0.0, 1.0);
        if vol <= 0.0 {
            return Ok(());
        }

        // No context: already warned at startup
        let Some(ctx) = &self.ctx else { return Ok(()) };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match cue {
            SoundCue::Bounce => Self::play_bounce(ctx, vol),
            SoundCue::Merge => Self::play_merge(ctx, vol),
            SoundCue::PlayerEliminated => Self::play_player_eliminated(ctx, vol),
            SoundCue::RoundOver => Self::play_round_over(ctx, vol),
        }
    }
}
