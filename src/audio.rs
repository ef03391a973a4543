//! Audio cue boundary
//!
//! The simulation never synthesizes sound. It emits named cues after each
//! tick and hands them to an [`AudioSink`], which must return immediately.

use serde::{Deserialize, Serialize};

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// A run started
    Start,
    /// Correct resolution
    Success,
    /// Incorrect resolution
    Error,
    /// Something slipped past the player
    Miss,
    /// Piece placed or tile revealed
    Place,
    /// Level cleared / advanced
    LevelUp,
    /// Pause toggled
    Pause,
    /// Run lost
    GameOver,
    /// Run won
    Victory,
}

impl AudioCue {
    /// Name the audio subsystem looks the sound up by
    pub fn name(&self) -> &'static str {
        match self {
            AudioCue::Start => "start",
            AudioCue::Success => "success",
            AudioCue::Error => "error",
            AudioCue::Miss => "miss",
            AudioCue::Place => "place",
            AudioCue::LevelUp => "levelup",
            AudioCue::Pause => "pause",
            AudioCue::GameOver => "gameover",
            AudioCue::Victory => "victory",
        }
    }
}

/// Fire-and-forget audio player
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Discards every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: AudioCue) {}
}

/// Logs cues at the volume they would be played with
#[derive(Debug, Clone)]
pub struct LogAudio {
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for LogAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl LogAudio {
    pub fn new() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Build from the volume settings
    pub fn from_settings(settings: &crate::Settings) -> Self {
        let mut audio = Self::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);
        audio.set_muted(settings.muted);
        audio
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Get effective volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }
}

impl AudioSink for LogAudio {
    fn play(&mut self, cue: AudioCue) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        log::debug!("cue {} @ {:.2}", cue.name(), vol);
    }
}
