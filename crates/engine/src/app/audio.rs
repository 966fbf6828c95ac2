use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio device unavailable: {0}")]
    Device(String),
    #[error("unknown sound '{0}'")]
    UnknownSound(String),
}

/// Fire-and-forget playback boundary. Callers log failures and move on.
pub trait Audio {
    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AudioError>;
    fn play_music(&mut self, name: &str, looped: bool) -> Result<(), AudioError>;
    fn fade_out_music(&mut self, millis: u32) -> Result<(), AudioError>;
    fn pause_music(&mut self, paused: bool) -> Result<(), AudioError>;
}

/// Backend that only traces what would have been played.
#[derive(Debug, Default)]
pub struct SilentAudio {
    music: Option<String>,
}

impl SilentAudio {
    pub fn current_music(&self) -> Option<&str> {
        self.music.as_deref()
    }
}

impl Audio for SilentAudio {
    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AudioError> {
        debug!(sound = name, volume, "audio_sound");
        Ok(())
    }

    fn play_music(&mut self, name: &str, looped: bool) -> Result<(), AudioError> {
        debug!(music = name, looped, "audio_music");
        self.music = Some(name.to_string());
        Ok(())
    }

    fn fade_out_music(&mut self, millis: u32) -> Result<(), AudioError> {
        debug!(millis, "audio_music_fade");
        self.music = None;
        Ok(())
    }

    fn pause_music(&mut self, paused: bool) -> Result<(), AudioError> {
        debug!(paused, "audio_music_pause");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_audio_tracks_current_music() {
        let mut audio = SilentAudio::default();
        assert!(audio.play_music("juego1", true).is_ok());
        assert_eq!(audio.current_music(), Some("juego1"));
        assert!(audio.fade_out_music(500).is_ok());
        assert_eq!(audio.current_music(), None);
    }
}
