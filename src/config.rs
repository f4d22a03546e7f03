use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for the frame-hysteresis state machine and the stream orchestrator.
///
/// Defaults match spec's "legacy" column (1536-sample frames); construct with
/// [`Config::v5_defaults`] for the 512-sample Silero v5 defaults instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Model input frame size in samples.
    pub frame_samples: usize,
    /// `isSpeech >= positive_speech_threshold` enters/continues speaking.
    pub positive_speech_threshold: f32,
    /// `isSpeech < negative_speech_threshold` triggers redemption.
    pub negative_speech_threshold: f32,
    /// Grace frames of sub-threshold probability tolerated before ending a segment.
    pub redemption_frames: usize,
    /// Pre-roll frames prepended to emitted segment audio.
    pub pre_speech_pad_frames: usize,
    /// Segment frames with `isSpeech >= positive_speech_threshold` needed to avoid a misfire.
    pub min_speech_frames: usize,
    /// On `pause()` while speaking: emit `SpeechEnd` instead of discarding/misfiring.
    pub submit_user_speech_on_pause: bool,
    /// Native input sample rate in Hz; resampled to 16000 if different.
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_samples: 1536,
            positive_speech_threshold: 0.5,
            negative_speech_threshold: 0.35,
            redemption_frames: 8,
            pre_speech_pad_frames: 1,
            min_speech_frames: 3,
            submit_user_speech_on_pause: false,
            sample_rate: 16_000,
        }
    }
}

impl Config {
    /// Defaults tuned for the Silero v5 model (512-sample frames).
    pub fn v5_defaults() -> Self {
        Self {
            frame_samples: 512,
            ..Self::default()
        }
    }

    /// Validates the configuration per spec: `0 < p- < p+ <= 1`, all frame
    /// counts `>= 0`, `frame_samples > 0`, `sample_rate > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_samples == 0 {
            return Err(ConfigError::InvalidFrameSamples);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if !(self.negative_speech_threshold > 0.0
            && self.negative_speech_threshold < self.positive_speech_threshold
            && self.positive_speech_threshold <= 1.0)
        {
            return Err(ConfigError::InvalidThresholds);
        }
        Ok(())
    }

    /// Checks `frame_samples` against a model's self-reported expectation.
    /// Resolves the spec's open question on legacy/v5 frame-size compatibility
    /// by rejecting a mismatch outright rather than leaving behavior undefined.
    pub fn validate_against_model(&self, model_frame_samples: usize) -> Result<(), ConfigError> {
        if self.frame_samples != model_frame_samples {
            return Err(ConfigError::FrameSamplesMismatch {
                expected: model_frame_samples,
                got: self.frame_samples,
            });
        }
        Ok(())
    }

    /// Parses a TOML document into a `Config`, falling back to defaults for
    /// any field the document omits (mirrors sonori's `read_app_config`).
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Parses a JSON document into a `Config`, falling back to defaults for
    /// any field the document omits.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
