//! Realtime session configuration.
//!
//! These types serialize 1:1 into the `session` payload of a
//! `session.update` frame. Optional fields are skipped when unset so the
//! wire never carries explicit nulls.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tool::{FunctionTool, ToolChoiceMode};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalogs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Realtime-capable model identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RealtimeModel {
    #[serde(rename = "gpt-realtime")]
    GptRealtime,
    #[default]
    #[serde(rename = "gpt-realtime-mini")]
    GptRealtimeMini,
}

impl RealtimeModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeModel::GptRealtime => "gpt-realtime",
            RealtimeModel::GptRealtimeMini => "gpt-realtime-mini",
        }
    }
}

impl std::fmt::Display for RealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assistant voices accepted by the realtime service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssistantVoice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    Cedar,
    #[default]
    Marin,
}

/// Models usable for input audio transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionModel {
    #[serde(rename = "whisper-1")]
    Whisper1,
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

/// Input noise-reduction profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseReduction {
    NearField,
    FarField,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Audio configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Audio encodings supported on the wire. PCM16 LE mono is the only one the
/// core streams today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Pcm16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFormatConfig {
    #[serde(rename = "type")]
    pub format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,
}

impl Default for AudioFormatConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::Pcm16,
            rate: Some(24_000),
        }
    }
}

/// Server-side turn detection. The server's voice-activity detection is
/// authoritative; the core never runs its own VAD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_response: Option<bool>,
}

impl TurnDetection {
    pub fn server_vad() -> Self {
        Self {
            kind: "server_vad".into(),
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: None,
        }
    }

    pub fn semantic_vad() -> Self {
        Self {
            kind: "semantic_vad".into(),
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: None,
        }
    }
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self::semantic_vad()
    }
}

/// Input audio transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTranscription {
    pub model: TranscriptionModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl InputTranscription {
    pub fn new(model: TranscriptionModel) -> Self {
        Self {
            model,
            language: None,
            prompt: None,
        }
    }

    /// Set the transcription language from an ISO-639-1/2 code.
    pub fn with_language(mut self, language: &str) -> Result<Self> {
        self.language = Some(validate_language_code(language)?);
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseReductionConfig {
    #[serde(rename = "type")]
    pub kind: NoiseReduction,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AudioInputConfig {
    pub format: AudioFormatConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<InputTranscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_reduction: Option<NoiseReductionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioOutputConfig {
    pub format: AudioFormatConfig,
    pub speed: f32,
    pub voice: AssistantVoice,
}

impl Default for AudioOutputConfig {
    fn default() -> Self {
        Self {
            format: AudioFormatConfig::default(),
            speed: 1.0,
            voice: AssistantVoice::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AudioConfig {
    pub input: AudioInputConfig,
    pub output: AudioOutputConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The `session` payload of a `session.update` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub model: RealtimeModel,
    pub instructions: String,
    pub voice: AssistantVoice,
    pub audio: AudioConfig,
    pub tool_choice: ToolChoiceMode,
    pub tools: Vec<FunctionTool>,
}

impl SessionConfig {
    /// Current output speech speed.
    pub fn speech_speed(&self) -> f32 {
        self.audio.output.speed
    }

    /// Set the output speech speed, clamping to `[0.5, 1.5]` and rounding to
    /// one decimal. Returns the value that was actually applied.
    pub fn set_speech_speed(&mut self, speed: f32) -> f32 {
        let applied = clamp_speech_speed(speed);
        self.audio.output.speed = applied;
        applied
    }
}

/// Clamp a speech speed into `[0.5, 1.5]` and round to one decimal place.
/// Every value sent on the wire goes through this.
pub fn clamp_speech_speed(speed: f32) -> f32 {
    let clipped = speed.clamp(0.5, 1.5);
    if clipped != speed {
        tracing::warn!(
            requested = speed,
            clipped,
            "speech speed out of range [0.5, 1.5], clipping"
        );
    }
    (clipped * 10.0).round() / 10.0
}

/// Validate an ISO-639-1/2 language code ("en", "de", "deu", ...).
pub fn validate_language_code(code: &str) -> Result<String> {
    let lang = code.trim().to_ascii_lowercase();
    if (lang.len() == 2 || lang.len() == 3) && lang.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(lang);
    }
    Err(Error::Config(format!(
        "invalid language code {code:?}, expected ISO-639 format (e.g. \"en\", \"de\")"
    )))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
