use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::PcmAudio;
use crate::error::GenAiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One prior message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Text generation request; `response_schema` asks for JSON of that shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRequest {
    pub system: Option<String>,
    pub history: Vec<Turn>,
    pub prompt: String,
    pub response_schema: Option<Value>,
    pub temperature: Option<f32>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    /// File extension matching the mime type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoice {
    pub speaker: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceConfig {
    Single(String),
    /// Speakers are matched against `Name:` prefixes in the text.
    MultiSpeaker(Vec<SpeakerVoice>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: VoiceConfig,
}

/// The hosted generative model as seen by flows.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_text(&self, request: &TextRequest) -> GenAiResult<String>;

    async fn generate_image(&self, prompt: &str) -> GenAiResult<GeneratedImage>;

    async fn synthesize_speech(&self, request: &SpeechRequest) -> GenAiResult<PcmAudio>;
}
