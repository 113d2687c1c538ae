//! Generative AI integration.
//!
//! Flows in the application talk to a [`GenerativeModel`]; the production
//! implementation is [`GeminiClient`], which calls the hosted
//! `generateContent` REST endpoint. Speech comes back as raw PCM and is
//! wrapped into WAV by [`audio`].

pub mod audio;
pub mod error;
pub mod gemini;
pub mod model;
pub mod schema;
pub mod structured;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use audio::{AudioClip, PcmAudio};
pub use error::{GenAiError, GenAiResult};
pub use gemini::{GeminiClient, GeminiConfig};
pub use model::{GeneratedImage, GenerativeModel, Role, SpeakerVoice, SpeechRequest, TextRequest, Turn, VoiceConfig};
pub use structured::{generate_structured, parse_json_output};
