//! Scripted model for tests: replays queued text and fixed media.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::audio::{PcmAudio, DEFAULT_SAMPLE_RATE};
use crate::error::{GenAiError, GenAiResult};
use crate::model::{GeneratedImage, GenerativeModel, SpeechRequest, TextRequest};

#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    text_requests: Mutex<Vec<TextRequest>>,
    speech_requests: Mutex<Vec<SpeechRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next `generate_text` call.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .push_back(text.into());
    }

    pub fn text_requests(&self) -> Vec<TextRequest> {
        self.text_requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }

    pub fn speech_requests(&self) -> Vec<SpeechRequest> {
        self.speech_requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_text(&self, request: &TextRequest) -> GenAiResult<String> {
        self.text_requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .pop_front()
            .ok_or_else(|| GenAiError::EmptyResponse("no scripted reply left".into()))
    }

    async fn generate_image(&self, _prompt: &str) -> GenAiResult<GeneratedImage> {
        Ok(GeneratedImage {
            mime_type: "image/png".into(),
            bytes: b"\x89PNG\r\n\x1a\nscripted".to_vec(),
        })
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> GenAiResult<PcmAudio> {
        self.speech_requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        // 250ms of silence
        Ok(PcmAudio::mono(vec![0; 12_000], DEFAULT_SAMPLE_RATE))
    }
}
