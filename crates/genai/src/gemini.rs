//! Client for the hosted Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audio::{sample_rate_from_mime, PcmAudio, DEFAULT_SAMPLE_RATE};
use crate::error::{GenAiError, GenAiResult};
use crate::model::{GeneratedImage, GenerativeModel, Role, SpeechRequest, TextRequest, VoiceConfig};

const USER_AGENT: &str = concat!("alicia-libros/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub speech_model: String,
    pub timeout: Duration,
}

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GenAiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    async fn generate(&self, model: &str, body: &Value) -> GenAiResult<GenerateContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );
        tracing::debug!(model, "calling generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "model API returned an error");
            return Err(GenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> GenAiResult<String> {
        let body = text_body(request);
        let response = self.generate(&self.config.text_model, &body).await?;
        response.first_text()
    }

    async fn generate_image(&self, prompt: &str) -> GenAiResult<GeneratedImage> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]},
        });
        let response = self.generate(&self.config.image_model, &body).await?;
        let inline = response.first_inline("image/")?;
        Ok(GeneratedImage {
            bytes: STANDARD.decode(inline.data.as_bytes())?,
            mime_type: inline.mime_type,
        })
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> GenAiResult<PcmAudio> {
        let body = speech_body(request);
        let response = self.generate(&self.config.speech_model, &body).await?;
        let inline = response.first_inline("audio/")?;
        let sample_rate = sample_rate_from_mime(&inline.mime_type).unwrap_or(DEFAULT_SAMPLE_RATE);
        Ok(PcmAudio::mono(STANDARD.decode(inline.data.as_bytes())?, sample_rate))
    }
}

fn text_body(request: &TextRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "model",
            };
            json!({"role": role, "parts": [{"text": turn.text}]})
        })
        .collect();
    contents.push(json!({"role": "user", "parts": [{"text": request.prompt}]}));

    let mut generation_config = json!({});
    if let Some(schema) = &request.response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }
    if let Some(temperature) = request.temperature {
        generation_config["temperature"] = json!(temperature);
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": generation_config,
    });
    if let Some(system) = &request.system {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }
    body
}

fn speech_body(request: &SpeechRequest) -> Value {
    let speech_config = match &request.voice {
        VoiceConfig::Single(voice) => json!({
            "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice}}
        }),
        VoiceConfig::MultiSpeaker(speakers) => {
            let voices: Vec<Value> = speakers
                .iter()
                .map(|s| {
                    json!({
                        "speaker": s.speaker,
                        "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": s.voice}}
                    })
                })
                .collect();
            json!({"multiSpeakerVoiceConfig": {"speakerVoiceConfigs": voices}})
        }
    };

    json!({
        "contents": [{"role": "user", "parts": [{"text": request.text}]}],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": speech_config,
        },
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn parts(&self) -> GenAiResult<&[Part]> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(GenAiError::Blocked(reason.to_string()));
        }

        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| GenAiError::EmptyResponse("no candidates".into()))?;
        match &candidate.content {
            Some(content) if !content.parts.is_empty() => Ok(&content.parts),
            _ => Err(GenAiError::EmptyResponse(format!(
                "finish reason {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))),
        }
    }

    fn first_text(&self) -> GenAiResult<String> {
        let text: String = self
            .parts()?
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            Err(GenAiError::EmptyResponse("no text parts".into()))
        } else {
            Ok(text)
        }
    }

    fn first_inline(&self, mime_prefix: &str) -> GenAiResult<InlineData> {
        self.parts()?
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|data| data.mime_type.starts_with(mime_prefix))
            .cloned()
            .ok_or_else(|| GenAiError::EmptyResponse(format!("no {mime_prefix}* payload")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SpeakerVoice, Turn};

    fn parse(raw: Value) -> GenerateContentResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_text_body_includes_schema_and_history() {
        let request = TextRequest::new("Recomiéndame un libro")
            .with_system("Eres librera")
            .with_history(vec![Turn {
                role: Role::Model,
                text: "¡Hola!".into(),
            }])
            .with_schema(json!({"type": "OBJECT"}));
        let body = text_body(&request);

        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "Recomiéndame un libro");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Eres librera");
    }

    #[test]
    fn test_multi_speaker_body() {
        let body = speech_body(&SpeechRequest {
            text: "Ana: Hola\nLuis: Buenas".into(),
            voice: VoiceConfig::MultiSpeaker(vec![
                SpeakerVoice {
                    speaker: "Ana".into(),
                    voice: "Kore".into(),
                },
                SpeakerVoice {
                    speaker: "Luis".into(),
                    voice: "Puck".into(),
                },
            ]),
        });
        let configs = &body["generationConfig"]["speechConfig"]["multiSpeakerVoiceConfig"]
            ["speakerVoiceConfigs"];
        assert_eq!(configs[1]["speaker"], "Luis");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
    }

    #[test]
    fn test_concatenates_text_parts() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        }));
        assert_eq!(response.first_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_blocked_prompt() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(response.first_text(), Err(GenAiError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_missing_content_reports_finish_reason() {
        let response = parse(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}));
        let err = response.first_text().unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_inline_audio_lookup() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAA="}}
            ]}}]
        }));
        let inline = response.first_inline("audio/").unwrap();
        assert_eq!(sample_rate_from_mime(&inline.mime_type), Some(24_000));
        assert!(response.first_inline("image/").is_err());
    }
}
