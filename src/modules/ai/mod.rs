pub mod flows;
pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, InitCtx, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{json_body, operation, reference, with_body};

/// Generative flows: marketing, podcasts, social posts, speech, games, chat and covers
pub struct AiModule;

#[async_trait]
impl Module for AiModule {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.app.ai.is_none() {
            tracing::warn!("no generative AI credentials configured; flows will answer 503");
        }
        Ok(())
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let flow = |summary: &str, input: &str, output: &str| {
            json!({
                "post": with_body(
                    operation("AI", summary, "200", reference(output)),
                    json_body(input),
                )
            })
        };
        let strings = json!({"type": "array", "items": {"type": "string"}});
        let script = json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "intro": {"type": "string"},
                "segments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"speaker": {"type": "string"}, "text": {"type": "string"}}
                    }
                },
                "outro": {"type": "string"}
            }
        });

        Some(json!({
            "paths": {
                "/marketing-plan": flow("Marketing plan for a library", "MarketingPlanRequest", "MarketingPlan"),
                "/podcast-script": flow("Podcast script", "PodcastScriptRequest", "PodcastScript"),
                "/podcast-audio": flow("Narrate a podcast script", "PodcastAudioRequest", "AudioClip"),
                "/social-posts": flow("Social media posts", "SocialPostsRequest", "SocialPosts"),
                "/text-to-speech": flow("Text to speech", "SpeechInput", "AudioClip"),
                "/literary-game": flow("Literary game", "GameRequest", "LiteraryGame"),
                "/chat": flow("Reader or library assistant", "ChatRequest", "ChatReply"),
                "/cover-image": flow("Generate and store a cover image", "CoverRequest", "GeneratedCover")
            },
            "components": {
                "schemas": {
                    "MarketingPlanRequest": {
                        "type": "object",
                        "properties": {
                            "library_name": {"type": "string"},
                            "goal": {"type": "string"},
                            "audience": {"type": "string"},
                            "weeks": {"type": "integer", "minimum": 1, "maximum": 12},
                            "budget": {"type": "string"}
                        },
                        "required": ["library_name", "goal", "audience"]
                    },
                    "MarketingPlan": {
                        "type": "object",
                        "properties": {
                            "summary": {"type": "string"},
                            "objectives": strings.clone(),
                            "channels": {"type": "array", "items": {"type": "object"}},
                            "timeline": {"type": "array", "items": {"type": "object"}},
                            "kpis": strings.clone()
                        }
                    },
                    "PodcastScriptRequest": {
                        "type": "object",
                        "properties": {
                            "topic": {"type": "string"},
                            "book_title": {"type": "string"},
                            "hosts": strings.clone(),
                            "minutes": {"type": "integer", "minimum": 1, "maximum": 30}
                        },
                        "required": ["topic"]
                    },
                    "PodcastScript": script.clone(),
                    "PodcastAudioRequest": {
                        "type": "object",
                        "properties": {
                            "script": script,
                            "voices": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {"speaker": {"type": "string"}, "voice": {"type": "string"}}
                                }
                            }
                        },
                        "required": ["script"]
                    },
                    "AudioClip": {
                        "type": "object",
                        "properties": {
                            "media": {"type": "string", "description": "data:audio/wav;base64,..."},
                            "duration_ms": {"type": "integer"},
                            "size_bytes": {"type": "integer"}
                        }
                    },
                    "SocialPostsRequest": {
                        "type": "object",
                        "properties": {
                            "topic": {"type": "string"},
                            "platforms": {
                                "type": "array",
                                "items": {"type": "string", "enum": ["instagram", "facebook", "x", "tiktok", "linkedin"]}
                            },
                            "tone": {"type": "string"},
                            "count": {"type": "integer", "minimum": 1, "maximum": 10}
                        },
                        "required": ["topic", "platforms"]
                    },
                    "SocialPosts": {
                        "type": "object",
                        "properties": {"posts": {"type": "array", "items": {"type": "object"}}}
                    },
                    "SpeechInput": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}, "voice": {"type": "string"}},
                        "required": ["text"]
                    },
                    "GameRequest": {
                        "type": "object",
                        "properties": {
                            "kind": {"type": "string", "enum": ["trivia", "guess_the_book", "complete_the_quote"]},
                            "topic": {"type": "string"},
                            "difficulty": {"type": "string", "enum": ["easy", "medium", "hard"]},
                            "questions": {"type": "integer", "minimum": 1, "maximum": 15}
                        },
                        "required": ["kind", "topic"]
                    },
                    "LiteraryGame": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "instructions": {"type": "string"},
                            "questions": {"type": "array", "items": {"type": "object"}}
                        }
                    },
                    "ChatRequest": {
                        "type": "object",
                        "properties": {
                            "assistant": {"type": "string", "enum": ["reader", "library"]},
                            "history": {"type": "array", "items": {"type": "object"}},
                            "message": {"type": "string"},
                            "library_id": {"type": "string"}
                        },
                        "required": ["assistant", "message"]
                    },
                    "ChatReply": {
                        "type": "object",
                        "properties": {"reply": {"type": "string"}, "book_ids": strings}
                    },
                    "CoverRequest": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"},
                            "style": {"type": "string"}
                        },
                        "required": ["title"]
                    },
                    "GeneratedCover": {
                        "type": "object",
                        "properties": {
                            "url": {"type": "string"},
                            "path": {"type": "string"},
                            "content_type": {"type": "string"},
                            "size": {"type": "integer"}
                        }
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(AiModule)
}
