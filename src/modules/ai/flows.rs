//! Prompt construction and model calls for each generative flow.
//!
//! Flows take the model as a trait object so handlers can pass whatever
//! the context holds and tests can pass a scripted model.

use alicia_db::Entity;
use alicia_genai::schema::{array, enumeration, integer, object, string};
use alicia_genai::{
    generate_structured, AudioClip, GenAiError, GenAiResult, GeneratedImage, GenerativeModel,
    SpeakerVoice, SpeechRequest, TextRequest, VoiceConfig,
};
use serde_json::Value;

use super::models::{
    AssistantKind, ChatReply, ChatRequest, Difficulty, GameKind, GameRequest, LiteraryGame,
    MarketingPlan, MarketingPlanRequest, PodcastAudioRequest, PodcastScript,
    PodcastScriptRequest, SocialPosts, SocialPostsRequest, HISTORY_LIMIT,
};
use crate::modules::books::models::Book;
use crate::modules::libraries::models::Library;

const CREATIVE: f32 = 0.9;
const CONVERSATIONAL: f32 = 0.7;

/// Voices handed out to podcast speakers without an explicit choice.
const FALLBACK_VOICES: &[&str] = &["Algenib", "Kore", "Puck", "Achernar"];

const MARKETING_SYSTEM: &str = "Eres consultora de marketing para librerías independientes. \
Propones acciones concretas, medibles y baratas, adaptadas a la comunidad local.";

const PODCAST_SYSTEM: &str = "Escribes guiones de pódcast literario en español, con diálogo \
natural entre los presentadores y sin efectos de sonido ni acotaciones.";

const SOCIAL_SYSTEM: &str = "Eres community manager de una red de librerías. Escribes \
publicaciones breves, cercanas y adaptadas a cada red social.";

const GAME_SYSTEM: &str = "Diseñas juegos literarios para lectores. Cada pregunta tiene una sola \
respuesta correcta, que aparece literalmente entre las opciones.";

const READER_SYSTEM: &str = "Eres el asistente de lectura de Alicia Libros. Recomiendas solo \
libros del catálogo que se te proporciona, citando su id. Si nada encaja, dilo con franqueza.";

const LIBRARY_SYSTEM: &str = "Eres el asistente de gestión de Alicia Libros para libreros. \
Ayudas con inventario, eventos, promociones y atención al lector de forma práctica.";

pub async fn marketing_plan(
    model: &dyn GenerativeModel,
    input: &MarketingPlanRequest,
) -> GenAiResult<MarketingPlan> {
    let mut prompt = format!(
        "Crea un plan de marketing de {weeks} semanas para la librería \"{name}\".\n\
         Objetivo: {goal}\nPúblico: {audience}\n",
        weeks = input.weeks,
        name = input.library_name.trim(),
        goal = input.goal.trim(),
        audience = input.audience.trim(),
    );
    if let Some(budget) = input.budget.as_deref().filter(|b| !b.trim().is_empty()) {
        prompt.push_str(&format!("Presupuesto: {}\n", budget.trim()));
    }
    prompt.push_str("Incluye una entrada de calendario por semana.");

    let schema = object(&[
        ("summary", string()),
        ("objectives", array(string())),
        (
            "channels",
            array(object(&[("channel", string()), ("tactics", array(string()))])),
        ),
        (
            "timeline",
            array(object(&[
                ("week", integer()),
                ("focus", string()),
                ("actions", array(string())),
            ])),
        ),
        ("kpis", array(string())),
    ]);

    let request = TextRequest::new(prompt)
        .with_system(MARKETING_SYSTEM)
        .with_schema(schema)
        .with_temperature(CREATIVE);
    let mut plan: MarketingPlan = generate_structured(model, &request).await?;
    plan.timeline.sort_by_key(|week| week.week);
    Ok(plan)
}

pub async fn podcast_script(
    model: &dyn GenerativeModel,
    input: &PodcastScriptRequest,
) -> GenAiResult<PodcastScript> {
    let hosts: Vec<&str> = input.hosts.iter().map(|h| h.trim()).collect();
    let mut prompt = format!(
        "Escribe un guion de pódcast de unos {minutes} minutos sobre: {topic}.\n\
         Presentadores: {hosts}. Cada intervención indica en `speaker` exactamente uno de esos nombres.\n",
        minutes = input.minutes,
        topic = input.topic.trim(),
        hosts = hosts.join(", "),
    );
    if let Some(book) = input.book_title.as_deref().filter(|b| !b.trim().is_empty()) {
        prompt.push_str(&format!("El episodio gira en torno al libro \"{}\".\n", book.trim()));
    }

    let schema = object(&[
        ("title", string()),
        ("intro", string()),
        (
            "segments",
            array(object(&[("speaker", enumeration(&hosts)), ("text", string())])),
        ),
        ("outro", string()),
    ]);

    let request = TextRequest::new(prompt)
        .with_system(PODCAST_SYSTEM)
        .with_schema(schema)
        .with_temperature(CREATIVE);
    let script: PodcastScript = generate_structured(model, &request).await?;

    if let Some(stranger) = script
        .speakers()
        .into_iter()
        .find(|s| !hosts.contains(&s.as_str()))
    {
        return Err(GenAiError::InvalidOutput(format!(
            "script uses unknown speaker '{stranger}'"
        )));
    }
    Ok(script)
}

/// Pair every speaker with a voice, preferring the caller's picks.
pub fn assign_voices(speakers: &[String], requested: &[SpeakerVoice]) -> Vec<SpeakerVoice> {
    let mut fallback = FALLBACK_VOICES
        .iter()
        .filter(|voice| !requested.iter().any(|r| r.voice == **voice))
        .cycle();

    speakers
        .iter()
        .map(|speaker| {
            let voice = requested
                .iter()
                .find(|r| r.speaker.trim() == speaker)
                .map(|r| r.voice.clone())
                .or_else(|| fallback.next().map(|v| v.to_string()))
                .unwrap_or_else(|| FALLBACK_VOICES[0].to_string());
            SpeakerVoice {
                speaker: speaker.clone(),
                voice,
            }
        })
        .collect()
}

pub async fn podcast_audio(
    model: &dyn GenerativeModel,
    input: &PodcastAudioRequest,
) -> GenAiResult<AudioClip> {
    let voices = assign_voices(&input.script.speakers(), &input.voices);
    let voice = match voices.as_slice() {
        [single] => VoiceConfig::Single(single.voice.clone()),
        _ => VoiceConfig::MultiSpeaker(voices),
    };

    let pcm = model
        .synthesize_speech(&SpeechRequest {
            text: input.script.transcript(),
            voice,
        })
        .await?;
    AudioClip::from_pcm(&pcm)
}

pub async fn speak(model: &dyn GenerativeModel, text: &str, voice: &str) -> GenAiResult<AudioClip> {
    let pcm = model
        .synthesize_speech(&SpeechRequest {
            text: text.trim().to_string(),
            voice: VoiceConfig::Single(voice.to_string()),
        })
        .await?;
    AudioClip::from_pcm(&pcm)
}

pub async fn social_posts(
    model: &dyn GenerativeModel,
    input: &SocialPostsRequest,
) -> GenAiResult<SocialPosts> {
    let platforms: Vec<&str> = input.platforms.iter().map(|p| p.as_str()).collect();
    let tone = input
        .tone
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("cercano");
    let prompt = format!(
        "Escribe {count} publicaciones para cada una de estas redes: {platforms}.\n\
         Tema: {topic}\nTono: {tone}\n\
         Los hashtags van sin el símbolo # y no se repiten dentro del texto.",
        count = input.count,
        platforms = platforms.join(", "),
        topic = input.topic.trim(),
    );

    let schema = object(&[(
        "posts",
        array(object(&[
            ("platform", enumeration(&platforms)),
            ("text", string()),
            ("hashtags", array(string())),
        ])),
    )]);

    let request = TextRequest::new(prompt)
        .with_system(SOCIAL_SYSTEM)
        .with_schema(schema)
        .with_temperature(CREATIVE);
    let mut posts: SocialPosts = generate_structured(model, &request).await?;
    for post in &mut posts.posts {
        for tag in &mut post.hashtags {
            *tag = tag.trim().trim_start_matches('#').to_string();
        }
        post.hashtags.retain(|tag| !tag.is_empty());
    }
    Ok(posts)
}

pub async fn literary_game(
    model: &dyn GenerativeModel,
    input: &GameRequest,
) -> GenAiResult<LiteraryGame> {
    let kind = match input.kind {
        GameKind::Trivia => "una trivia literaria de opción múltiple",
        GameKind::GuessTheBook => {
            "un juego de adivinar el libro: cada pregunta da pistas y las opciones son títulos"
        }
        GameKind::CompleteTheQuote => {
            "un juego de completar la cita: cada pregunta es una cita famosa con un hueco"
        }
    };
    let difficulty = match input.difficulty {
        Difficulty::Easy => "fácil",
        Difficulty::Medium => "media",
        Difficulty::Hard => "difícil",
    };
    let prompt = format!(
        "Crea {kind} sobre {topic}, de dificultad {difficulty}, con {n} preguntas de cuatro opciones.",
        topic = input.topic.trim(),
        n = input.questions,
    );

    let schema = object(&[
        ("title", string()),
        ("instructions", string()),
        (
            "questions",
            array(object(&[
                ("prompt", string()),
                ("options", array(string())),
                ("answer", string()),
                ("explanation", string()),
            ])),
        ),
    ]);

    let request = TextRequest::new(prompt)
        .with_system(GAME_SYSTEM)
        .with_schema(schema)
        .with_temperature(CREATIVE);
    let mut game: LiteraryGame = generate_structured(model, &request).await?;

    let before = game.questions.len();
    game.questions
        .retain(|q| q.options.iter().any(|option| option.trim() == q.answer.trim()));
    if game.questions.len() < before {
        tracing::debug!(dropped = before - game.questions.len(), "dropped questions without a matching answer");
    }
    if game.questions.is_empty() {
        return Err(GenAiError::InvalidOutput("game has no answerable questions".into()));
    }
    Ok(game)
}

fn catalog_listing(catalog: &[Entity<Book>]) -> String {
    catalog
        .iter()
        .map(|book| {
            format!(
                "- id={} | {} | {} | {} | {:.2} €",
                book.id,
                book.title,
                book.author,
                book.genre.as_deref().unwrap_or("sin género"),
                book.price_cents as f64 / 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn library_profile(library: &Entity<Library>) -> String {
    format!(
        "Librería: {} ({}), {}. {}",
        library.name,
        library.city,
        library.address,
        library.description
    )
}

/// Answer a chat turn. Reader replies only recommend books present in `catalog`.
pub async fn chat(
    model: &dyn GenerativeModel,
    input: &ChatRequest,
    catalog: &[Entity<Book>],
    library: Option<&Entity<Library>>,
) -> GenAiResult<ChatReply> {
    let history = input.history[input.history.len().saturating_sub(HISTORY_LIMIT)..].to_vec();

    let (system, schema): (String, Value) = match input.assistant {
        AssistantKind::Reader => {
            let listing = if catalog.is_empty() {
                "(el catálogo está vacío)".to_string()
            } else {
                catalog_listing(catalog)
            };
            (
                format!("{READER_SYSTEM}\n\nCatálogo disponible:\n{listing}"),
                object(&[("reply", string()), ("book_ids", array(string()))]),
            )
        }
        AssistantKind::Library => {
            let mut system = LIBRARY_SYSTEM.to_string();
            if let Some(library) = library {
                system.push_str("\n\n");
                system.push_str(&library_profile(library));
            }
            (system, object(&[("reply", string())]))
        }
    };

    let request = TextRequest::new(input.message.trim())
        .with_system(system)
        .with_history(history)
        .with_schema(schema)
        .with_temperature(CONVERSATIONAL);
    let mut reply: ChatReply = generate_structured(model, &request).await?;

    let known = |id: &String| catalog.iter().any(|book| &book.id == id);
    reply.book_ids.retain(known);
    reply.book_ids.dedup();
    Ok(reply)
}

pub async fn cover_image(
    model: &dyn GenerativeModel,
    title: &str,
    description: &str,
    style: Option<&str>,
) -> GenAiResult<GeneratedImage> {
    let mut prompt = format!(
        "Portada de libro vertical para \"{}\". Sin texto ni letras en la imagen.",
        title.trim()
    );
    if !description.trim().is_empty() {
        prompt.push_str(&format!(" Trata de: {}.", description.trim()));
    }
    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(&format!(" Estilo: {style}."));
    }
    model.generate_image(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ai::models::{Platform, ScriptLine};
    use alicia_genai::testing::ScriptedModel;
    use alicia_genai::{Role, Turn};
    use chrono::Utc;

    fn book(id: &str, title: &str) -> Entity<Book> {
        let now = Utc::now();
        Entity {
            id: id.into(),
            data: Book {
                library_id: "lib-1".into(),
                title: title.into(),
                author: "Gabriela Mistral".into(),
                isbn: None,
                description: String::new(),
                genre: Some("poesía".into()),
                price_cents: 1_450,
                stock: 3,
                cover_url: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_marketing_plan_parses_fenced_output() {
        let model = ScriptedModel::new().reply(
            "```json\n{\"summary\": \"Club de lectura\", \"objectives\": [\"+20% visitas\"], \
             \"channels\": [{\"channel\": \"instagram\", \"tactics\": [\"reels\"]}], \
             \"timeline\": [{\"week\": 2, \"focus\": \"b\", \"actions\": []}, {\"week\": 1, \"focus\": \"a\", \"actions\": [\"x\"]}], \
             \"kpis\": [\"visitas\"]}\n```",
        );
        let input = MarketingPlanRequest {
            library_name: "La Buena Vida".into(),
            goal: "Atraer jóvenes".into(),
            audience: "Estudiantes".into(),
            weeks: 2,
            budget: Some("300 €".into()),
        };

        let plan = marketing_plan(&model, &input).await.unwrap();
        assert_eq!(plan.timeline[0].week, 1);

        let sent = &model.text_requests()[0];
        assert!(sent.prompt.contains("La Buena Vida"));
        assert!(sent.prompt.contains("300 €"));
        assert_eq!(sent.response_schema.as_ref().unwrap()["type"], "OBJECT");
    }

    #[tokio::test]
    async fn test_podcast_script_rejects_unknown_speaker() {
        let model = ScriptedModel::new().reply(
            r#"{"title": "t", "intro": "i", "segments": [{"speaker": "Pedro", "text": "hola"}], "outro": "o"}"#,
        );
        let input = PodcastScriptRequest {
            topic: "Cortázar".into(),
            book_title: None,
            hosts: vec!["Alicia".into(), "Mateo".into()],
            minutes: 5,
        };
        let err = podcast_script(&model, &input).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_podcast_audio_uses_two_voices() {
        let model = ScriptedModel::new();
        let input = PodcastAudioRequest {
            script: PodcastScript {
                title: "t".into(),
                intro: "Hola".into(),
                segments: vec![
                    ScriptLine {
                        speaker: "Alicia".into(),
                        text: "Uno".into(),
                    },
                    ScriptLine {
                        speaker: "Mateo".into(),
                        text: "Dos".into(),
                    },
                ],
                outro: "Adiós".into(),
            },
            voices: vec![SpeakerVoice {
                speaker: "Mateo".into(),
                voice: "Puck".into(),
            }],
        };

        let clip = podcast_audio(&model, &input).await.unwrap();
        assert!(clip.media.starts_with("data:audio/wav;base64,"));
        assert_eq!(clip.duration_ms, 250);

        let speech = &model.speech_requests()[0];
        match &speech.voice {
            VoiceConfig::MultiSpeaker(voices) => {
                assert_eq!(voices.len(), 2);
                assert_eq!(voices[0].voice, "Algenib");
                assert_eq!(voices[1].voice, "Puck");
            }
            other => panic!("expected two speakers, got {other:?}"),
        }
        assert!(speech.text.starts_with("Alicia: Hola"));
    }

    #[test]
    fn test_assign_voices_skips_taken_fallbacks() {
        let speakers = vec!["Ana".to_string(), "Leo".to_string()];
        let requested = vec![SpeakerVoice {
            speaker: "Leo".into(),
            voice: "Algenib".into(),
        }];
        let voices = assign_voices(&speakers, &requested);
        assert_eq!(voices[0].voice, "Kore");
        assert_eq!(voices[1].voice, "Algenib");
    }

    #[tokio::test]
    async fn test_social_posts_strip_hash_signs() {
        let model = ScriptedModel::new().reply(
            r##"{"posts": [{"platform": "instagram", "text": "¡Feria del libro!", "hashtags": ["#libros", " lectura ", "#"]}]}"##,
        );
        let input = SocialPostsRequest {
            topic: "Feria".into(),
            platforms: vec![Platform::Instagram],
            tone: None,
            count: 1,
        };
        let posts = social_posts(&model, &input).await.unwrap();
        assert_eq!(posts.posts[0].hashtags, vec!["libros", "lectura"]);
    }

    #[tokio::test]
    async fn test_game_drops_unanswerable_questions() {
        let model = ScriptedModel::new().reply(
            r#"{"title": "Trivia", "instructions": "Elige", "questions": [
                {"prompt": "¿Autor de Ficciones?", "options": ["Borges", "Sábato"], "answer": "Borges", "explanation": "1944"},
                {"prompt": "¿Año?", "options": ["1", "2"], "answer": "3", "explanation": ""}
            ]}"#,
        );
        let input = GameRequest {
            kind: GameKind::Trivia,
            topic: "Borges".into(),
            difficulty: Difficulty::Easy,
            questions: 2,
        };
        let game = literary_game(&model, &input).await.unwrap();
        assert_eq!(game.questions.len(), 1);
        assert_eq!(game.questions[0].answer, "Borges");
    }

    #[tokio::test]
    async fn test_reader_chat_keeps_only_catalog_ids() {
        let model = ScriptedModel::new()
            .reply(r#"{"reply": "Te recomiendo Desolación.", "book_ids": ["b1", "invented"]}"#);
        let catalog = vec![book("b1", "Desolación"), book("b2", "Ternura")];
        let input = ChatRequest {
            assistant: AssistantKind::Reader,
            history: vec![Turn {
                role: Role::User,
                text: "Busco poesía".into(),
            }],
            message: "¿Algo de Mistral?".into(),
            library_id: None,
        };

        let reply = chat(&model, &input, &catalog, None).await.unwrap();
        assert_eq!(reply.book_ids, vec!["b1"]);

        let sent = &model.text_requests()[0];
        assert!(sent.system.as_deref().unwrap().contains("id=b2"));
        assert_eq!(sent.history.len(), 1);
    }

    #[tokio::test]
    async fn test_library_chat_without_book_ids() {
        let model = ScriptedModel::new().reply(r#"{"reply": "Organiza una presentación."}"#);
        let input = ChatRequest {
            assistant: AssistantKind::Library,
            history: Vec::new(),
            message: "¿Cómo atraigo clientes?".into(),
            library_id: None,
        };
        let reply = chat(&model, &input, &[], None).await.unwrap();
        assert!(reply.book_ids.is_empty());
    }
}
