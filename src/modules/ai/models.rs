use alicia_genai::{SpeakerVoice, Turn};
use serde::{Deserialize, Serialize};

use crate::utils::validation::{Validator, NAME_MAX, TEXT_MAX, TITLE_MAX};

/// Longest conversation replayed to the model.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct MarketingPlanRequest {
    pub library_name: String,
    pub goal: String,
    pub audience: String,
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    pub budget: Option<String>,
}

fn default_weeks() -> u32 {
    4
}

impl MarketingPlanRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("library_name", &self.library_name, NAME_MAX)
            .required("goal", &self.goal, TEXT_MAX)
            .required("audience", &self.audience, TEXT_MAX)
            .optional("budget", self.budget.as_deref(), NAME_MAX)
            .check((1..=12).contains(&self.weeks), "weeks", "must be between 1 and 12");
        v
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStrategy {
    pub channel: String,
    pub tactics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWeek {
    pub week: u32,
    pub focus: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingPlan {
    pub summary: String,
    pub objectives: Vec<String>,
    pub channels: Vec<ChannelStrategy>,
    pub timeline: Vec<PlanWeek>,
    pub kpis: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodcastScriptRequest {
    pub topic: String,
    pub book_title: Option<String>,
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
}

fn default_hosts() -> Vec<String> {
    vec!["Alicia".to_string(), "Mateo".to_string()]
}

fn default_minutes() -> u32 {
    5
}

impl PodcastScriptRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("topic", &self.topic, TEXT_MAX)
            .optional("book_title", self.book_title.as_deref(), TITLE_MAX)
            .check(
                (1..=MAX_SPEAKERS).contains(&self.hosts.len()),
                "hosts",
                "must name one or two hosts",
            )
            .check(
                self.hosts.iter().all(|h| valid_speaker(h)),
                "hosts",
                "names must be short single words",
            )
            .check((1..=30).contains(&self.minutes), "minutes", "must be between 1 and 30");
        v
    }
}

/// The speech model voices at most two speakers per clip.
pub const MAX_SPEAKERS: usize = 2;

/// Speaker names prefix script lines (`Alicia: ...`), so no spaces or colons.
fn valid_speaker(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name.chars().count() <= 30
        && !name.contains(|c: char| c.is_whitespace() || c == ':')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastScript {
    pub title: String,
    pub intro: String,
    pub segments: Vec<ScriptLine>,
    pub outro: String,
}

impl PodcastScript {
    /// Distinct speakers in order of appearance.
    pub fn speakers(&self) -> Vec<String> {
        let mut speakers: Vec<String> = Vec::new();
        for line in &self.segments {
            let name = line.speaker.trim();
            if !speakers.iter().any(|s| s == name) {
                speakers.push(name.to_string());
            }
        }
        speakers
    }

    /// Speaker-tagged transcript; intro and outro go to the first speaker.
    pub fn transcript(&self) -> String {
        let first = self.speakers().into_iter().next().unwrap_or_default();
        let mut lines = Vec::with_capacity(self.segments.len() + 2);
        if !self.intro.trim().is_empty() {
            lines.push(format!("{first}: {}", self.intro.trim()));
        }
        for line in &self.segments {
            lines.push(format!("{}: {}", line.speaker.trim(), line.text.trim()));
        }
        if !self.outro.trim().is_empty() {
            lines.push(format!("{first}: {}", self.outro.trim()));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodcastAudioRequest {
    pub script: PodcastScript,
    #[serde(default)]
    pub voices: Vec<SpeakerVoice>,
}

impl PodcastAudioRequest {
    pub fn validate(&self) -> Validator {
        let speakers = self.script.speakers();
        let mut v = Validator::new();
        v.check(!self.script.segments.is_empty(), "script.segments", "required")
            .check(
                speakers.len() <= MAX_SPEAKERS,
                "script.segments",
                "must use at most two speakers",
            )
            .check(
                speakers.iter().all(|s| valid_speaker(s)),
                "script.segments",
                "speaker names must be short single words",
            )
            .check(
                self.script.transcript().chars().count() <= TEXT_MAX * 4,
                "script",
                "is too long to narrate",
            );
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    X,
    Tiktok,
    Linkedin,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::X => "x",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialPostsRequest {
    pub topic: String,
    pub platforms: Vec<Platform>,
    pub tone: Option<String>,
    #[serde(default = "default_post_count")]
    pub count: u32,
}

fn default_post_count() -> u32 {
    3
}

impl SocialPostsRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("topic", &self.topic, TEXT_MAX)
            .optional("tone", self.tone.as_deref(), NAME_MAX)
            .check(!self.platforms.is_empty(), "platforms", "required")
            .check((1..=10).contains(&self.count), "count", "must be between 1 and 10");
        v
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: Platform,
    pub text: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPosts {
    pub posts: Vec<SocialPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechInput {
    pub text: String,
    pub voice: Option<String>,
}

impl SpeechInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("text", &self.text, TEXT_MAX)
            .optional("voice", self.voice.as_deref(), 40);
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Trivia,
    GuessTheBook,
    CompleteTheQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameRequest {
    pub kind: GameKind,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_questions")]
    pub questions: u32,
}

fn default_questions() -> u32 {
    5
}

impl GameRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("topic", &self.topic, TITLE_MAX)
            .check((1..=15).contains(&self.questions), "questions", "must be between 1 and 15");
        v
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteraryGame {
    pub title: String,
    pub instructions: String,
    pub questions: Vec<GameQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantKind {
    /// Recommends books from the catalog.
    Reader,
    /// Helps bookstore staff run their shop.
    Library,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub assistant: AssistantKind,
    #[serde(default)]
    pub history: Vec<Turn>,
    pub message: String,
    /// Narrows the reader catalog, or names the library being helped.
    pub library_id: Option<String>,
}

impl ChatRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("message", &self.message, TEXT_MAX).check(
            self.history.iter().all(|t| t.text.chars().count() <= TEXT_MAX),
            "history",
            "messages must be at most 5000 characters",
        );
        v
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    /// Catalog books the reply recommends.
    #[serde(default)]
    pub book_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub style: Option<String>,
}

impl CoverRequest {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("title", &self.title, TITLE_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .optional("style", self.style.as_deref(), NAME_MAX);
        v
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCover {
    pub url: String,
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> PodcastScript {
        PodcastScript {
            title: "Voces del Sur".into(),
            intro: "Bienvenidos.".into(),
            segments: vec![
                ScriptLine {
                    speaker: "Alicia".into(),
                    text: "Hoy hablamos de Borges.".into(),
                },
                ScriptLine {
                    speaker: "Mateo".into(),
                    text: "Y de sus laberintos.".into(),
                },
                ScriptLine {
                    speaker: "Alicia".into(),
                    text: "Empecemos.".into(),
                },
            ],
            outro: "Hasta la próxima.".into(),
        }
    }

    #[test]
    fn test_script_speakers_in_order() {
        assert_eq!(script().speakers(), vec!["Alicia", "Mateo"]);
    }

    #[test]
    fn test_transcript_tags_every_line() {
        let transcript = script().transcript();
        let lines: Vec<&str> = transcript.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Alicia: Bienvenidos.");
        assert_eq!(lines[2], "Mateo: Y de sus laberintos.");
        assert_eq!(lines[4], "Alicia: Hasta la próxima.");
    }

    #[test]
    fn test_three_speakers_rejected() {
        let mut script = script();
        script.segments.push(ScriptLine {
            speaker: "Lucía".into(),
            text: "Hola.".into(),
        });
        let request = PodcastAudioRequest {
            script,
            voices: Vec::new(),
        };
        assert!(!request.validate().is_valid());
    }

    #[test]
    fn test_host_names_must_be_single_words() {
        let request = PodcastScriptRequest {
            topic: "Realismo mágico".into(),
            book_title: None,
            hosts: vec!["Ana María".into()],
            minutes: 5,
        };
        assert!(!request.validate().is_valid());
    }

    #[test]
    fn test_game_kind_wire_name() {
        let kind: GameKind = serde_json::from_str("\"complete_the_quote\"").unwrap();
        assert_eq!(kind, GameKind::CompleteTheQuote);
    }
}
