use std::sync::Arc;

use alicia_authz::Role;
use alicia_db::{new_id, Direction, Entity, FilterOp, Query};
use alicia_genai::{AudioClip, GenerativeModel};
use alicia_http::{ApiResult, AppError};
use alicia_kernel::AppContext;
use alicia_storage::object_key;
use axum::{extract::State, routing::post, Json, Router};

use super::flows;
use super::models::{
    AssistantKind, ChatReply, ChatRequest, CoverRequest, GameRequest, GeneratedCover,
    LiteraryGame, MarketingPlan, MarketingPlanRequest, PodcastAudioRequest, PodcastScript,
    PodcastScriptRequest, SocialPosts, SocialPostsRequest, SpeechInput,
};
use crate::auth::CurrentUser;
use crate::modules::books::models::{Book, BOOKS};
use crate::modules::libraries::models::{Library, LIBRARIES};
use crate::utils::{non_empty, ValidJson};

/// Books shown to the reader assistant.
const CATALOG_LIMIT: usize = 200;

/// Roles that produce promotional content.
const CREATORS: &[Role] = &[Role::Library, Role::Author];

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/marketing-plan", post(marketing_plan))
        .route("/podcast-script", post(podcast_script))
        .route("/podcast-audio", post(podcast_audio))
        .route("/social-posts", post(social_posts))
        .route("/text-to-speech", post(text_to_speech))
        .route("/literary-game", post(literary_game))
        .route("/chat", post(chat))
        .route("/cover-image", post(cover_image))
        .with_state(app.clone())
}

fn model(app: &AppContext) -> ApiResult<Arc<dyn GenerativeModel>> {
    app.ai
        .clone()
        .ok_or_else(|| AppError::unavailable("generative AI is not configured"))
}

async fn marketing_plan(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<MarketingPlanRequest>,
) -> ApiResult<Json<MarketingPlan>> {
    caller.require_role(CREATORS, "generate marketing plans")?;
    input.validate().finish("invalid marketing plan request")?;
    let model = model(&app)?;
    Ok(Json(flows::marketing_plan(model.as_ref(), &input).await?))
}

async fn podcast_script(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<PodcastScriptRequest>,
) -> ApiResult<Json<PodcastScript>> {
    caller.require_role(CREATORS, "write podcast scripts")?;
    input.validate().finish("invalid podcast request")?;
    let model = model(&app)?;
    Ok(Json(flows::podcast_script(model.as_ref(), &input).await?))
}

async fn podcast_audio(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<PodcastAudioRequest>,
) -> ApiResult<Json<AudioClip>> {
    caller.require_role(CREATORS, "record podcasts")?;
    input.validate().finish("invalid podcast script")?;
    let model = model(&app)?;

    let clip = flows::podcast_audio(model.as_ref(), &input).await?;
    tracing::info!(user_id = %caller.user_id, duration_ms = clip.duration_ms, "podcast audio generated");
    Ok(Json(clip))
}

async fn social_posts(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<SocialPostsRequest>,
) -> ApiResult<Json<SocialPosts>> {
    caller.require_role(CREATORS, "generate social posts")?;
    input.validate().finish("invalid social posts request")?;
    let model = model(&app)?;
    Ok(Json(flows::social_posts(model.as_ref(), &input).await?))
}

async fn text_to_speech(
    State(app): State<AppContext>,
    _caller: CurrentUser,
    ValidJson(input): ValidJson<SpeechInput>,
) -> ApiResult<Json<AudioClip>> {
    input.validate().finish("invalid speech request")?;
    let model = model(&app)?;

    let voice = non_empty(input.voice.clone())
        .unwrap_or_else(|| app.settings.genai.default_voice.clone());
    Ok(Json(flows::speak(model.as_ref(), &input.text, &voice).await?))
}

async fn literary_game(
    State(app): State<AppContext>,
    _caller: CurrentUser,
    ValidJson(input): ValidJson<GameRequest>,
) -> ApiResult<Json<LiteraryGame>> {
    input.validate().finish("invalid game request")?;
    let model = model(&app)?;
    Ok(Json(flows::literary_game(model.as_ref(), &input).await?))
}

/// In-stock books, optionally of one library, for grounding recommendations.
async fn catalog(app: &AppContext, library_id: Option<String>) -> ApiResult<Vec<Entity<Book>>> {
    let query = Query::new()
        .eq_opt("library_id", library_id)
        .filter("stock", FilterOp::Gt, 0)
        .order_by("title", Direction::Ascending)
        .limit(CATALOG_LIMIT);
    Ok(app.collection::<Book>(BOOKS).list(&query).await?)
}

async fn chat(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    input.validate().finish("invalid chat message")?;
    let model = model(&app)?;
    let library_id = non_empty(input.library_id.clone());

    let reply = match input.assistant {
        AssistantKind::Reader => {
            let books = catalog(&app, library_id).await?;
            flows::chat(model.as_ref(), &input, &books, None).await?
        }
        AssistantKind::Library => {
            caller.require_role(&[Role::Library], "use the library assistant")?;
            let library = match library_id.or_else(|| caller.library_id.clone()) {
                Some(id) => {
                    caller.ensure_library_staff(&id, "use the assistant for this library")?;
                    Some(app.collection::<Library>(LIBRARIES).require(&id).await?)
                }
                None => None,
            };
            flows::chat(model.as_ref(), &input, &[], library.as_ref()).await?
        }
    };
    Ok(Json(reply))
}

async fn cover_image(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<CoverRequest>,
) -> ApiResult<Json<GeneratedCover>> {
    caller.require_role(CREATORS, "generate covers")?;
    input.validate().finish("invalid cover request")?;
    let model = model(&app)?;

    let image = flows::cover_image(
        model.as_ref(),
        &input.title,
        &input.description,
        input.style.as_deref(),
    )
    .await?;

    let file_name = format!("{}.{}", new_id(), image.extension());
    let key = object_key(&["generated", "covers"], &file_name);
    let stored = app
        .blobs
        .upload(&key, &image.bytes, &image.mime_type)
        .await?;
    tracing::info!(user_id = %caller.user_id, path = %stored.path, size = stored.size, "cover generated");

    Ok(Json(GeneratedCover {
        url: stored.url,
        path: stored.path,
        content_type: stored.content_type,
        size: stored.size,
    }))
}
