use alicia_db::{Direction, Entity, FilterOp, Query};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Multipart, Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use super::models::{Event, EventInput, EventListParams, EVENTS};
use crate::auth::CurrentUser;
use crate::modules::libraries::models::{Library, LIBRARIES};
use crate::utils::upload::{read_file, IMAGE_TYPES};
use crate::utils::{non_empty, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/{id}", get(get_event).put(update_event).delete(delete_event))
        .route("/{id}/image", post(upload_image))
        .with_state(app.clone())
}

async fn list_events(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<EventListParams>,
) -> ApiResult<Json<Vec<Entity<Event>>>> {
    let mut query = Query::new()
        .eq_opt("library_id", non_empty(params.library_id))
        .order_by("starts_at", Direction::Ascending);
    if params.upcoming == Some(true) {
        query = query.filter("ends_at", FilterOp::Gte, Utc::now().to_rfc3339());
    }
    Ok(Json(app.collection::<Event>(EVENTS).list(&query).await?))
}

async fn create_event(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<EventInput>,
) -> ApiResult<(StatusCode, Json<Entity<Event>>)> {
    caller.ensure_library_staff(&input.library_id, "schedule events for this library")?;
    input.validate().finish("invalid event")?;
    app.collection::<Library>(LIBRARIES)
        .require(&input.library_id)
        .await?;

    let created = app
        .collection::<Event>(EVENTS)
        .create(&input.into_event())
        .await?;
    tracing::info!(event_id = %created.id, library_id = %created.library_id, "event created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_event(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Event>>> {
    Ok(Json(app.collection::<Event>(EVENTS).require(&id).await?))
}

async fn update_event(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<EventInput>,
) -> ApiResult<Json<Entity<Event>>> {
    let events = app.collection::<Event>(EVENTS);
    let current = events.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "edit this event")?;

    let mut v = input.validate();
    v.check(
        input.library_id == current.library_id,
        "library_id",
        "cannot move an event to another library",
    );
    v.finish("invalid event")?;

    let mut event = input.into_event();
    if event.image_url.is_none() {
        event.image_url = current.image_url.clone();
    }
    Ok(Json(events.replace(&id, &event).await?))
}

async fn delete_event(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let events = app.collection::<Event>(EVENTS);
    let current = events.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "cancel this event")?;

    events.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<Event>>> {
    let events = app.collection::<Event>(EVENTS);
    let current = events.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "edit this event")?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", IMAGE_TYPES)?;
    let stored = file.store(&app, &["events", &id]).await?;

    Ok(Json(events.patch(&id, json!({"image_url": stored.url})).await?))
}
