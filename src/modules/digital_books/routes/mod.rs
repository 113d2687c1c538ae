use alicia_authz::Role;
use alicia_db::{Direction, Entity, Query};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Multipart, Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::models::{DigitalBook, DigitalBookInput, DigitalBookListParams, DIGITAL_BOOKS};
use crate::auth::CurrentUser;
use crate::modules::authors::models::{Author, AUTHORS};
use crate::utils::upload::{read_file, IMAGE_TYPES};
use crate::utils::{non_empty, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_digital_books).post(create_digital_book))
        .route(
            "/{id}",
            get(get_digital_book)
                .put(update_digital_book)
                .delete(delete_digital_book),
        )
        .route("/{id}/cover", post(upload_cover))
        .route("/{id}/file", post(upload_file))
        .with_state(app.clone())
}

async fn list_digital_books(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<DigitalBookListParams>,
) -> ApiResult<Json<Vec<Entity<DigitalBook>>>> {
    let mut query = Query::new()
        .eq_opt("format", params.format.map(|f| f.as_str()))
        .eq_opt("author_id", non_empty(params.author_id))
        .order_by("title", Direction::Ascending);
    if params.free == Some(true) {
        query = query.eq("price_cents", 0);
    }
    Ok(Json(
        app.collection::<DigitalBook>(DIGITAL_BOOKS)
            .list(&query)
            .await?,
    ))
}

/// Authors publish under their own profile; admins may attribute freely.
fn attributed_author(caller: &CurrentUser, requested: Option<String>) -> Option<String> {
    if caller.role == Role::Author {
        caller.author_id.clone()
    } else {
        non_empty(requested)
    }
}

async fn create_digital_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<DigitalBookInput>,
) -> ApiResult<(StatusCode, Json<Entity<DigitalBook>>)> {
    caller.require_role(&[Role::Author], "publish digital books")?;
    input.validate().finish("invalid digital book")?;

    let author_id = attributed_author(&caller, input.author_id.clone());
    if let Some(author_id) = &author_id {
        app.collection::<Author>(AUTHORS).require(author_id).await?;
    }

    let record = input.into_record(author_id, None);
    let created = app
        .collection::<DigitalBook>(DIGITAL_BOOKS)
        .create(&record)
        .await?;
    tracing::info!(digital_book_id = %created.id, format = created.format.as_str(), "digital book created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_digital_book(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<DigitalBook>>> {
    Ok(Json(
        app.collection::<DigitalBook>(DIGITAL_BOOKS)
            .require(&id)
            .await?,
    ))
}

async fn update_digital_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<DigitalBookInput>,
) -> ApiResult<Json<Entity<DigitalBook>>> {
    let books = app.collection::<DigitalBook>(DIGITAL_BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_author(current.author_id.as_deref(), "edit this digital book")?;
    input.validate().finish("invalid digital book")?;

    let author_id = if caller.is_admin() {
        non_empty(input.author_id.clone())
    } else {
        current.author_id.clone()
    };
    if let Some(author_id) = &author_id {
        app.collection::<Author>(AUTHORS).require(author_id).await?;
    }

    // a format change invalidates the uploaded file
    let file_url = if input.format == current.format {
        current.file_url.clone()
    } else {
        None
    };
    let mut record = input.into_record(author_id, file_url);
    if record.cover_url.is_none() {
        record.cover_url = current.cover_url.clone();
    }
    Ok(Json(books.replace(&id, &record).await?))
}

async fn delete_digital_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let books = app.collection::<DigitalBook>(DIGITAL_BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_author(current.author_id.as_deref(), "delete this digital book")?;

    books.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_cover(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<DigitalBook>>> {
    let books = app.collection::<DigitalBook>(DIGITAL_BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_author(current.author_id.as_deref(), "edit this digital book")?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", IMAGE_TYPES)?;
    let stored = file.store(&app, &["digital_books", &id, "cover"]).await?;

    Ok(Json(books.patch(&id, json!({"cover_url": stored.url})).await?))
}

async fn upload_file(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<DigitalBook>>> {
    let books = app.collection::<DigitalBook>(DIGITAL_BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_author(current.author_id.as_deref(), "edit this digital book")?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", current.format.content_types())?;
    let stored = file.store(&app, &["digital_books", &id, "file"]).await?;

    Ok(Json(books.patch(&id, json!({"file_url": stored.url})).await?))
}
