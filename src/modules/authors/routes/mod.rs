use alicia_authz::Role;
use alicia_db::{run_transaction, Direction, Entity, Query, StoreError};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde_json::json;

use super::models::{Author, AuthorInput, AUTHORS};
use crate::auth::CurrentUser;
use crate::modules::users::models::USERS;
use crate::utils::upload::{read_file, IMAGE_TYPES};
use crate::utils::ValidJson;

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_authors).post(create_author))
        .route(
            "/{id}",
            get(get_author).put(update_author).delete(delete_author),
        )
        .route("/{id}/photo", post(upload_photo))
        .with_state(app.clone())
}

async fn list_authors(State(app): State<AppContext>) -> ApiResult<Json<Vec<Entity<Author>>>> {
    let query = Query::new().order_by("name", Direction::Ascending);
    Ok(Json(app.collection::<Author>(AUTHORS).list(&query).await?))
}

/// An author without a profile gets the new one linked to their account.
async fn create_author(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<AuthorInput>,
) -> ApiResult<(StatusCode, Json<Entity<Author>>)> {
    caller.require_role(&[Role::Author], "create author profiles")?;
    input.validate().finish("invalid author")?;

    let author = input.into_author();
    let link_to = (caller.role == Role::Author && caller.author_id.is_none())
        .then(|| caller.user_id.clone());

    let author_id = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let author = author.clone();
        let link_to = link_to.clone();
        async move {
            let id = tx.insert_record(AUTHORS, &author)?;
            if let Some(user_id) = link_to {
                tx.get(USERS, &user_id)
                    .await?
                    .ok_or_else(|| StoreError::not_found(USERS, &user_id))?;
                tx.update(USERS, &user_id, json!({"author_id": id}));
            }
            Ok::<_, StoreError>(id)
        }
        .boxed()
    })
    .await?;

    let created = app.collection::<Author>(AUTHORS).require(&author_id).await?;
    tracing::info!(author_id = %created.id, "author profile created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_author(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Author>>> {
    Ok(Json(app.collection::<Author>(AUTHORS).require(&id).await?))
}

async fn update_author(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<AuthorInput>,
) -> ApiResult<Json<Entity<Author>>> {
    caller.ensure_author(Some(&id), "edit this author profile")?;
    input.validate().finish("invalid author")?;

    let authors = app.collection::<Author>(AUTHORS);
    let current = authors.require(&id).await?;
    let mut author = input.into_author();
    if author.photo_url.is_none() {
        author.photo_url = current.photo_url.clone();
    }
    Ok(Json(authors.replace(&id, &author).await?))
}

async fn delete_author(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require_admin("delete author profiles")?;
    app.collection::<Author>(AUTHORS).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_photo(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<Author>>> {
    caller.ensure_author(Some(&id), "edit this author profile")?;
    let authors = app.collection::<Author>(AUTHORS);
    authors.require(&id).await?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", IMAGE_TYPES)?;
    let stored = file.store(&app, &["authors", &id]).await?;

    Ok(Json(authors.patch(&id, json!({"photo_url": stored.url})).await?))
}
