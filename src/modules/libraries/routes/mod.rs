use alicia_authz::Role;
use alicia_db::{run_transaction, Direction, Entity, Query, StoreError};
use alicia_http::{ApiResult, AppError};
use alicia_kernel::AppContext;
use axum::{
    extract::{Multipart, Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde_json::json;

use super::models::{Library, LibraryInput, LibraryListParams, LIBRARIES};
use crate::auth::CurrentUser;
use crate::modules::users::models::{User, USERS};
use crate::utils::upload::{read_file, IMAGE_TYPES};
use crate::utils::{non_empty, slugify, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_libraries).post(create_library))
        .route("/by-slug/{slug}", get(get_by_slug))
        .route(
            "/{id}",
            get(get_library).put(update_library).delete(delete_library),
        )
        .route("/{id}/image", post(upload_image))
        .with_state(app.clone())
}

fn to_record(input: LibraryInput, slug: String, owner_id: String) -> Library {
    Library {
        name: input.name.trim().to_string(),
        slug,
        description: input.description.trim().to_string(),
        address: input.address.trim().to_string(),
        city: input.city.trim().to_string(),
        phone: non_empty(input.phone),
        email: non_empty(input.email).map(|e| e.to_lowercase()),
        image_url: non_empty(input.image_url),
        owner_id,
    }
}

async fn slug_owner(app: &AppContext, slug: &str) -> ApiResult<Option<Entity<Library>>> {
    Ok(app
        .collection::<Library>(LIBRARIES)
        .list(&Query::new().eq("slug", slug).limit(1))
        .await?
        .into_iter()
        .next())
}

async fn list_libraries(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<LibraryListParams>,
) -> ApiResult<Json<Vec<Entity<Library>>>> {
    let query = Query::new()
        .eq_opt("city", non_empty(params.city))
        .order_by("name", Direction::Ascending);
    Ok(Json(app.collection::<Library>(LIBRARIES).list(&query).await?))
}

/// Library staff creating their first library become its staff.
async fn create_library(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<LibraryInput>,
) -> ApiResult<(StatusCode, Json<Entity<Library>>)> {
    caller.require_role(&[Role::Library], "create libraries")?;
    input.validate().finish("invalid library")?;

    let slug = slugify(&input.name);
    if slug.is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "name", "error": "must contain letters or digits"})],
            "invalid library",
        ));
    }
    if slug_owner(&app, &slug).await?.is_some() {
        return Err(AppError::conflict_with_code(
            "slug_taken",
            format!("a library named '{slug}' already exists"),
        ));
    }

    let record = to_record(input, slug, caller.user_id.clone());
    let link_owner = caller.role == Role::Library && caller.library_id.is_none();
    let owner_id = caller.user_id.clone();

    let library_id = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let record = record.clone();
        let owner_id = owner_id.clone();
        async move {
            let id = tx.insert_record(LIBRARIES, &record)?;
            if link_owner {
                tx.require::<User>(USERS, &owner_id).await?;
                tx.update(USERS, &owner_id, json!({"library_id": id}));
            }
            Ok::<_, StoreError>(id)
        }
        .boxed()
    })
    .await?;

    let created = app.collection::<Library>(LIBRARIES).require(&library_id).await?;
    tracing::info!(library_id = %created.id, slug = %created.slug, "library created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_library(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Library>>> {
    Ok(Json(app.collection::<Library>(LIBRARIES).require(&id).await?))
}

async fn get_by_slug(
    State(app): State<AppContext>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Entity<Library>>> {
    slug_owner(&app, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("library '{slug}' not found")))
}

async fn update_library(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<LibraryInput>,
) -> ApiResult<Json<Entity<Library>>> {
    caller.ensure_library_staff(&id, "edit this library")?;
    input.validate().finish("invalid library")?;

    let libraries = app.collection::<Library>(LIBRARIES);
    let current = libraries.require(&id).await?;

    let slug = slugify(&input.name);
    if slug != current.slug {
        if slug.is_empty() {
            return Err(AppError::validation(
                vec![json!({"field": "name", "error": "must contain letters or digits"})],
                "invalid library",
            ));
        }
        if slug_owner(&app, &slug).await?.is_some_and(|other| other.id != id) {
            return Err(AppError::conflict_with_code(
                "slug_taken",
                format!("a library named '{slug}' already exists"),
            ));
        }
    }

    let mut record = to_record(input, slug, current.owner_id.clone());
    if record.image_url.is_none() {
        record.image_url = current.image_url.clone();
    }
    Ok(Json(libraries.replace(&id, &record).await?))
}

async fn delete_library(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require_admin("delete libraries")?;
    app.collection::<Library>(LIBRARIES).delete(&id).await?;
    tracing::info!(library_id = %id, "library deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<Library>>> {
    caller.ensure_library_staff(&id, "edit this library")?;
    let libraries = app.collection::<Library>(LIBRARIES);
    libraries.require(&id).await?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", IMAGE_TYPES)?;
    let stored = file.store(&app, &["libraries", &id]).await?;

    Ok(Json(
        libraries
            .patch(&id, json!({"image_url": stored.url}))
            .await?,
    ))
}
