use alicia_db::{run_transaction, Direction, Entity, FilterOp, Query, StoreError};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Multipart, Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde_json::json;

use super::models::{
    Book, BookInput, BookListParams, BulkResult, BulkUpload, BOOKS, BULK_LIMIT,
};
use crate::auth::CurrentUser;
use crate::modules::libraries::models::{Library, LIBRARIES};
use crate::utils::upload::{read_file, IMAGE_TYPES};
use crate::utils::{non_empty, ValidJson, Validator};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/bulk", post(bulk_upload))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .route("/{id}/cover", post(upload_cover))
        .with_state(app.clone())
}

async fn list_books(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<BookListParams>,
) -> ApiResult<Json<Vec<Entity<Book>>>> {
    let mut query = Query::new()
        .eq_opt("library_id", non_empty(params.library_id))
        .eq_opt("genre", non_empty(params.genre))
        .eq_opt("author", non_empty(params.author))
        .order_by("title", Direction::Ascending);
    if params.in_stock == Some(true) {
        query = query.filter("stock", FilterOp::Gt, 0);
    }

    let mut books = app.collection::<Book>(BOOKS).list(&query).await?;
    if let Some(needle) = non_empty(params.q).map(|q| q.to_lowercase()) {
        books.retain(|book| {
            book.title.to_lowercase().contains(&needle) || book.author.to_lowercase().contains(&needle)
        });
    }
    if let Some(limit) = params.limit {
        books.truncate(limit);
    }
    Ok(Json(books))
}

async fn create_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<BookInput>,
) -> ApiResult<(StatusCode, Json<Entity<Book>>)> {
    caller.ensure_library_staff(&input.library_id, "add books to this library")?;

    let mut v = Validator::new();
    input.fields.validate_into(&mut v, "");
    v.finish("invalid book")?;

    app.collection::<Library>(LIBRARIES)
        .require(&input.library_id)
        .await?;

    let book = input.fields.into_book(input.library_id);
    let created = app.collection::<Book>(BOOKS).create(&book).await?;
    tracing::info!(book_id = %created.id, library_id = %created.library_id, "book created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// All rows are validated first; nothing is written unless every row is valid.
async fn bulk_upload(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(upload): ValidJson<BulkUpload>,
) -> ApiResult<(StatusCode, Json<BulkResult>)> {
    caller.ensure_library_staff(&upload.library_id, "add books to this library")?;

    let mut v = Validator::new();
    v.check(!upload.books.is_empty(), "books", "must contain at least one book")
        .check(
            upload.books.len() <= BULK_LIMIT,
            "books",
            &format!("at most {BULK_LIMIT} books per upload"),
        );
    for (index, row) in upload.books.iter().enumerate() {
        row.validate_into(&mut v, &format!("books[{index}]."));
    }
    v.finish("invalid bulk upload")?;

    app.collection::<Library>(LIBRARIES)
        .require(&upload.library_id)
        .await?;

    let library_id = upload.library_id;
    let books: Vec<Book> = upload
        .books
        .into_iter()
        .map(|row| row.into_book(library_id.clone()))
        .collect();

    let ids = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let books = books.clone();
        async move {
            books
                .iter()
                .map(|book| tx.insert_record(BOOKS, book))
                .collect::<Result<Vec<_>, StoreError>>()
        }
        .boxed()
    })
    .await?;

    tracing::info!(%library_id, created = ids.len(), "bulk book upload");
    Ok((
        StatusCode::CREATED,
        Json(BulkResult {
            created: ids.len(),
            ids,
        }),
    ))
}

async fn get_book(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Book>>> {
    Ok(Json(app.collection::<Book>(BOOKS).require(&id).await?))
}

/// The owning library never changes.
async fn update_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<BookInput>,
) -> ApiResult<Json<Entity<Book>>> {
    let books = app.collection::<Book>(BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "edit this book")?;

    let mut v = Validator::new();
    input.fields.validate_into(&mut v, "");
    v.check(
        input.library_id == current.library_id,
        "library_id",
        "cannot move a book to another library",
    );
    v.finish("invalid book")?;

    let mut book = input.fields.into_book(current.library_id.clone());
    if book.cover_url.is_none() {
        book.cover_url = current.cover_url.clone();
    }
    Ok(Json(books.replace(&id, &book).await?))
}

async fn delete_book(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let books = app.collection::<Book>(BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "delete this book")?;

    books.delete(&id).await?;
    tracing::info!(book_id = %id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_cover(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Entity<Book>>> {
    let books = app.collection::<Book>(BOOKS);
    let current = books.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "edit this book")?;

    let file = read_file(multipart, "file").await?;
    file.require_type("file", IMAGE_TYPES)?;
    let stored = file.store(&app, &["books", &id]).await?;

    Ok(Json(books.patch(&id, json!({"cover_url": stored.url})).await?))
}
