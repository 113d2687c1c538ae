use alicia_db::{Direction, Entity, FilterOp, Query};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use super::models::{Promotion, PromotionInput, PromotionListParams, PROMOTIONS};
use crate::auth::CurrentUser;
use crate::modules::libraries::models::{Library, LIBRARIES};
use crate::utils::{non_empty, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route(
            "/{id}",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
        .with_state(app.clone())
}

async fn list_promotions(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<PromotionListParams>,
) -> ApiResult<Json<Vec<Entity<Promotion>>>> {
    let mut query = Query::new()
        .eq_opt("library_id", non_empty(params.library_id))
        .order_by("ends_at", Direction::Ascending);
    if params.active == Some(true) {
        let now = Utc::now().to_rfc3339();
        query = query
            .eq("active", true)
            .filter("starts_at", FilterOp::Lte, now.clone())
            .filter("ends_at", FilterOp::Gte, now);
    }
    Ok(Json(
        app.collection::<Promotion>(PROMOTIONS)
            .list(&query)
            .await?,
    ))
}

async fn create_promotion(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<PromotionInput>,
) -> ApiResult<(StatusCode, Json<Entity<Promotion>>)> {
    caller.ensure_library_staff(&input.library_id, "run promotions for this library")?;
    input.validate().finish("invalid promotion")?;
    app.collection::<Library>(LIBRARIES)
        .require(&input.library_id)
        .await?;

    let created = app
        .collection::<Promotion>(PROMOTIONS)
        .create(&input.into_promotion())
        .await?;
    tracing::info!(promotion_id = %created.id, library_id = %created.library_id, "promotion created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_promotion(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Promotion>>> {
    Ok(Json(
        app.collection::<Promotion>(PROMOTIONS)
            .require(&id)
            .await?,
    ))
}

async fn update_promotion(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<PromotionInput>,
) -> ApiResult<Json<Entity<Promotion>>> {
    let promotions = app.collection::<Promotion>(PROMOTIONS);
    let current = promotions.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "edit this promotion")?;

    let mut v = input.validate();
    v.check(
        input.library_id == current.library_id,
        "library_id",
        "cannot move a promotion to another library",
    );
    v.finish("invalid promotion")?;

    Ok(Json(promotions.replace(&id, &input.into_promotion()).await?))
}

async fn delete_promotion(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let promotions = app.collection::<Promotion>(PROMOTIONS);
    let current = promotions.require(&id).await?;
    caller.ensure_library_staff(&current.library_id, "delete this promotion")?;

    promotions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
