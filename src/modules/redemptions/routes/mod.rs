use alicia_db::{Direction, Entity, Query};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::models::{
    ItemListParams, RedeemRequest, Redemption, RedemptionItem, RedemptionItemInput,
    RedemptionListParams, RedemptionStatusUpdate, REDEMPTIONS, REDEMPTION_ITEMS,
};
use crate::auth::CurrentUser;
use crate::modules::loyalty::ledger;
use crate::utils::{non_empty, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_redemptions).post(redeem))
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/{id}", get(get_redemption))
        .route("/{id}/status", post(update_status))
        .with_state(app.clone())
}

async fn list_items(
    State(app): State<AppContext>,
    QueryParams(params): QueryParams<ItemListParams>,
) -> ApiResult<Json<Vec<Entity<RedemptionItem>>>> {
    let query = Query::new()
        .eq_opt("active", params.active)
        .order_by("points_cost", Direction::Ascending);
    Ok(Json(
        app.collection::<RedemptionItem>(REDEMPTION_ITEMS)
            .list(&query)
            .await?,
    ))
}

async fn create_item(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(input): ValidJson<RedemptionItemInput>,
) -> ApiResult<(StatusCode, Json<Entity<RedemptionItem>>)> {
    caller.require_admin("manage rewards")?;
    input.validate().finish("invalid reward")?;

    let created = app
        .collection::<RedemptionItem>(REDEMPTION_ITEMS)
        .create(&input.into_item())
        .await?;
    tracing::info!(item_id = %created.id, points_cost = created.points_cost, "reward created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_item(
    State(app): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<RedemptionItem>>> {
    Ok(Json(
        app.collection::<RedemptionItem>(REDEMPTION_ITEMS)
            .require(&id)
            .await?,
    ))
}

async fn update_item(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<RedemptionItemInput>,
) -> ApiResult<Json<Entity<RedemptionItem>>> {
    caller.require_admin("manage rewards")?;
    input.validate().finish("invalid reward")?;

    Ok(Json(
        app.collection::<RedemptionItem>(REDEMPTION_ITEMS)
            .replace(&id, &input.into_item())
            .await?,
    ))
}

/// Past redemptions keep their item name, so items can go.
async fn delete_item(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require_admin("manage rewards")?;
    app.collection::<RedemptionItem>(REDEMPTION_ITEMS)
        .delete(&id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn redeem(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(request): ValidJson<RedeemRequest>,
) -> ApiResult<(StatusCode, Json<Entity<Redemption>>)> {
    let redemption = ledger::redeem(&app, &caller, &request.item_id).await?;
    Ok((StatusCode::CREATED, Json(redemption)))
}

async fn list_redemptions(
    State(app): State<AppContext>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<RedemptionListParams>,
) -> ApiResult<Json<Vec<Entity<Redemption>>>> {
    let user_id = if caller.is_admin() {
        non_empty(params.user_id)
    } else {
        Some(caller.user_id.clone())
    };
    let query = Query::new()
        .eq_opt("user_id", user_id)
        .eq_opt("status", params.status.map(|s| s.as_str()));

    let mut redemptions = app
        .collection::<Redemption>(REDEMPTIONS)
        .list(&query)
        .await?;
    redemptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(redemptions))
}

async fn get_redemption(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Redemption>>> {
    let redemption = app
        .collection::<Redemption>(REDEMPTIONS)
        .require(&id)
        .await?;
    caller.ensure_self(&redemption.user_id, "read this redemption")?;
    Ok(Json(redemption))
}

async fn update_status(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(update): ValidJson<RedemptionStatusUpdate>,
) -> ApiResult<Json<Entity<Redemption>>> {
    Ok(Json(
        ledger::change_redemption_status(&app, &caller, &id, update.status).await?,
    ))
}
