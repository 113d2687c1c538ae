use alicia_authz::Role;
use alicia_db::{Entity, Query};
use alicia_http::{ApiResult, AppError};
use alicia_kernel::AppContext;
use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::models::{CheckoutRequest, Order, OrderListParams, StatusUpdate, ORDERS};
use crate::auth::CurrentUser;
use crate::modules::loyalty::ledger;
use crate::utils::{non_empty, ValidJson};

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/{id}", get(get_order))
        .route("/{id}/status", post(update_status))
        .with_state(app.clone())
}

async fn place_order(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(request): ValidJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Entity<Order>>)> {
    let order = ledger::checkout(&app, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Readers see their orders, library staff their library's, admins everything.
async fn list_orders(
    State(app): State<AppContext>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<OrderListParams>,
) -> ApiResult<Json<Vec<Entity<Order>>>> {
    let user_id = non_empty(params.user_id);
    let query = if caller.is_admin() {
        Query::new()
            .eq_opt("user_id", user_id)
            .eq_opt("library_id", non_empty(params.library_id))
    } else if caller.role == Role::Library {
        let Some(library_id) = caller.library_id.clone() else {
            return Err(AppError::forbidden("no library is linked to this account"));
        };
        Query::new()
            .eq("library_id", library_id)
            .eq_opt("user_id", user_id)
    } else {
        Query::new().eq("user_id", caller.user_id.clone())
    };

    let query = query.eq_opt("status", params.status.map(|s| s.as_str()));
    let mut orders = app.collection::<Order>(ORDERS).list(&query).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(orders))
}

async fn get_order(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<Order>>> {
    let order = app.collection::<Order>(ORDERS).require(&id).await?;
    if order.user_id != caller.user_id {
        caller.ensure_library_staff(&order.library_id, "read this order")?;
    }
    Ok(Json(order))
}

async fn update_status(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(update): ValidJson<StatusUpdate>,
) -> ApiResult<Json<Entity<Order>>> {
    Ok(Json(
        ledger::change_order_status(&app, &caller, &id, update).await?,
    ))
}
