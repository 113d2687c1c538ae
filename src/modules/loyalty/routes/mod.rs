use alicia_http::ApiResult;
use alicia_kernel::settings::LoyaltySettings;
use alicia_kernel::AppContext;
use axum::{
    extract::{Path, Query as QueryParams, State},
    routing::{get, post},
    Json, Router,
};

use super::ledger::{self, PricedCart};
use super::models::{AdjustRequest, HistoryParams, PointsSummary};
use crate::auth::CurrentUser;
use crate::modules::orders::models::CheckoutRequest;
use crate::modules::users::models::{User, USERS};
use crate::utils::ValidJson;

const DEFAULT_HISTORY: usize = 50;
const MAX_HISTORY: usize = 500;

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/rules", get(rules))
        .route("/quote", post(quote))
        .route("/users/{id}", get(summary))
        .route("/users/{id}/adjust", post(adjust))
        .with_state(app.clone())
}

async fn rules(State(app): State<AppContext>) -> Json<LoyaltySettings> {
    Json(app.settings.loyalty.clone())
}

/// Price a cart for the caller without placing the order.
async fn quote(
    State(app): State<AppContext>,
    caller: CurrentUser,
    ValidJson(request): ValidJson<CheckoutRequest>,
) -> ApiResult<Json<PricedCart>> {
    Ok(Json(ledger::quote(&app, &caller.user_id, &request).await?))
}

async fn load_summary(app: &AppContext, user_id: &str, limit: usize) -> ApiResult<PointsSummary> {
    let user = app.collection::<User>(USERS).require(user_id).await?;
    let entries = ledger::history(app, user_id, limit).await?;
    Ok(PointsSummary {
        user_id: user.id,
        balance: user.data.loyalty_points,
        entries,
    })
}

async fn summary(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<HistoryParams>,
) -> ApiResult<Json<PointsSummary>> {
    caller.ensure_self(&id, "read these points")?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
    Ok(Json(load_summary(&app, &id, limit).await?))
}

async fn adjust(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<AdjustRequest>,
) -> ApiResult<Json<PointsSummary>> {
    ledger::adjust(&app, &caller, &id, request).await?;
    Ok(Json(load_summary(&app, &id, DEFAULT_HISTORY).await?))
}
