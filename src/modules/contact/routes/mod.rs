use alicia_db::{Entity, Query};
use alicia_http::ApiResult;
use alicia_kernel::AppContext;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use super::models::{ContactForm, ContactMessage, ContactReceipt, CONTACT_MESSAGES};
use crate::auth::CurrentUser;
use crate::utils::FormOrJson;

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_messages).post(submit))
        .with_state(app.clone())
}

async fn submit(
    State(app): State<AppContext>,
    FormOrJson(form): FormOrJson<ContactForm>,
) -> ApiResult<(StatusCode, Json<ContactReceipt>)> {
    form.validate().finish("invalid contact message")?;

    let stored = app
        .collection::<ContactMessage>(CONTACT_MESSAGES)
        .create(&form.into_message())
        .await?;
    tracing::info!(message_id = %stored.id, "contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactReceipt {
            id: stored.id,
            received: true,
        }),
    ))
}

async fn list_messages(
    State(app): State<AppContext>,
    caller: CurrentUser,
) -> ApiResult<Json<Vec<Entity<ContactMessage>>>> {
    caller.require_admin("read contact messages")?;
    let mut messages = app
        .collection::<ContactMessage>(CONTACT_MESSAGES)
        .list(&Query::new())
        .await?;
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(messages))
}
