use alicia_authz::Role;
use alicia_db::{run_transaction, Direction, Entity, Query};
use alicia_http::{ApiResult, AppError};
use alicia_kernel::AppContext;
use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use futures::FutureExt;
use serde_json::{json, Map, Value};

use super::models::{ProfileUpdate, RoleAssignment, SignUp, User, UserListParams, USERS};
use crate::auth::{caller_id, CurrentUser};
use crate::utils::ValidJson;

pub fn router(app: &AppContext) -> Router {
    Router::new()
        .route("/", get(list_users).post(sign_up))
        .route("/me", get(me))
        .route("/{id}", get(get_user).patch(update_profile))
        .route("/{id}/role", put(assign_role))
        .with_state(app.clone())
}

async fn email_taken(app: &AppContext, email: &str, except: Option<&str>) -> ApiResult<bool> {
    let found = app
        .collection::<User>(USERS)
        .list(&Query::new().eq("email", email).limit(2))
        .await?;
    Ok(found.iter().any(|user| Some(user.id.as_str()) != except))
}

/// The proxy-issued id becomes the account id when present.
async fn sign_up(
    State(app): State<AppContext>,
    headers: HeaderMap,
    ValidJson(req): ValidJson<SignUp>,
) -> ApiResult<(StatusCode, Json<Entity<User>>)> {
    req.validate().finish("invalid sign-up")?;

    let email = req.email.trim().to_lowercase();
    if email_taken(&app, &email, None).await? {
        return Err(AppError::conflict_with_code("email_taken", "email already registered"));
    }

    let is_admin = app
        .settings
        .auth
        .admin_emails
        .iter()
        .any(|admin| admin.eq_ignore_ascii_case(&email));
    let user = User {
        name: req.name.trim().to_string(),
        email,
        role: if is_admin { Role::Admin } else { req.role },
        library_id: None,
        author_id: None,
        loyalty_points: 0,
    };

    let users = app.collection::<User>(USERS);
    let created = match caller_id(&headers, &app) {
        Some(id) => {
            // The absent read is pinned, so a concurrent sign-up under the same id conflicts.
            run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
                let (id, user) = (id.clone(), user.clone());
                async move {
                    if tx.get(USERS, &id).await?.is_some() {
                        return Err(AppError::conflict_with_code(
                            "account_exists",
                            "account already exists",
                        ));
                    }
                    tx.set_record(USERS, &id, &user)?;
                    Ok(())
                }
                .boxed()
            })
            .await?;
            users.require(&id).await?
        }
        None => users.create(&user).await?,
    };

    tracing::info!(user_id = %created.id, role = created.role.as_str(), "user signed up");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn me(caller: CurrentUser) -> Json<Entity<User>> {
    Json(caller.user)
}

async fn list_users(
    State(app): State<AppContext>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<UserListParams>,
) -> ApiResult<Json<Vec<Entity<User>>>> {
    caller.require_admin("list users")?;

    let query = Query::new()
        .eq_opt("role", params.role.map(|role| role.as_str()))
        .order_by("name", Direction::Ascending);
    Ok(Json(app.collection::<User>(USERS).list(&query).await?))
}

async fn get_user(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<User>>> {
    caller.ensure_self(&id, "view this profile")?;
    Ok(Json(app.collection::<User>(USERS).require(&id).await?))
}

async fn update_profile(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ProfileUpdate>,
) -> ApiResult<Json<Entity<User>>> {
    caller.ensure_self(&id, "edit this profile")?;
    req.validate().finish("invalid profile")?;

    let users = app.collection::<User>(USERS);
    users.require(&id).await?;

    let mut patch = Map::new();
    if let Some(name) = req.name {
        patch.insert("name".into(), Value::from(name.trim()));
    }
    if let Some(email) = req.email {
        let email = email.trim().to_lowercase();
        if email_taken(&app, &email, Some(&id)).await? {
            return Err(AppError::conflict_with_code("email_taken", "email already registered"));
        }
        patch.insert("email".into(), Value::from(email));
    }

    Ok(Json(users.patch(&id, Value::Object(patch)).await?))
}

async fn assign_role(
    State(app): State<AppContext>,
    caller: CurrentUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RoleAssignment>,
) -> ApiResult<Json<Entity<User>>> {
    caller.require_admin("assign roles")?;

    // Only the role fields are written; the balance belongs to the ledger.
    let patch = json!({
        "role": req.role,
        "library_id": req.library_id.filter(|_| req.role == Role::Library),
        "author_id": req.author_id.filter(|_| req.role == Role::Author),
    });
    run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let (id, patch) = (id.clone(), patch.clone());
        async move {
            tx.require::<User>(USERS, &id).await?;
            tx.update(USERS, &id, patch);
            Ok::<_, AppError>(())
        }
        .boxed()
    })
    .await?;

    let updated = app.collection::<User>(USERS).require(&id).await?;
    tracing::info!(user_id = %id, role = updated.role.as_str(), "role assigned");
    Ok(Json(updated))
}
