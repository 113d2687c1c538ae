//! Router harness for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use alicia_db::MemoryStore;
use alicia_genai::GenerativeModel;
use alicia_kernel::{AppContext, ModuleRegistry, Settings};
use alicia_storage::LocalBlobStore;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@alicia.test";

pub struct TestServer {
    pub app: AppContext,
    router: Router,
    _media: TempDir,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_model(None)
    }

    pub fn with_model(ai: Option<Arc<dyn GenerativeModel>>) -> Self {
        let media = tempfile::tempdir().expect("tempdir");
        let mut settings = Settings::default();
        settings.storage.root = media.path().join("media").to_string_lossy().into_owned();
        settings.storage.public_base_url = "http://localhost/media".into();
        settings.auth.admin_emails = vec![ADMIN_EMAIL.into()];

        let blobs = LocalBlobStore::new(
            &settings.storage.root,
            settings.storage.public_base_url.clone(),
            settings.storage.max_upload_bytes,
        );
        let app = AppContext::new(settings, Arc::new(MemoryStore::new()), Arc::new(blobs), ai);

        let mut registry = ModuleRegistry::new();
        alicia_app::modules::register_all(&mut registry);
        let router = alicia_http::build_router(&registry, &app);

        Self {
            app,
            router,
            _media: media,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("x-user-id", user);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, user, Some(body)).await
    }

    /// Sign up `id` with the given role and return the stored account.
    pub async fn sign_up(&self, id: &str, email: &str, role: &str) -> Value {
        let (status, user) = self
            .post(
                "/api/users",
                Some(id),
                serde_json::json!({"name": format!("Cuenta {id}"), "email": email, "role": role}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{user}");
        user
    }

    /// A library owned by `owner`, who must already have the library role.
    pub async fn library(&self, owner: &str, name: &str) -> String {
        let (status, library) = self
            .post(
                "/api/libraries",
                Some(owner),
                serde_json::json!({"name": name, "address": "Calle Mayor 1", "city": "Madrid"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{library}");
        library["id"].as_str().expect("library id").to_string()
    }

    pub async fn book(&self, owner: &str, library_id: &str, price_cents: i64, stock: i64) -> String {
        let (status, book) = self
            .post(
                "/api/books",
                Some(owner),
                serde_json::json!({
                    "library_id": library_id,
                    "title": "Pedro Páramo",
                    "author": "Juan Rulfo",
                    "price_cents": price_cents,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{book}");
        book["id"].as_str().expect("book id").to_string()
    }
}
