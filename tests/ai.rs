mod common;

use std::sync::Arc;

use alicia_genai::testing::ScriptedModel;
use axum::http::StatusCode;
use common::TestServer;
use serde_json::json;

async fn creator_shop(model: Option<Arc<ScriptedModel>>) -> (TestServer, String, String) {
    let server = TestServer::with_model(model.map(|m| m as Arc<dyn alicia_genai::GenerativeModel>));
    server.sign_up("libro", "centro@alicia.test", "library").await;
    server.sign_up("lector", "lector@alicia.test", "reader").await;
    let library_id = server.library("libro", "Librería Centro").await;
    let book_id = server.book("libro", &library_id, 1_800, 2).await;
    (server, library_id, book_id)
}

#[tokio::test]
async fn test_flows_answer_503_without_credentials() {
    let (server, _, _) = creator_shop(None).await;
    let (status, body) = server
        .post(
            "/api/ai/social-posts",
            Some("libro"),
            json!({"topic": "Noche de poesía", "platforms": ["instagram"]}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "service_unavailable");
}

#[tokio::test]
async fn test_creator_flows_need_creator_role() {
    let (server, _, _) = creator_shop(Some(Arc::new(ScriptedModel::new()))).await;
    let (status, _) = server
        .post(
            "/api/ai/marketing-plan",
            Some("lector"),
            json!({"library_name": "Centro", "goal": "más lectores", "audience": "jóvenes"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_social_posts_strip_hash_signs() {
    let model = Arc::new(ScriptedModel::new().reply(
        json!({"posts": [{"platform": "instagram", "text": "Hoy leemos poesía", "hashtags": ["#poesia", " libros ", "#"]}]})
            .to_string(),
    ));
    let (server, _, _) = creator_shop(Some(model.clone())).await;

    let (status, posts) = server
        .post(
            "/api/ai/social-posts",
            Some("libro"),
            json!({"topic": "Noche de poesía", "platforms": ["instagram"], "count": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{posts}");
    assert_eq!(posts["posts"][0]["hashtags"], json!(["poesia", "libros"]));
    assert_eq!(model.text_requests().len(), 1);
}

#[tokio::test]
async fn test_reader_chat_only_recommends_catalog_books() {
    let model = Arc::new(ScriptedModel::new());
    let (server, _, book_id) = creator_shop(Some(model.clone())).await;
    model.push_reply(
        json!({"reply": "Te recomiendo Pedro Páramo", "book_ids": [book_id, "inventado"]}).to_string(),
    );

    let (status, reply) = server
        .post(
            "/api/ai/chat",
            Some("lector"),
            json!({"assistant": "reader", "message": "¿Qué novela mexicana me recomiendas?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{reply}");
    assert_eq!(reply["book_ids"], json!([book_id]));

    let requests = model.text_requests();
    let system = requests[0].system.as_deref().unwrap();
    assert!(system.contains(&book_id));
}

#[tokio::test]
async fn test_library_assistant_is_for_staff() {
    let (server, _, _) = creator_shop(Some(Arc::new(ScriptedModel::new()))).await;
    let (status, _) = server
        .post(
            "/api/ai/chat",
            Some("lector"),
            json!({"assistant": "library", "message": "¿Cómo organizo un club de lectura?"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_generated_cover_is_stored() {
    let (server, _, _) = creator_shop(Some(Arc::new(ScriptedModel::new()))).await;
    let (status, cover) = server
        .post(
            "/api/ai/cover-image",
            Some("libro"),
            json!({"title": "El jardín de senderos", "description": "laberintos y espejos"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{cover}");
    assert_eq!(cover["content_type"], "image/png");

    let path = cover["path"].as_str().unwrap();
    assert!(path.starts_with("generated/covers/"));
    assert!(path.ends_with(".png"));
    assert!(cover["url"].as_str().unwrap().ends_with(path));

    let on_disk = std::path::Path::new(&server.app.settings.storage.root).join(path);
    assert!(on_disk.exists());
}

#[tokio::test]
async fn test_text_to_speech_uses_default_voice() {
    let model = Arc::new(ScriptedModel::new());
    let (server, _, _) = creator_shop(Some(model.clone())).await;
    let (status, clip) = server
        .post("/api/ai/text-to-speech", Some("lector"), json!({"text": "Érase una vez"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{clip}");
    assert!(clip["media"].as_str().unwrap().starts_with("data:audio/wav;base64,"));

    let speech = model.speech_requests();
    assert_eq!(
        speech[0].voice,
        alicia_genai::VoiceConfig::Single("Algenib".into())
    );
}
