//! Fixtures shared by unit tests.

use std::sync::Arc;

use alicia_db::MemoryStore;
use alicia_kernel::{AppContext, Settings};
use alicia_storage::LocalBlobStore;
use tempfile::TempDir;

/// An in-memory app with media under a temp dir; keep the dir alive.
pub fn test_app() -> (AppContext, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let blobs = LocalBlobStore::new(dir.path().join("media"), "http://localhost/media", 1 << 20);
    let app = AppContext::new(
        Settings::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(blobs),
        None,
    );
    (app, dir)
}

pub mod seed {
    use alicia_authz::Role;
    use alicia_kernel::AppContext;
    use chrono::{Duration, Utc};

    use crate::modules::books::models::{Book, BOOKS};
    use crate::modules::promotions::models::{Discount, Promotion, PROMOTIONS};
    use crate::modules::redemptions::models::{RedemptionItem, REDEMPTION_ITEMS};
    use crate::modules::users::models::{User, USERS};

    pub async fn user(app: &AppContext, id: &str, role: Role, points: i64) {
        let user = User {
            name: format!("Usuario {id}"),
            email: format!("{id}@alicia.test"),
            role,
            library_id: None,
            author_id: None,
            loyalty_points: points,
        };
        app.collection::<User>(USERS).put(id, &user).await.expect("seed user");
    }

    pub async fn book(app: &AppContext, id: &str, library_id: &str, price_cents: i64, stock: i64) {
        let book = Book {
            library_id: library_id.into(),
            title: format!("Libro {id}"),
            author: "Juan Rulfo".into(),
            isbn: None,
            description: String::new(),
            genre: Some("novela".into()),
            price_cents,
            stock,
            cover_url: None,
        };
        app.collection::<Book>(BOOKS).put(id, &book).await.expect("seed book");
    }

    /// A promotion running for the next week with no minimum subtotal.
    pub async fn promotion(app: &AppContext, id: &str, library_id: &str, discount: Discount) {
        let now = Utc::now();
        let promotion = Promotion {
            library_id: library_id.into(),
            title: format!("Promo {id}"),
            description: String::new(),
            discount,
            min_subtotal_cents: 0,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::days(7),
            active: true,
        };
        app.collection::<Promotion>(PROMOTIONS)
            .put(id, &promotion)
            .await
            .expect("seed promotion");
    }

    pub async fn item(app: &AppContext, id: &str, points_cost: i64, stock: i64, active: bool) {
        let item = RedemptionItem {
            name: format!("Premio {id}"),
            description: String::new(),
            points_cost,
            stock,
            image_url: None,
            active,
        };
        app.collection::<RedemptionItem>(REDEMPTION_ITEMS)
            .put(id, &item)
            .await
            .expect("seed item");
    }
}
