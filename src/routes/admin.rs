use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Editorial management: career and magazine CRUD, ordered home-image
/// collections, and the generic media upload wrapper. The router layer above
/// guarantees an authenticated Principal; each handler then enforces the
/// admin role explicitly before touching the repository.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Careers ---
        .route(
            "/careers",
            get(handlers::get_admin_careers).post(handlers::create_career),
        )
        .route(
            "/careers/{id}",
            get(handlers::get_career)
                .put(handlers::update_career)
                .delete(handlers::delete_career),
        )
        // --- Magazines ---
        .route(
            "/magazines",
            get(handlers::get_admin_magazines).post(handlers::create_magazine),
        )
        .route(
            "/magazines/{id}",
            get(handlers::get_admin_magazine)
                .put(handlers::update_magazine)
                .delete(handlers::delete_magazine),
        )
        // --- Ordered home-image collections ---
        // GET lists, POST uploads+appends, PATCH reorders one image by key,
        // DELETE removes by key and compacts the remaining priorities.
        .route(
            "/home-images/{section}",
            get(handlers::get_admin_home_images)
                .post(handlers::upload_home_images)
                .patch(handlers::reorder_home_image)
                .delete(handlers::delete_home_image),
        )
        // --- Generic uploads ---
        // Raw put/delete-by-key for covers and issue PDFs; the returned key
        // is then attached to a magazine via the CRUD endpoints.
        .route(
            "/uploads",
            post(handlers::upload_file).delete(handlers::delete_file),
        )
}
