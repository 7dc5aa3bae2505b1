use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: the three sign-in flows plus read-only access
/// to published content. Every retrieval handler here must enforce its
/// publication filter (`is_published` / `show_on_home`) at the repository
/// level so hidden records never leak to anonymous clients.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Sign-in flows ---
        // Each mints an access token whose role claim mirrors the role at
        // issuance; authorization later re-derives the role from the live
        // account flags.
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/google", post(handlers::google_signin))
        // GET /careers
        // Published job postings in manual priority order.
        .route("/careers", get(handlers::get_published_careers))
        // --- Magazines ---
        // Home carousel, current issue, archive navigation, issue detail.
        .route("/magazines/home", get(handlers::get_magazines_for_home))
        .route("/magazines/current", get(handlers::get_current_magazine))
        .route("/magazines/years", get(handlers::get_magazine_years))
        .route("/magazines/year/{year}", get(handlers::get_magazines_by_year))
        .route("/magazines/{id}", get(handlers::get_magazine_details))
        // GET /home-images/{section}
        // One ordered image collection, priority ascending.
        .route("/home-images/{section}", get(handlers::get_home_images))
}
