use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes behind the Principal extractor middleware. Every handler here
/// receives a fully resolved Principal; role checks beyond "authenticated"
/// (the strict subscriber gate on the issue download) run inside the
/// handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The resolved identity: live flags plus the derived role.
        .route("/me", get(handlers::get_me))
        // GET /magazines/{id}/issue
        // Subscriber-only full-issue PDF reference. The check is strict:
        // admins are not implicit subscribers.
        .route("/magazines/{id}/issue", get(handlers::get_magazine_issue))
}
