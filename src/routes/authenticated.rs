use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Defines the routes reachable only with a verified bearer token. Every
/// handler here receives the resolved `AuthUser`; update and delete
/// additionally enforce the owner-only check against the target recipe.
///
/// Access Control Strategy:
/// This router is mounted behind a `route_layer` running the `AuthUser`
/// extractor, so unauthenticated requests are rejected before any handler
/// executes (401 for a missing token, 400 for an unverifiable one).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/recipes
        // Creates a recipe owned by the authenticated caller. Any owner value
        // in the request body is ignored.
        .route("/api/recipes", post(handlers::create_recipe))
        // PUT/DELETE /api/recipes/{id}
        // Owner-only mutation and removal of a recipe. Non-owners receive 403.
        .route(
            "/api/recipes/{id}",
            put(handlers::update_recipe).delete(handlers::delete_recipe),
        )
}
