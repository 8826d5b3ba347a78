use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are unauthenticated and accessible to any client.
/// Recipe reads are public by design; only mutations require a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates a new account. Duplicate email/username answer 400.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Verifies credentials and issues a bearer token.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/recipes?search=&type=
        // Lists recipes newest-first with optional name/cuisine substring search.
        .route("/api/recipes", get(handlers::list_recipes))
        // GET /api/recipes/{id}
        // Retrieves a single recipe; unknown or malformed ids answer 404.
        .route("/api/recipes/{id}", get(handlers::get_recipe))
}
