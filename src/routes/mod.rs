/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules, so
/// access control is applied explicitly at the module level (via Axum layers)
/// rather than remembered per handler.

/// Routes accessible to all clients: registration, login, and read-only
/// recipe browsing/search.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware: every mutating
/// recipe operation. Requires a verified bearer token.
pub mod authenticated;
