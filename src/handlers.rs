use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        DeleteResponse, LoginRequest, LoginResponse, NewUser, RecipeCreatedResponse,
        RecipeListResponse, RecipePayload, RecipeResponse, RecipeSearch, RegisterRequest,
        SearchField, StatusResponse, UserPublic,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// RecipeFilter
///
/// Accepted query parameters for the recipe listing endpoint (GET /api/recipes).
/// `type` selects which field the search term is matched against; `page` is
/// accepted for client compatibility but not applied (no server-side
/// pagination).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct RecipeFilter {
    /// Optional search term; empty or whitespace-only means no filter.
    pub search: Option<String>,
    /// Field selector: "name" or "cuisine". Any other value disables filtering.
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    /// Accepted and ignored. Kept as a string so any value deserializes.
    #[allow(dead_code)]
    pub page: Option<String>,
}

/// Malformed ids are treated as unknown recipes (404), not surfaced as
/// client or server errors.
fn parse_recipe_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Recipe not found".to_string()))
}

fn recipe_not_found() -> ApiError {
    ApiError::NotFound("Recipe not found".to_string())
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a new user account. Email and username are each
/// checked for uniqueness before insert; the password is bcrypt-hashed and the
/// plaintext never reaches the store or the logs.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = StatusResponse),
        (status = 400, description = "Duplicate email or username", body = StatusResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::Validation(
            "Username, email and password are required".to_string(),
        ));
    }

    if state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "An account with this email already exists. Please login instead.".to_string(),
        ));
    }

    if state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Username is already taken. Please choose another.".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            success: true,
            message: "Registration successful! Please login.".to_string(),
        }),
    ))
}

/// login
///
/// [Public Route] Verifies email and password and issues a session token.
/// Unknown email and wrong password both answer with the same
/// "Invalid credentials" body, so accounts cannot be enumerated.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let password_valid = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;
    if !password_valid {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;

    Ok(Json(LoginResponse {
        success: true,
        user: UserPublic::from(&user),
        token,
    }))
}

// --- Recipe Handlers ---

/// list_recipes
///
/// [Public Route] Lists recipes, newest first, each including the owner's
/// username. A non-empty search term filters by case-insensitive substring
/// match, but only when `type` is exactly "name" or "cuisine"; any other
/// selector yields the unfiltered set.
#[utoipa::path(
    get,
    path = "/api/recipes",
    params(RecipeFilter),
    responses((status = 200, description = "List recipes", body = RecipeListResponse))
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<RecipeListResponse>, ApiError> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .and_then(|term| {
            let field = filter.search_type.as_deref().and_then(SearchField::parse)?;
            Some(RecipeSearch {
                field,
                term: term.to_string(),
            })
        });

    let recipes = state.repo.list_recipes(search).await?;

    Ok(Json(RecipeListResponse {
        success: true,
        recipes,
    }))
}

/// get_recipe
///
/// [Public Route] Retrieves a single recipe by id. Unknown and malformed ids
/// are both answered with 404.
#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Found", body = RecipeResponse),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let id = parse_recipe_id(&id)?;

    let recipe = state
        .repo
        .get_recipe(id)
        .await?
        .ok_or_else(recipe_not_found)?;

    Ok(Json(RecipeResponse {
        success: true,
        recipe,
    }))
}

/// create_recipe
///
/// [Authenticated Route] Creates a recipe owned by the caller. The owner is
/// always the authenticated user id; an owner field submitted in the body is
/// not part of the payload schema and is dropped. The 201 body carries the
/// new recipe's fields at the top level, unwrapped.
#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = RecipePayload,
    responses(
        (status = 201, description = "Created", body = RecipeCreatedResponse),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_recipe(
    AuthUser { id: user_id }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeCreatedResponse>), ApiError> {
    payload.validate()?;

    let recipe = state.repo.create_recipe(user_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecipeCreatedResponse {
            success: true,
            recipe,
        }),
    ))
}

/// update_recipe
///
/// [Authenticated Route] Overwrites a recipe's name, cuisine, ingredients and
/// instructions. Owner-only: a non-owner caller receives 403 via the shared
/// `Recipe::is_owned_by` predicate. The id and owner are never modified.
#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    params(("id" = String, Path, description = "Recipe ID")),
    request_body = RecipePayload,
    responses(
        (status = 200, description = "Updated", body = RecipeResponse),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn update_recipe(
    AuthUser { id: user_id }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let id = parse_recipe_id(&id)?;
    payload.validate()?;

    let existing = state
        .repo
        .get_recipe(id)
        .await?
        .ok_or_else(recipe_not_found)?;

    if !existing.is_owned_by(user_id) {
        return Err(ApiError::Forbidden(
            "Not authorized to update this recipe".to_string(),
        ));
    }

    // A concurrent delete between the ownership check and the write surfaces
    // as not-found rather than resurrecting the recipe.
    let recipe = state
        .repo
        .update_recipe(id, payload)
        .await?
        .ok_or_else(recipe_not_found)?;

    Ok(Json(RecipeResponse {
        success: true,
        recipe,
    }))
}

/// delete_recipe
///
/// [Authenticated Route] Permanently removes a recipe. Owner-only, same
/// predicate as update; there is no soft delete.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn delete_recipe(
    AuthUser { id: user_id }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_recipe_id(&id)?;

    let existing = state
        .repo
        .get_recipe(id)
        .await?
        .ok_or_else(recipe_not_found)?;

    if !existing.is_owned_by(user_id) {
        return Err(ApiError::Forbidden("Not authorized".to_string()));
    }

    state.repo.delete_recipe(id).await?;

    Ok(Json(DeleteResponse {
        message: "Recipe deleted successfully".to_string(),
    }))
}
