use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `users` table. The password hash
/// never leaves the server: it is skipped during serialization so no response
/// can accidentally include it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Globally unique display name.
    pub username: String,
    /// Globally unique login identifier.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// UserPublic
///
/// The subset of a user record that is safe to return to clients,
/// used in the login response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// NewUser
///
/// Internal insertion payload for the credential store. The register handler
/// builds this after hashing the password; the store never sees a plaintext one.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Ingredient
///
/// One entry of a recipe's ordered ingredient list. Quantity and unit are
/// free-form strings ("2", "cups") and may be omitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

/// Recipe
///
/// The primary resource of the application. `owner_id` is fixed at creation
/// from the authenticated caller and never changes afterwards; only name,
/// cuisine, ingredients and instructions are mutable, and only by the owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub cuisine: String,
    /// Ordered ingredient list, preserved exactly as submitted.
    pub ingredients: Vec<Ingredient>,
    /// Ordered instruction steps, preserved exactly as submitted.
    pub instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// The single ownership predicate used by every mutating operation.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// RecipeWithOwner
///
/// A recipe joined with its owner's username, as returned by the listing
/// endpoint. The username is optional to tolerate rows whose owner record
/// is missing (no cascade rule is defined for user removal).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeWithOwner {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: Option<String>,
    pub name: String,
    pub cuisine: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeWithOwner {
    pub fn new(recipe: Recipe, owner_username: Option<String>) -> Self {
        Self {
            id: recipe.id,
            owner_id: recipe.owner_id,
            owner_username,
            name: recipe.name,
            cuisine: recipe.cuisine,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

// --- Search ---

/// SearchField
///
/// The recognized values of the listing endpoint's `type` parameter. Anything
/// other than exactly "name" or "cuisine" means no filter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Cuisine,
}

impl SearchField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(SearchField::Name),
            "cuisine" => Some(SearchField::Cuisine),
            _ => None,
        }
    }
}

/// RecipeSearch
///
/// A fully resolved search filter: a recognized field and a non-empty term.
/// The listing handler only constructs this when both conditions hold, so the
/// repository never has to re-check them.
#[derive(Debug, Clone)]
pub struct RecipeSearch {
    pub field: SearchField,
    pub term: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /api/auth/register. The password is hashed with
/// bcrypt before it reaches the store and is never persisted or logged as-is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RecipePayload
///
/// Input payload shared by create and update: both operations write exactly
/// these four fields and nothing else. Any extra field a client submits
/// (including an owner id) is simply not part of this schema and is dropped
/// during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipePayload {
    pub name: String,
    pub cuisine: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl RecipePayload {
    /// Schema-level validation: name and cuisine must be non-empty, and every
    /// ingredient needs at least a name.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Recipe name is required".to_string()));
        }
        if self.cuisine.trim().is_empty() {
            return Err(ApiError::Validation("Cuisine is required".to_string()));
        }
        if self
            .ingredients
            .iter()
            .any(|ingredient| ingredient.name.trim().is_empty())
        {
            return Err(ApiError::Validation(
                "Every ingredient requires a name".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Response Payloads (Output Schemas) ---

/// StatusResponse
///
/// The generic `{success, message}` body used by registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

/// LoginResponse
///
/// Successful login body: the public user record plus a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserPublic,
    pub token: String,
}

/// RecipeResponse
///
/// Single-recipe envelope returned by get and update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub success: bool,
    pub recipe: Recipe,
}

/// RecipeCreatedResponse
///
/// Body of a successful create: the new recipe's fields flattened at the
/// top level next to the success flag, with no `recipe` envelope. Create is
/// the one recipe endpoint with this shape; get and update wrap theirs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeCreatedResponse {
    pub success: bool,
    #[serde(flatten)]
    pub recipe: Recipe,
}

/// RecipeListResponse
///
/// Listing envelope; recipes carry the populated owner username.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeListResponse {
    pub success: bool,
    pub recipes: Vec<RecipeWithOwner>,
}

/// DeleteResponse
///
/// Body returned by a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}
