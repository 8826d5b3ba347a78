use crate::models::{
    Ingredient, NewUser, Recipe, RecipePayload, RecipeSearch, RecipeWithOwner, SearchField, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder, types::Json};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Failures of the persistence layer. These are surfaced to handlers (which
/// translate them to 500) rather than swallowed; there are no retries.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The abstract contract for all persistence operations: the credential store
/// (user half) and the recipe store (recipe half). Handlers interact with the
/// data layer only through this trait, which lets the Postgres implementation
/// and the in-memory test implementation be swapped freely.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential store ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<User>, RepositoryError>;
    // Uniqueness of username/email is checked by the register handler before
    // insert; the store only carries the unique constraints themselves.
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    // --- Recipe store ---
    // Filtered retrieval, newest first, each row joined with the owner's username.
    async fn list_recipes(
        &self,
        search: Option<RecipeSearch>,
    ) -> Result<Vec<RecipeWithOwner>, RepositoryError>;
    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, RepositoryError>;
    async fn create_recipe(
        &self,
        owner_id: Uuid,
        payload: RecipePayload,
    ) -> Result<Recipe, RepositoryError>;
    // Overwrites exactly name/cuisine/ingredients/instructions and refreshes
    // updated_at. Ownership is checked by the caller; the id and owner_id are
    // never touched. Returns None when the id is unknown.
    async fn update_recipe(
        &self,
        id: Uuid,
        payload: RecipePayload,
    ) -> Result<Option<Recipe>, RepositoryError>;
    // Permanent removal. Returns true if a row was deleted.
    async fn delete_recipe(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres implementation ---

/// PostgresRepository
///
/// The production implementation, backed by PostgreSQL. All queries are
/// runtime-checked (`query_as`/`QueryBuilder` with bound parameters), so the
/// crate compiles without a live database and stays safe from SQL injection.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row mapping for `recipes`. Ingredients live in a JSONB column,
/// instructions in a TEXT[] column.
#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    cuisine: String,
    ingredients: Json<Vec<Ingredient>>,
    instructions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            cuisine: row.cuisine,
            ingredients: row.ingredients.0,
            instructions: row.instructions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing row: a recipe joined with the owner's username.
#[derive(sqlx::FromRow)]
struct RecipeWithOwnerRow {
    id: Uuid,
    owner_id: Uuid,
    owner_username: Option<String>,
    name: String,
    cuisine: String,
    ingredients: Json<Vec<Ingredient>>,
    instructions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecipeWithOwnerRow> for RecipeWithOwner {
    fn from(row: RecipeWithOwnerRow) -> Self {
        RecipeWithOwner {
            id: row.id,
            owner_id: row.owner_id,
            owner_username: row.owner_username,
            name: row.name,
            cuisine: row.cuisine,
            ingredients: row.ingredients.0,
            instructions: row.instructions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RECIPE_COLUMNS: &str =
    "id, owner_id, name, cuisine, ingredients, instructions, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// list_recipes
    ///
    /// Implements the filtered listing using QueryBuilder for safe
    /// parameterization. The filter is only ever present for the two
    /// recognized search fields; ordering is newest first.
    async fn list_recipes(
        &self,
        search: Option<RecipeSearch>,
    ) -> Result<Vec<RecipeWithOwner>, RepositoryError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT r.id, r.owner_id, u.username AS owner_username, r.name, r.cuisine, \
             r.ingredients, r.instructions, r.created_at, r.updated_at \
             FROM recipes r LEFT JOIN users u ON r.owner_id = u.id",
        );

        if let Some(search) = search {
            // Case-insensitive substring match on exactly one field.
            let pattern = format!("%{}%", search.term);
            match search.field {
                SearchField::Name => builder.push(" WHERE r.name ILIKE "),
                SearchField::Cuisine => builder.push(" WHERE r.cuisine ILIKE "),
            };
            builder.push_bind(pattern);
        }

        builder.push(" ORDER BY r.created_at DESC");

        let rows = builder
            .build_query_as::<RecipeWithOwnerRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RecipeWithOwner::from).collect())
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, RepositoryError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn create_recipe(
        &self,
        owner_id: Uuid,
        payload: RecipePayload,
    ) -> Result<Recipe, RepositoryError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "INSERT INTO recipes (id, owner_id, name, cuisine, ingredients, instructions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(payload.name)
        .bind(payload.cuisine)
        .bind(Json(payload.ingredients))
        .bind(payload.instructions)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_recipe(
        &self,
        id: Uuid,
        payload: RecipePayload,
    ) -> Result<Option<Recipe>, RepositoryError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "UPDATE recipes \
             SET name = $2, cuisine = $3, ingredients = $4, instructions = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(payload.name)
        .bind(payload.cuisine)
        .bind(Json(payload.ingredients))
        .bind(payload.instructions)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory implementation (tests) ---

/// InMemoryRepository
///
/// A HashMap-backed implementation of `Repository` used for unit and
/// integration testing. It lets the full router be exercised without a
/// database connection while still honoring the same contract: filtered,
/// newest-first listing; owner-username join; full-overwrite updates.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    recipes: RwLock<HashMap<Uuid, Recipe>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users; used by tests to assert that failed
    /// registrations leave the store untouched.
    pub fn user_count(&self) -> usize {
        self.users.read().expect("lock poisoned").len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        self.users
            .write()
            .expect("lock poisoned")
            .insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_recipes(
        &self,
        search: Option<RecipeSearch>,
    ) -> Result<Vec<RecipeWithOwner>, RepositoryError> {
        let users = self.users.read().expect("lock poisoned");
        let recipes = self.recipes.read().expect("lock poisoned");

        let mut matched: Vec<Recipe> = recipes
            .values()
            .filter(|recipe| match &search {
                Some(search) => {
                    let haystack = match search.field {
                        SearchField::Name => &recipe.name,
                        SearchField::Cuisine => &recipe.cuisine,
                    };
                    haystack
                        .to_lowercase()
                        .contains(&search.term.to_lowercase())
                }
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .map(|recipe| {
                let owner_username = users.get(&recipe.owner_id).map(|u| u.username.clone());
                RecipeWithOwner::new(recipe, owner_username)
            })
            .collect())
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, RepositoryError> {
        let recipes = self.recipes.read().expect("lock poisoned");
        Ok(recipes.get(&id).cloned())
    }

    async fn create_recipe(
        &self,
        owner_id: Uuid,
        payload: RecipePayload,
    ) -> Result<Recipe, RepositoryError> {
        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            owner_id,
            name: payload.name,
            cuisine: payload.cuisine,
            ingredients: payload.ingredients,
            instructions: payload.instructions,
            created_at: now,
            updated_at: now,
        };
        self.recipes
            .write()
            .expect("lock poisoned")
            .insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        id: Uuid,
        payload: RecipePayload,
    ) -> Result<Option<Recipe>, RepositoryError> {
        let mut recipes = self.recipes.write().expect("lock poisoned");
        match recipes.get_mut(&id) {
            Some(recipe) => {
                recipe.name = payload.name;
                recipe.cuisine = payload.cuisine;
                recipe.ingredients = payload.ingredients;
                recipe.instructions = payload.instructions;
                recipe.updated_at = Utc::now();
                Ok(Some(recipe.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut recipes = self.recipes.write().expect("lock poisoned");
        Ok(recipes.remove(&id).is_some())
    }
}
