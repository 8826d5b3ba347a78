use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use recipe_box::{
    AppConfig, AppState, InMemoryRepository, TokenIssuer, create_router,
    repository::RepositoryState,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Test Harness ---

/// Builds the full router backed by the in-memory repository, returning the
/// repository handle as well so tests can assert on store state directly.
fn app() -> (Router, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let config = AppConfig::default();
    let tokens = TokenIssuer::new(&config.jwt_secret);

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        tokens,
        config,
    };
    (create_router(state), repo)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

/// Registers a user and logs them in, returning (token, user id).
async fn register_and_login(app: &Router, username: &str, email: &str) -> (String, Uuid) {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let token = body["token"].as_str().unwrap().to_string();
    let user_id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    (token, user_id)
}

fn sample_recipe() -> Value {
    json!({
        "name": "Simple Bread",
        "cuisine": "French",
        "ingredients": [{ "name": "Flour", "quantity": "2", "unit": "cups" }],
        "instructions": ["Mix", "Bake"]
    })
}

// --- Health ---

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

// --- Registration & Login ---

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let (app, repo) = app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "amy", "email": "a@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same email, different username: rejected, store cardinality unchanged.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "amy2", "email": "a@x.com", "password": "p2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["message"],
        json!("An account with this email already exists. Please login instead.")
    );
    assert_eq!(repo.user_count(), 1);
}

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let (app, repo) = app();
    register_and_login(&app, "amy", "a@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "amy", "email": "other@x.com", "password": "p2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("Username is already taken. Please choose another.")
    );
    assert_eq!(repo.user_count(), 1);
}

#[tokio::test]
async fn test_register_missing_fields_rejected() {
    let (app, repo) = app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "  ", "email": "a@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(repo.user_count(), 0);
}

#[tokio::test]
async fn test_login_token_resolves_to_user() {
    let (app, _) = app();
    let (token, user_id) = register_and_login(&app, "amy", "a@x.com").await;

    // The issued token, when verified with the same secret, binds amy's id.
    let issuer = TokenIssuer::new(&AppConfig::default().jwt_secret);
    assert_eq!(issuer.verify(&token).unwrap(), user_id);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _) = app();
    register_and_login(&app, "amy", "a@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid credentials" }));
}

#[tokio::test]
async fn test_login_unknown_email_same_body() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid credentials" }));
}

// --- Authorization Middleware ---

#[tokio::test]
async fn test_missing_token_is_401() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/recipes", None, Some(sample_recipe())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Access denied" }));
}

#[tokio::test]
async fn test_invalid_token_is_400() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some("not.a.token"),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid token" }));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_400() {
    let (app, _) = app();
    let foreign = TokenIssuer::new("some-other-secret");
    let token = foreign.issue(Uuid::new_v4()).unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid token" }));
}

// --- Recipe CRUD ---

#[tokio::test]
async fn test_recipe_lifecycle() {
    let (app, _) = app();
    let (amy_token, amy_id) = register_and_login(&app, "amy", "a@x.com").await;

    // Create: owner is the authenticated caller; fields come back unwrapped.
    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&amy_token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["owner_id"], json!(amy_id.to_string()));
    let recipe_id = body["id"].as_str().unwrap().to_string();

    // Round-trip: ingredients and instructions come back in order.
    let (status, body) = send(&app, "GET", &format!("/api/recipes/{recipe_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["recipe"]["ingredients"],
        json!([{ "name": "Flour", "quantity": "2", "unit": "cups" }])
    );
    assert_eq!(body["recipe"]["instructions"], json!(["Mix", "Bake"]));

    // Update by the owner overwrites the four mutable fields.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/recipes/{recipe_id}"),
        Some(&amy_token),
        Some(json!({
            "name": "Sourdough",
            "cuisine": "French",
            "ingredients": [
                { "name": "Flour", "quantity": "3", "unit": "cups" },
                { "name": "Starter", "quantity": "1", "unit": "cup" }
            ],
            "instructions": ["Mix", "Proof", "Bake"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipe"]["name"], json!("Sourdough"));
    assert_eq!(body["recipe"]["owner_id"], json!(amy_id.to_string()));
    assert_eq!(body["recipe"]["instructions"], json!(["Mix", "Proof", "Bake"]));

    // Delete, then the recipe is gone.
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/recipes/{recipe_id}"),
        Some(&amy_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Recipe deleted successfully" }));

    let (status, body) = send(&app, "GET", &format!("/api/recipes/{recipe_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Recipe not found"));
}

#[tokio::test]
async fn test_non_owner_cannot_update_or_delete() {
    let (app, _) = app();
    let (amy_token, _) = register_and_login(&app, "amy", "a@x.com").await;
    let (bob_token, _) = register_and_login(&app, "bob", "b@x.com").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&amy_token),
        Some(sample_recipe()),
    )
    .await;
    let recipe_id = body["id"].as_str().unwrap().to_string();

    // Bob is authenticated but not the owner.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/recipes/{recipe_id}"),
        Some(&bob_token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Not authorized to update this recipe"));

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/recipes/{recipe_id}"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Not authorized"));

    // The recipe survived both attempts.
    let (status, _) = send(&app, "GET", &format!("/api/recipes/{recipe_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_owner_field_in_create_body_is_ignored() {
    let (app, _) = app();
    let (token, user_id) = register_and_login(&app, "amy", "a@x.com").await;

    let mut payload = sample_recipe();
    payload["owner_id"] = json!(Uuid::new_v4().to_string());

    let (status, body) = send(&app, "POST", "/api/recipes", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner_id"], json!(user_id.to_string()));
}

#[tokio::test]
async fn test_create_body_is_flat_not_enveloped() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The recipe's fields sit at the top level next to the success flag;
    // there is no wrapping "recipe" object on this endpoint.
    assert_eq!(body["success"], json!(true));
    assert!(body.get("recipe").is_none());
    assert_eq!(body["name"], json!("Simple Bread"));
    assert_eq!(body["cuisine"], json!("French"));
    assert_eq!(body["instructions"], json!(["Mix", "Bake"]));
    assert!(body["id"].as_str().is_some());

    // Get keeps its envelope; only create is flat.
    let recipe_id = body["id"].as_str().unwrap();
    let (_, fetched) = send(&app, "GET", &format!("/api/recipes/{recipe_id}"), None, None).await;
    assert_eq!(fetched["recipe"]["name"], json!("Simple Bread"));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;

    // Empty name.
    let (status, _) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&token),
        Some(json!({ "name": " ", "cuisine": "French", "ingredients": [], "instructions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Ingredient without a name.
    let (status, _) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&token),
        Some(json!({
            "name": "Bread",
            "cuisine": "French",
            "ingredients": [{ "name": "", "quantity": "1", "unit": "cup" }],
            "instructions": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_404() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/recipes/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Malformed ids are normalized to 404 rather than surfacing as errors.
    let (status, body) = send(&app, "GET", "/api/recipes/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Recipe not found"));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/recipes/not-a-uuid",
        Some(&token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/recipes/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Listing & Search ---

async fn seed_recipes(app: &Router, token: &str) {
    for (name, cuisine) in [
        ("Pasta Carbonara", "Italian"),
        ("Tacos", "Mexican"),
        ("Pasta Salad", "American"),
    ] {
        let (status, _) = send(
            app,
            "POST",
            "/api/recipes",
            Some(token),
            Some(json!({
                "name": name,
                "cuisine": cuisine,
                "ingredients": [{ "name": "Salt", "quantity": "1", "unit": "tsp" }],
                "instructions": ["Cook"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        // Keep creation timestamps strictly increasing for the ordering check.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_list_orders_newest_first_and_populates_owner() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;
    seed_recipes(&app, &token).await;

    let (status, body) = send(&app, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 3);
    assert_eq!(recipes[0]["name"], json!("Pasta Salad"));
    assert_eq!(recipes[2]["name"], json!("Pasta Carbonara"));
    for recipe in recipes {
        assert_eq!(recipe["owner_username"], json!("amy"));
    }
}

#[tokio::test]
async fn test_search_by_name_case_insensitive() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;
    seed_recipes(&app, &token).await;

    let (status, body) = send(&app, "GET", "/api/recipes?type=name&search=Pasta", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Pasta Salad", "Pasta Carbonara"]);

    // Matching is case-insensitive in both directions.
    let (_, body) = send(&app, "GET", "/api/recipes?type=name&search=pAsTa", None, None).await;
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_by_cuisine() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;
    seed_recipes(&app, &token).await;

    let (_, body) = send(&app, "GET", "/api/recipes?type=cuisine&search=ital", None, None).await;
    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0]["name"], json!("Pasta Carbonara"));
}

#[tokio::test]
async fn test_unrecognized_type_and_blank_search_return_everything() {
    let (app, _) = app();
    let (token, _) = register_and_login(&app, "amy", "a@x.com").await;
    seed_recipes(&app, &token).await;

    // Unrecognized field selector: the filter is simply not applied.
    let (_, body) = send(
        &app,
        "GET",
        "/api/recipes?type=author&search=Pasta",
        None,
        None,
    )
    .await;
    assert_eq!(body["recipes"].as_array().unwrap().len(), 3);

    // Whitespace-only search term: unfiltered.
    let (_, body) = send(&app, "GET", "/api/recipes?type=name&search=%20%20", None, None).await;
    assert_eq!(body["recipes"].as_array().unwrap().len(), 3);

    // A page parameter is accepted but has no effect, whatever its value.
    let (_, body) = send(&app, "GET", "/api/recipes?page=2", None, None).await;
    assert_eq!(body["recipes"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, "GET", "/api/recipes?page=abc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 3);
}

// --- End-to-end scenario ---

#[tokio::test]
async fn test_full_scenario() {
    let (app, _) = app();

    // register amy -> 201; login -> 200 with token.
    let (amy_token, amy_id) = register_and_login(&app, "amy", "a@x.com").await;

    // create recipe with amy's token -> 201 owned by amy.
    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(&amy_token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner_id"], json!(amy_id.to_string()));
    let recipe_id = body["id"].as_str().unwrap().to_string();

    // update with a different registered user's token -> 403.
    let (bob_token, _) = register_and_login(&app, "bob", "b@x.com").await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/recipes/{recipe_id}"),
        Some(&bob_token),
        Some(sample_recipe()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // delete with amy's token -> 200; subsequent get -> 404.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/recipes/{recipe_id}"),
        Some(&amy_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/recipes/{recipe_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
