//! Sample user resource

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// GET /api/users
pub async fn list_users() -> Json<UsersResponse> {
    Json(UsersResponse {
        users: vec![
            User {
                id: 1,
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
            },
            User {
                id: 2,
                name: "Jane Smith".to_string(),
                email: "jane@example.com".to_string(),
            },
        ],
    })
}

/// POST /api/users
///
/// Both fields are required and the email must contain `@`.
pub async fn create_user(Json(user): Json<CreateUser>) -> impl IntoResponse {
    if user.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "name is required" })),
        );
    }
    if !user.email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "email is invalid" })),
        );
    }

    let user = User {
        id: 3,
        name: user.name,
        email: user.email,
    };
    tracing::info!(user_id = user.id, "user created");

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": user,
        })),
    )
}
