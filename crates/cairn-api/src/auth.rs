use std::sync::Arc;

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use cairn_db::Database;
use cairn_gateway::EventBus;
use cairn_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub bus: EventBus,
}

/// Tokens stay valid for 30 days.
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !(3..=32).contains(&req.username.chars().count()) {
        return Err(ApiError::BadRequest("username must be 3 to 32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    // The UNIQUE index decides, so two racing registrations cannot both win.
    state
        .db
        .create_user(&user_id.to_string(), &req.username, &password_hash)
        .map_err(|e| {
            if cairn_db::is_constraint_violation(&e) {
                ApiError::Conflict("username is taken")
            } else {
                ApiError::Internal(e)
            }
        })?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;
    info!("Registered {} ({})", req.username, user_id);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow!("stored hash for {} is unreadable: {}", user.username, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user.id.parse().map_err(anyhow::Error::from)?;
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let expires = chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS);
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: usize::try_from(expires.timestamp())?,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            bus: EventBus::new(),
        })
    }

    fn credentials(username: &str, password: &str) -> (String, String) {
        (username.to_string(), password.to_string())
    }

    async fn register_as(state: &AppState, (username, password): (String, String)) -> StatusCode {
        match register(State(state.clone()), Json(RegisterRequest { username, password })).await {
            Ok(response) => response.into_response().status(),
            Err(e) => e.status(),
        }
    }

    async fn login_as(state: &AppState, (username, password): (String, String)) -> StatusCode {
        match login(State(state.clone()), Json(LoginRequest { username, password })).await {
            Ok(response) => response.into_response().status(),
            Err(e) => e.status(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let state = state();
        assert_eq!(register_as(&state, credentials("ada", "correct horse")).await, StatusCode::CREATED);
        assert_eq!(login_as(&state, credentials("ada", "correct horse")).await, StatusCode::OK);
        assert_eq!(login_as(&state, credentials("ada", "wrong horse!")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(login_as(&state, credentials("grace", "correct horse")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let state = state();
        register_as(&state, credentials("ada", "correct horse")).await;
        assert_eq!(register_as(&state, credentials("ada", "another pass")).await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn racing_registrations_yield_one_conflict() {
        let state = state();
        let (a, b) = tokio::join!(
            tokio::spawn({
                let state = state.clone();
                async move { register_as(&state, credentials("ada", "correct horse")).await }
            }),
            tokio::spawn({
                let state = state.clone();
                async move { register_as(&state, credentials("ada", "battery staple")).await }
            }),
        );

        let mut statuses = vec![a.unwrap(), b.unwrap()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    }

    #[tokio::test]
    async fn weak_registrations_are_rejected() {
        let state = state();
        assert_eq!(register_as(&state, credentials("ab", "correct horse")).await, StatusCode::BAD_REQUEST);
        assert_eq!(register_as(&state, credentials("ada", "short")).await, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn token_round_trips_through_gateway_verification() {
        let user_id = Uuid::new_v4();
        let token = create_token("s3cret", user_id, "ada").unwrap();

        let claims = cairn_gateway::connection::verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "ada");
        assert!(cairn_gateway::connection::verify_token(&token, "other").is_none());
    }
}
