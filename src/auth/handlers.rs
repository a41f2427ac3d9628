use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest, TokenResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
}

/// Create an account and hand back a session token right away.
///
/// Deliberately collapses every failure into one 500: a duplicate
/// username, an empty field, a hashing error all read "Error creating
/// user" to the client. The logs carry the real cause.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        warn!("signup with missing fields");
        return Err(ApiError::internal(
            "Error creating user",
            anyhow::anyhow!("username and password are required"),
        ));
    }

    let hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Error creating user", e))?;

    let user = User::create(&state.db, username, &hash)
        .await
        .map_err(|e| ApiError::internal("Error creating user", e))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal("Error creating user", e))?;

    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(Json(TokenResponse { token }))
}

/// Exchange credentials for a session token. Unknown username and wrong
/// password are indistinguishable to the caller.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = match User::find_by_username(&state.db, payload.username.trim()).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(username = %payload.username, "login unknown username");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(ApiError::internal("Error logging in", e)),
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::internal("Error logging in", e))?;

    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal("Error logging in", e))?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse { token }))
}

/// Resolve the bearer token back to its user record (sans hash, the
/// serializer skips it). The token can outlive the account, hence 404.
#[instrument(skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "token subject no longer exists");
            ApiError::NotFound("User")
        })?;

    Ok(Json(user))
}
