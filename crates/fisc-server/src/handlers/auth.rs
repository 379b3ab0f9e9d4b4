//! Signup and login handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;

use fisc_core::auth::{hash_password, issue_token, verify_password, TOKEN_TTL_SECS};

use crate::{AppError, AppState, TOKEN_COOKIE};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Build the session cookie carrying a freshly issued token.
fn session_cookie(state: &AppState, user_id: i64) -> Result<Cookie<'static>, AppError> {
    let token = issue_token(user_id, &state.config.jwt_secret)?;
    let mut cookie = Cookie::new(TOKEN_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.secure_cookies);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(TOKEN_TTL_SECS));
    Ok(cookie)
}

fn user_body(user_id: i64, email: &str, token: &str) -> serde_json::Value {
    serde_json::json!({
        "user": { "id": user_id, "email": email },
        // Also returned in the body for non-browser clients using Bearer auth.
        "token": token,
    })
}

/// POST /api/auth/signup - Register a new account and start a session
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, CookieJar, Json<serde_json::Value>), AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = match state.db.create_user(&email, &password_hash) {
        Ok(id) => id,
        Err(fisc_core::Error::Validation(_)) => {
            return Err(AppError::conflict("Email already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id, "User registered");

    let cookie = session_cookie(&state, user_id)?;
    let body = user_body(user_id, &email, cookie.value());
    Ok((StatusCode::CREATED, jar.add(cookie), Json(body)))
}

/// POST /api/auth/login - Verify credentials and start a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    info!(user_id = user.id, "User logged in");

    let cookie = session_cookie(&state, user.id)?;
    let body = user_body(user.id, &user.email, cookie.value());
    Ok((jar.add(cookie), Json(body)))
}
