use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::db::{Role, User};
use crate::error::{AppError, AppResult};
use crate::services::auth::AuthService;
use crate::AppState;

/// Cookie carrying the session JWT for browser clients.
pub const SESSION_COOKIE: &str = "facility_session";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// ============================================================================
// Handlers
// ============================================================================

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let (user, token) = AuthService::login(&state, email, &request.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.server.cookie_secure)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Json(LoginResponse { token, user })))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(serde_json::json!({ "message": crate::i18n::t("auth.logged_out") })),
    )
}

async fn me(AuthContext { user }: AuthContext) -> Json<User> {
    Json(user)
}

// ============================================================================
// Auth Extractors
// ============================================================================

/// The authenticated user behind a request.
///
/// The token is read from `Authorization: Bearer ...` first, then from the
/// session cookie.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.user.role == Role::Admin {
            Ok(())
        } else {
            tracing::debug!("User {} denied admin access", self.user.id);
            Err(AppError::Forbidden)
        }
    }

    pub fn require_operator(&self) -> AppResult<()> {
        if self.user.is_operator() {
            Ok(())
        } else {
            tracing::debug!("User {} denied operator access", self.user.id);
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    if !header.to_ascii_lowercase().starts_with("bearer ") {
        tracing::debug!("Authorization header doesn't start with 'Bearer '");
        return None;
    }
    let token = header[7..].trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(SESSION_COOKIE)
                    .map(|c| c.value().to_string())
            })
            .ok_or_else(|| {
                tracing::debug!("Request carries no session token");
                AppError::Unauthorized
            })?;

        let user = AuthService::get_user_from_token(state, &token)
            .await
            .map_err(|e| {
                tracing::debug!("Failed to get user from token: {:?}", e);
                AppError::Unauthorized
            })?;

        Ok(AuthContext { user })
    }
}

/// Admin-only pages.
pub struct AdminUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = AuthContext::from_request_parts(parts, state).await?;
        ctx.require_admin()?;
        Ok(AdminUser(ctx))
    }
}

/// Reservation desk pages, open to admins and staff.
pub struct OperatorUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OperatorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = AuthContext::from_request_parts(parts, state).await?;
        ctx.require_operator()?;
        Ok(OperatorUser(ctx))
    }
}
