use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::{Role, User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> AppResult<String> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }

    pub fn create_jwt(state: &Arc<AppState>, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(state.config.jwt.expiration_hours);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn decode_jwt(state: &Arc<AppState>, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub async fn get_user_from_token(state: &Arc<AppState>, token: &str) -> AppResult<User> {
        let claims = Self::decode_jwt(state, token)?;
        UserRepository::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Check credentials and issue a token.
    pub async fn login(
        state: &Arc<AppState>,
        email: &str,
        password: &str,
    ) -> AppResult<(User, String)> {
        let user = match UserRepository::find_by_email(&state.db, email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Login attempt for unknown email");
                return Err(AppError::Unauthorized);
            }
        };

        if !Self::verify_password(password, &user.password_hash)? {
            tracing::debug!("Login attempt with wrong password for user {}", user.id);
            return Err(AppError::Unauthorized);
        }

        let token = Self::create_jwt(state, &user.id)?;
        tracing::info!("User {} logged in", user.id);
        Ok((user, token))
    }

    /// Create the configured administrator unless an admin account already exists.
    pub async fn seed_admin(state: &Arc<AppState>) -> AppResult<Option<User>> {
        let admin = &state.config.bootstrap_admin;
        let (Some(email), Some(password)) = (&admin.email, &admin.password) else {
            return Ok(None);
        };

        if UserRepository::count_by_role(&state.db, Role::Admin).await? > 0 {
            tracing::debug!("Admin account already present; skipping bootstrap");
            return Ok(None);
        }

        if UserRepository::find_by_email(&state.db, email).await?.is_some() {
            return Err(AppError::Config(format!(
                "ADMIN_EMAIL {} belongs to an existing non-admin account",
                email
            )));
        }

        let hash = Self::hash_password(password)?;
        let user =
            UserRepository::create(&state.db, email, &admin.full_name, &hash, Role::Admin).await?;
        tracing::info!("Bootstrap admin {} created", user.email);
        Ok(Some(user))
    }
}
