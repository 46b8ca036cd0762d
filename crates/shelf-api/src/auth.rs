use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use shelf_core::users::{self, NewUser};
use shelf_core::CoreError;
use shelf_db::Database;
use shelf_types::api::{AuthResponse, AuthUser, Claims, LoginRequest, RegisterRequest};

use crate::books::CatalogClient;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::JsonBody;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub catalog: CatalogClient,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = NewUser::validate(&req.username, &req.email, &req.password)?;

    // Hash and insert on the blocking pool
    let (user_id, new_user) = blocking(&state, move |db| {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let id = users::create(db, &new_user, &password_hash)?;
        Ok::<_, CoreError>((id, new_user))
    })
    .await?;

    let token = create_token(&state.jwt_secret, state.token_ttl, user_id, &new_user.username)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: AuthUser {
                id: user_id,
                username: new_user.username,
                email: new_user.email,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(CoreError::invalid("email and password required").into());
    }

    let user = blocking(&state, move |db| {
        let user = users::find_by_email(db, &req.email)?
            .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is corrupt: {}", user.id, e))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized("Invalid credentials"))?;

        Ok::<_, ApiError>(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, state.token_ttl, user_id, &user.username)?;

    Ok(Json(AuthResponse {
        token,
        user: AuthUser {
            id: user_id,
            username: user.username,
            email: user.email,
        },
    }))
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: Uuid,
    username: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
