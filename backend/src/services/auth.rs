//! Authentication service for user accounts, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::{Actor, CreateUserInput, Operation, Role, User};

use crate::config::{BootstrapAdminConfig, Config};
use crate::error::{AppError, AppResult};
use crate::services::ensure_allowed;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub role: Role,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: Role,
    is_active: bool,
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate user with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, is_active
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::Unauthorized("Your account is inactive".to_string()));
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user.id, &user.username, user.role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

        Ok(tokens)
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        // Revoke and read in one statement so a token is only ever redeemed once
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            WITH redeemed AS (
                UPDATE refresh_tokens
                SET revoked_at = NOW()
                WHERE token_hash = $1
                  AND expires_at > NOW()
                  AND revoked_at IS NULL
                RETURNING user_id
            )
            SELECT u.id, u.username, u.password_hash, u.role, u.is_active
            FROM users u
            JOIN redeemed r ON r.user_id = u.id
            WHERE u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        tx.commit().await?;

        let tokens = self.generate_tokens(user.id, &user.username, user.role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(refresh_token);

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(&token_hash)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Create a user account (administrators only)
    pub async fn create_user(&self, actor: &Actor, input: CreateUserInput) -> AppResult<User> {
        ensure_allowed(actor, Operation::ManageUsers)?;
        input.validate()?;
        self.insert_user(&input.username, &input.password, input.role)
            .await
    }

    /// Create the configured administrator unless an administrator already exists
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdminConfig) -> AppResult<bool> {
        let has_admin = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')",
        )
        .fetch_one(&self.db)
        .await?;

        if has_admin {
            return Ok(false);
        }

        let input = CreateUserInput {
            username: admin.username.clone(),
            password: admin.password.clone(),
            role: Role::Admin,
        };
        input.validate()?;

        let user = self
            .insert_user(&input.username, &input.password, Role::Admin)
            .await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Bootstrap administrator created");

        Ok(true)
    }

    async fn insert_user(&self, username: &str, password: &str, role: Role) -> AppResult<User> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::Conflict(format!(
                "A user named {} already exists",
                username
            )));
        }

        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, role, is_active, created_at, last_login_at
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(role)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: Uuid, username: &str, role: Role) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (opaque random token)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            role,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_claims(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(role: Role, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            username: "employee01".to_string(),
            role,
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_hash_token_is_stable_sha256_hex() {
        let a = AuthService::hash_token("token");
        assert_eq!(a, AuthService::hash_token("token"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, AuthService::hash_token("other"));
    }

    #[test]
    fn test_decode_roundtrip_keeps_role() {
        let token = encode_claims(&claims(Role::Admin, 3600), "secret");
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.username, "employee01");
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        let token = encode_claims(&claims(Role::Employee, 3600), "secret");
        assert!(matches!(
            decode_access_token(&token, "other-secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_decode_rejects_expired_token() {
        let token = encode_claims(&claims(Role::Employee, -3600), "secret");
        assert!(decode_access_token(&token, "secret").is_err());
    }
}
