use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::user::User;
use crate::error::AppError;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub exp: usize,    // Expiration time
    pub iat: usize,    // Issued at time
    pub email: String, // User email
}

#[derive(Debug)]
pub struct AuthResult {
    pub user: User,
    pub access_token: String,
    pub expires_in: u64,
}

pub struct AuthService {
    state: Arc<AppState>,
}

impl AuthService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResult, AppError> {
        // 检查邮箱是否已存在
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.state.db)
            .await?;

        if existing > 0 {
            return Err(AppError::Validation("Email already exists".to_string()));
        }

        // 哈希密码
        let password_hash = hash_password(password)?;

        // 创建用户
        let user = User::new(name, email, &password_hash);

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.state.db)
        .await?;

        self.issue_token(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AppError> {
        let user: User = sqlx::query_as(
            "SELECT id, name, email, password_hash, is_admin, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        self.issue_token(user)
    }

    /// Resolve a bearer token to its live user row. The row is re-read on
    /// every request so admin revocation takes effect immediately.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.state.config.auth.jwt_secret, token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Invalid token subject".to_string()))?;

        let user: User = sqlx::query_as(
            "SELECT id, name, email, password_hash, is_admin, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::Auth("User no longer exists".to_string()))?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as(
            "SELECT id, name, email, password_hash, is_admin, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<User, AppError> {
        let mut user = self.get_user(user_id).await?;

        if let Some(new_email) = email {
            if new_email != user.email {
                let taken: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                        .bind(&new_email)
                        .bind(user_id)
                        .fetch_one(&self.state.db)
                        .await?;
                if taken > 0 {
                    return Err(AppError::Validation("Email already exists".to_string()));
                }
                user.email = new_email;
            }
        }

        if let Some(new_name) = name {
            user.name = new_name;
        }

        if let Some(new_password) = password {
            user.password_hash = hash_password(&new_password)?;
        }

        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, password_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.state.db)
        .await?;

        Ok(user)
    }

    /// Deletes the account; orders, cart rows and wishlist rows go with it
    /// through the schema's ON DELETE CASCADE.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.state.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    fn issue_token(&self, user: User) -> Result<AuthResult, AppError> {
        let expiry_hours = self.state.config.auth.token_expiry_hours;
        let access_token = encode_token(&self.state.config.auth.jwt_secret, expiry_hours, &user)?;

        Ok(AuthResult {
            user,
            access_token,
            expires_in: expiry_hours * 3600,
        })
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn encode_token(secret: &str, expiry_hours: u64, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        exp: (now + Duration::hours(expiry_hours as i64)).timestamp() as usize,
        iat: now.timestamp() as usize,
        email: user.email.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
}

fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn token_round_trips_for_the_issuing_secret() {
        let user = User::new("Ada", "ada@example.com", "x");
        let token = encode_token("test-secret", 1, &user).unwrap();

        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "ada@example.com");

        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(matches!(
            decode_token("test-secret", "not.a.token"),
            Err(AppError::Auth(_))
        ));
    }
}
