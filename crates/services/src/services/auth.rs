//! Account signup, login and token verification against the users table.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Duration;
use db::models::user::{CreateUser, LoginRequest, SignupRequest, TokenResponse, User, UserInfo};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::jwt::{Claims, JwtError, TokenKeys};

use super::config::Config;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Token(#[from] JwtError),
    #[error("user not found")]
    NotFound,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone)]
pub struct AuthService {
    pool: SqlitePool,
    keys: TokenKeys,
    allowed_email_domain: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            keys: TokenKeys::new(config.jwt_secret.as_bytes()),
            allowed_email_domain: config.allowed_email_domain.clone(),
            token_ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    /// Register a campus account. The role is fixed here, at creation, and
    /// defaults to student.
    pub async fn signup(&self, request: SignupRequest) -> Result<TokenResponse, AuthServiceError> {
        self.check_email_domain(&request.email)?;
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthServiceError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if User::find_by_email(&self.pool, &request.email).await?.is_some() {
            return Err(AuthServiceError::InvalidInput(
                "email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let user = User::create(
            &self.pool,
            &CreateUser {
                email: request.email,
                password_hash,
                full_name: request.full_name,
                role: request.role.unwrap_or_default(),
            },
        )
        .await?;

        info!(user_id = user.id, role = %user.role, "account created");
        self.issue_token(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthServiceError> {
        self.check_email_domain(&request.email)?;

        let user = User::find_by_email(&self.pool, &request.email)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthServiceError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(request.password.as_bytes(), &parsed)
            .map_err(|_| AuthServiceError::InvalidCredentials)?;

        self.issue_token(user)
    }

    /// Verify a bearer token and return its claims. Expired or malformed
    /// tokens surface as a token error; the caller maps it to 401.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthServiceError> {
        Ok(self.keys.verify(token)?)
    }

    /// Resolve the account behind a verified token's subject.
    pub async fn current_user(&self, email: &str) -> Result<UserInfo, AuthServiceError> {
        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or(AuthServiceError::NotFound)?;
        Ok(user.into())
    }

    fn check_email_domain(&self, email: &str) -> Result<(), AuthServiceError> {
        if !email.ends_with(&self.allowed_email_domain) {
            return Err(AuthServiceError::InvalidInput(format!(
                "only {} emails are allowed",
                self.allowed_email_domain
            )));
        }
        Ok(())
    }

    fn issue_token(&self, user: User) -> Result<TokenResponse, AuthServiceError> {
        let claims = Claims::new(&user.email, user.id, user.role.to_string(), self.token_ttl);
        let access_token = self.keys.encode(&claims)?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            user: user.into(),
        })
    }
}

fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthServiceError::Hash(e.to_string()))
}
