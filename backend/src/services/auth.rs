//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::UserProfile;
use shared::types::Role;
use shared::validation::{
    normalize_email, validate_contact_number, validate_email, validate_password,
    validate_passwords_match, validate_sex,
};

use crate::config::{AdminConfig, Config};
use crate::error::{AppError, AppResult};

/// Columns selected whenever a [`UserProfile`] is loaded
pub(crate) const USER_COLUMNS: &str = "id, email, first_name, last_name, role, age, contact_number, \
     purok, barangay, municipal, province, sex, is_active, created_at";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a citizen account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 254, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Last name is required"))]
    pub last_name: String,
    pub password: String,
    pub password2: String,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub sex: Option<String>,
    #[validate(length(max = 50))]
    pub purok: Option<String>,
    #[validate(length(max = 100))]
    pub barangay: Option<String>,
    #[validate(length(max = 100))]
    pub municipal: Option<String>,
    #[validate(length(max = 100))]
    pub province: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
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
}

/// Successful login: tokens plus the profile claims echoed in the body
#[derive(Debug)]
pub struct LoginOutcome {
    pub tokens: AuthTokens,
    pub user: UserProfile,
}

/// User row including the password hash (never serialized)
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    profile: UserProfile,
    password_hash: String,
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

    /// Register a new citizen account with the `user` role
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserProfile> {
        validate_registration(&input)?;
        let email = normalize_email(&input.email);

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if existing {
            return Err(email_taken());
        }

        let password_hash = hash_password(input.password).await?;

        let user = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role, first_name, last_name, age,
                               contact_number, sex, purok, barangay, municipal, province)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&email)
        .bind(&password_hash)
        .bind(Role::User.as_str())
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.age)
        .bind(&input.contact_number)
        .bind(&input.sex)
        .bind(&input.purok)
        .bind(&input.barangay)
        .bind(&input.municipal)
        .bind(&input.province)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => email_taken(),
            _ => AppError::from(e),
        })?;

        tracing::info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !row.profile.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        if !verify_password(password.to_string(), row.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(row.profile.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(&row.profile)?;
        self.store_refresh_token(row.profile.id, &tokens.refresh_token)
            .await?;

        Ok(LoginOutcome {
            tokens,
            user: row.profile,
        })
    }

    /// Refresh access token using refresh token; the old refresh token is revoked
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE u.id = rt.user_id
              AND rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            RETURNING rt.user_id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let tokens = self.generate_tokens(&user)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(hash_token(&tokens.refresh_token))
        .bind(Utc::now() + Duration::seconds(self.refresh_token_expiry))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    /// Create the configured bootstrap admin if it does not exist yet.
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<bool> {
        let (Some(email), Some(password)) = (admin.email.as_deref(), admin.password.as_deref())
        else {
            return Ok(false);
        };

        validate_email(email).map_err(|m| AppError::Configuration(format!("admin.email: {m}")))?;
        validate_password(password)
            .map_err(|m| AppError::Configuration(format!("admin.password: {m}")))?;

        let email = normalize_email(email);
        let password_hash = hash_password(password.to_string()).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, role, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(Role::Admin.as_str())
        .bind(admin.first_name.as_deref().unwrap_or("System"))
        .bind(admin.last_name.as_deref().unwrap_or("Administrator"))
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &UserProfile) -> AppResult<AuthTokens> {
        let access_token = encode_access_token(user, &self.jwt_secret, self.access_token_expiry)?;

        // Refresh token (opaque random value, stored hashed)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Field-level checks that need no database access
pub fn validate_registration(input: &RegisterInput) -> AppResult<()> {
    validate_passwords_match(&input.password, &input.password2)
        .map_err(|m| AppError::validation("password", m))?;
    input.validate()?;
    validate_email(&input.email).map_err(|m| AppError::validation("email", m))?;
    validate_password(&input.password).map_err(|m| AppError::validation("password", m))?;
    validate_sex(input.sex.as_deref()).map_err(|m| AppError::validation("sex", m))?;
    if let Some(contact) = input.contact_number.as_deref() {
        validate_contact_number(contact).map_err(|m| AppError::validation("contact_number", m))?;
    }
    Ok(())
}

fn email_taken() -> AppError {
    AppError::validation("email", "This email is already registered.")
}

/// Sign an access token carrying the role and name claims
pub fn encode_access_token(user: &UserProfile, secret: &str, expiry_secs: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate access token and return claims
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "maria@example.com".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            role,
            age: Some(34),
            contact_number: None,
            purok: None,
            barangay: Some("Poblacion".to_string()),
            municipal: Some("Maramag".to_string()),
            province: Some("Bukidnon".to_string()),
            sex: Some("female".to_string()),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn registration(password: &str, password2: &str) -> RegisterInput {
        RegisterInput {
            email: "juan@example.com".to_string(),
            first_name: "Juan".to_string(),
            last_name: "Dela Cruz".to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
            age: Some(40),
            contact_number: Some("09171234567".to_string()),
            sex: Some("male".to_string()),
            purok: None,
            barangay: None,
            municipal: None,
            province: None,
        }
    }

    #[test]
    fn test_access_token_embeds_role_and_names() {
        let user = profile(Role::Admin);
        let token = encode_access_token(&user, SECRET, 3600).unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.first_name, "Maria");
        assert_eq!(claims.last_name, "Santos");
        assert_eq!(claims.email, "maria@example.com");
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let token = encode_access_token(&profile(Role::User), SECRET, -3600).unwrap();
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = encode_access_token(&profile(Role::User), "other-secret", 3600).unwrap();
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_token_hash_is_stable_and_opaque() {
        let token = "5b1f4f0e-8d6c-4f35-9f57-3c8d2f1c9a10";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), token);
        assert_eq!(hash_token(token).len(), 64);
    }

    #[test]
    fn test_registration_password_mismatch() {
        let err = validate_registration(&registration("s3cure-pass", "s3cure-pasz")).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "password"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_registration_rejects_bad_sex_and_age() {
        let mut input = registration("s3cure-pass", "s3cure-pass");
        input.sex = Some("unknown".to_string());
        assert!(validate_registration(&input).is_err());

        let mut input = registration("s3cure-pass", "s3cure-pass");
        input.age = Some(200);
        assert!(validate_registration(&input).is_err());
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(validate_registration(&registration("s3cure-pass", "s3cure-pass")).is_ok());
    }
}
