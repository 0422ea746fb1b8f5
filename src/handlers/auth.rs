//! Authentication handlers
//!
//! Accounts are a fixed set seeded from configuration at boot; login issues
//! an HS256 JWT carrying the username and role claim.

use axum::{extract::State, Json};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::{AppState, AppError, AppResult};
use crate::config::Config;
use crate::models::{LoginRequest, LoginResponse, User, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Username
    pub role: String,     // User role
    pub exp: usize,       // Expiration timestamp
    pub iat: usize,       // Issued at
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .store
        .find_user(&req.username)
        .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    // Generate JWT
    let token = generate_jwt(user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    tracing::info!("login: {} ({})", user.username, user.role.as_str());

    Ok(Json(LoginResponse {
        token,
        user: user.to_info(),
    }))
}

/// Generate JWT token
pub fn generate_jwt(user: &User, secret: &str, expiration_hours: u64) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours as i64);

    let claims = Claims {
        sub: user.username.clone(),
        role: user.role.as_str().to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes())
    ).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Decode and validate a JWT, returning its claims
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Build the fixed account set from configured passwords.
pub fn seed_users(config: &Config) -> Result<Vec<User>, argon2::password_hash::Error> {
    let accounts = [
        ("admin", config.admin_password.as_str(), UserRole::Admin),
        ("operator", config.operator_password.as_str(), UserRole::Operator),
        ("viewer", config.viewer_password.as_str(), UserRole::Viewer),
    ];

    let mut users = Vec::with_capacity(accounts.len());
    for (username, password, role) in accounts {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        users.push(User {
            username: username.to_string(),
            password_hash,
            role,
        });
    }

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            username: "tester".to_string(),
            password_hash: String::new(),
            role,
        }
    }

    #[test]
    fn jwt_claims_round_trip_with_role() {
        let token = generate_jwt(&user(UserRole::Operator), "secret", 1).unwrap();
        let claims = decode_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, "tester");
        assert_eq!(claims.role, "operator");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt(&user(UserRole::Admin), "secret", 1).unwrap();
        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(AppError::TokenInvalid)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: "tester".to_string(),
            role: "admin".to_string(),
            exp: (now - Duration::hours(2)).timestamp() as usize,
            iat: (now - Duration::hours(3)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            decode_token(&token, "secret"),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn seeded_passwords_verify() {
        let config = Config::from_env();
        let users = seed_users(&config).unwrap();
        assert_eq!(users.len(), 3);

        let admin = users.iter().find(|u| u.username == "admin").unwrap();
        let parsed = PasswordHash::new(&admin.password_hash).unwrap();
        assert!(Argon2::default()
            .verify_password(config.admin_password.as_bytes(), &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"not-the-password", &parsed)
            .is_err());
    }
}
