use crate::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Short-lived token attached to every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // user id (hex)
    pub username: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Long-lived token used only to mint a new pair; carries the user id alone.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_access_token(
    user_id: &str,
    username: &str,
    email: &str,
    config: &JwtConfig,
) -> Result<String, anyhow::Error> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        exp: (now + Duration::minutes(config.access_expiry_minutes)).timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_ref()),
    )?;
    Ok(token)
}

pub fn create_refresh_token(user_id: &str, config: &JwtConfig) -> Result<String, anyhow::Error> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        exp: (now + Duration::days(config.refresh_expiry_days)).timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_ref()),
    )?;
    Ok(token)
}

pub fn verify_access_token(token: &str, config: &JwtConfig) -> Result<AccessClaims, anyhow::Error> {
    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.access_secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn verify_refresh_token(
    token: &str,
    config: &JwtConfig,
) -> Result<RefreshClaims, anyhow::Error> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
