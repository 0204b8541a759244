use crate::auth::verify_access_token;
use crate::config::Config;
use crate::error::ApiError;
use actix_web::{web, Error, FromRequest, HttpRequest};
use mongodb::bson::oid::ObjectId;
use std::future::{ready, Ready};

/// Authenticated caller, extracted from the `Authorization: Bearer` header or
/// the `accessToken` cookie set on login.
pub struct AuthenticatedUser {
    pub user_id: ObjectId,
    #[allow(dead_code)]
    pub username: String,
    #[allow(dead_code)]
    pub email: String,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(header_value) = req.headers().get("Authorization") {
        if let Ok(header_str) = header_value.to_str() {
            if let Some(token) = header_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    req.cookie("accessToken").map(|c| c.value().to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(token) = bearer_token(req) {
            if let Some(config) = req.app_data::<web::Data<Config>>() {
                match verify_access_token(&token, &config.jwt) {
                    Ok(claims) => {
                        if let Ok(user_id) = ObjectId::parse_str(&claims.sub) {
                            return ready(Ok(AuthenticatedUser {
                                user_id,
                                username: claims.username,
                                email: claims.email,
                            }));
                        }
                    }
                    Err(_) => {
                        return ready(Err(ApiError::unauthorized("Invalid access token").into()));
                    }
                }
            }
        }

        ready(Err(ApiError::unauthorized("Unauthorized request").into()))
    }
}
