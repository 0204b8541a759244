use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document stored in the `users` collection. `password` and `refreshToken`
/// stay server-side; responses go through [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub watch_history: Vec<ObjectId>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Sanitized user: never carries the password hash or the refresh token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history.iter().map(|id| id.to_hex()).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub fullname: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Output of the channel-profile aggregation; ids are projected to strings
/// with `$toString` so this deserializes straight from the pipeline.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            username: "chai".to_string(),
            email: "chai@example.com".to_string(),
            fullname: "Chai Aur Code".to_string(),
            avatar: "http://localhost:8000/media/a.png".to_string(),
            cover_image: String::new(),
            password: "$2b$12$hash".to_string(),
            refresh_token: Some("token".to_string()),
            watch_history: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn user_response_strips_credentials() {
        let user = sample_user();
        let response = UserResponse::from(user);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("refreshToken").is_none());
        assert_eq!(value["username"], "chai");
        assert!(value.get("coverImage").is_some());
    }

    #[test]
    fn user_document_uses_camel_case_fields() {
        let user = sample_user();
        let doc = mongodb::bson::to_document(&user).unwrap();
        assert!(doc.contains_key("watchHistory"));
        assert!(doc.contains_key("refreshToken"));
        assert!(doc.contains_key("coverImage"));
        assert!(doc.contains_key("password"));
        assert!(doc.contains_key("_id"));
    }

    #[test]
    fn watch_history_ids_are_hex_strings() {
        let mut user = sample_user();
        let watched = ObjectId::new();
        user.watch_history = vec![watched];

        let response = UserResponse::from(user);
        assert_eq!(response.watch_history, vec![watched.to_hex()]);
    }

    #[test]
    fn unset_id_is_omitted_on_insert() {
        let mut user = sample_user();
        user.id = None;
        let doc = mongodb::bson::to_document(&user).unwrap();
        assert!(!doc.contains_key("_id"));
    }
}
