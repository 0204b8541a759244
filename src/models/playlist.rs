use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub owner: ObjectId,
    #[serde(default)]
    pub videos: Vec<ObjectId>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaylistRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub videos: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl From<Playlist> for PlaylistResponse {
    fn from(playlist: Playlist) -> Self {
        PlaylistResponse {
            id: playlist.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: playlist.name,
            description: playlist.description,
            owner: playlist.owner.to_hex(),
            videos: playlist.videos.iter().map(|id| id.to_hex()).collect(),
            updated_at: playlist.updated_at,
        }
    }
}

/// One row of the per-user playlist listing, with computed totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub total_videos: i64,
    pub total_views: i64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideoBrief {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub description: String,
    pub views: i64,
    pub is_published: bool,
    pub duration: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistOwnerBrief {
    pub username: String,
    pub fullname: String,
    pub email: String,
}

/// Playlist detail view: joined videos and owner plus computed totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_videos: i64,
    pub total_views: i64,
    pub owner: PlaylistOwnerBrief,
    pub videos: Vec<PlaylistVideoBrief>,
}
