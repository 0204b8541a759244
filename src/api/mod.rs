pub mod comment;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod user;
pub mod video;

use crate::error::ApiError;
use crate::models::{
    AuthResponse, ChangePasswordRequest, ChannelProfileResponse, CommentRequest, CommentResponse,
    CommentWithOwner, LoginRequest, OwnerBrief, PlaylistDetail, PlaylistOwnerBrief,
    PlaylistRequest, PlaylistResponse, PlaylistSummary, PlaylistVideoBrief, RefreshTokenRequest,
    SubscriptionToggleResponse, TokenPairResponse, ToggleResponse, UpdateAccountRequest,
    UpdateVideoRequest, UserResponse, VideoResponse, VideoWithOwner,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use utoipa::{Modify, OpenApi, ToSchema};

/// Single ownership predicate applied by every owner-gated mutation.
pub(crate) fn ensure_owner(
    owner: &ObjectId,
    caller: &ObjectId,
    what: &str,
) -> Result<(), ApiError> {
    if owner == caller {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Only the owner can modify this {}",
            what
        )))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn skip_limit(&self, default_limit: u64) -> (u64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, 100);
        (page.saturating_sub(1).saturating_mul(limit), limit as i64)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // User endpoints
        user::register,
        user::login,
        user::logout,
        user::refresh_token,
        user::change_password,
        user::current_user,
        user::update_account,
        user::update_avatar,
        user::update_cover_image,
        user::channel_profile,
        user::watch_history,
        // Video endpoints
        video::publish_video,
        video::get_videos,
        video::get_video,
        video::update_video,
        video::delete_video,
        video::toggle_publish,
        // Comment endpoints
        comment::get_video_comments,
        comment::add_comment,
        comment::update_comment,
        comment::delete_comment,
        // Like endpoints
        like::toggle_video_like,
        like::toggle_comment_like,
        like::toggle_tweet_like,
        like::get_liked_videos,
        // Playlist endpoints
        playlist::create_playlist,
        playlist::get_user_playlists,
        playlist::get_playlist,
        playlist::add_video_to_playlist,
        playlist::remove_video_from_playlist,
        playlist::update_playlist,
        playlist::delete_playlist,
        // Subscription endpoints
        subscription::toggle_subscription,
    ),
    components(schemas(
        // User schemas
        LoginRequest,
        AuthResponse,
        TokenPairResponse,
        RefreshTokenRequest,
        ChangePasswordRequest,
        UpdateAccountRequest,
        UserResponse,
        ChannelProfileResponse,
        // Video schemas
        VideoResponse,
        VideoWithOwner,
        OwnerBrief,
        UpdateVideoRequest,
        video::VideoListQuery,
        // Comment schemas
        CommentRequest,
        CommentResponse,
        CommentWithOwner,
        // Like schemas
        ToggleResponse,
        // Playlist schemas
        PlaylistRequest,
        PlaylistResponse,
        PlaylistSummary,
        PlaylistDetail,
        PlaylistOwnerBrief,
        PlaylistVideoBrief,
        // Subscription schemas
        SubscriptionToggleResponse,
        // Query schemas
        PageQuery,
    )),
    tags(
        (name = "users", description = "Accounts, sessions and profile views"),
        (name = "videos", description = "Video publishing and playback"),
        (name = "comments", description = "Comments on videos"),
        (name = "likes", description = "Like toggles"),
        (name = "playlists", description = "Playlist management"),
        (name = "subscriptions", description = "Channel subscriptions"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_predicate() {
        let owner = ObjectId::new();
        let other = ObjectId::new();
        assert!(ensure_owner(&owner, &owner, "comment").is_ok());

        let err = ensure_owner(&owner, &other, "comment").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn page_query_defaults_and_clamps() {
        let query = PageQuery {
            page: None,
            limit: None,
        };
        assert_eq!(query.skip_limit(10), (0, 10));

        let query = PageQuery {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(query.skip_limit(10), (40, 20));

        let query = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.skip_limit(10), (0, 100));
    }

    #[test]
    fn huge_page_number_saturates_instead_of_overflowing() {
        let query = PageQuery {
            page: Some(u64::MAX),
            limit: Some(100),
        };
        assert_eq!(query.skip_limit(10), (u64::MAX, 100));
    }
}
