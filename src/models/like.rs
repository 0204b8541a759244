use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Join document: presence means "liked". Exactly one of `video`, `comment`
/// or `tweet` is set; the unset targets are omitted from the stored document
/// so the partial unique indexes apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub liked_by: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<ObjectId>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn for_video(liked_by: ObjectId, video: ObjectId) -> Self {
        Like {
            id: None,
            liked_by,
            video: Some(video),
            comment: None,
            tweet: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_comment(liked_by: ObjectId, comment: ObjectId) -> Self {
        Like {
            id: None,
            liked_by,
            video: None,
            comment: Some(comment),
            tweet: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_tweet(liked_by: ObjectId, tweet: ObjectId) -> Self {
        Like {
            id: None,
            liked_by,
            video: None,
            comment: None,
            tweet: Some(tweet),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResponse {
    pub liked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_targets_are_omitted_from_the_document() {
        let like = Like::for_video(ObjectId::new(), ObjectId::new());
        let doc = mongodb::bson::to_document(&like).unwrap();
        assert!(doc.contains_key("video"));
        assert!(doc.contains_key("likedBy"));
        assert!(!doc.contains_key("comment"));
        assert!(!doc.contains_key("tweet"));
    }

    #[test]
    fn comment_like_targets_only_the_comment() {
        let like = Like::for_comment(ObjectId::new(), ObjectId::new());
        let doc = mongodb::bson::to_document(&like).unwrap();
        assert!(doc.contains_key("comment"));
        assert!(!doc.contains_key("video"));
        assert!(!doc.contains_key("tweet"));
    }
}
