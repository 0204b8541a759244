use crate::auth::AuthenticatedUser;
use crate::error::{is_duplicate_key, parse_object_id, ApiError};
use crate::models::{ApiResponse, Like, ToggleResponse, VideoWithOwner};
use actix_web::{web, HttpResponse};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

fn likes(db: &Database) -> mongodb::Collection<Like> {
    db.collection::<Like>("likes")
}

/// Atomic existence toggle: delete-if-present, else insert. The partial
/// unique index on (likedBy, target) makes a racing duplicate insert fail
/// with a duplicate-key error, which collapses to the "liked" outcome.
async fn toggle(
    db: &Database,
    caller: ObjectId,
    target_field: &str,
    target_id: ObjectId,
    like: Like,
) -> Result<bool, ApiError> {
    let mut filter = doc! {"likedBy": caller};
    filter.insert(target_field, target_id);
    if likes(db).find_one_and_delete(filter, None).await?.is_some() {
        return Ok(false);
    }

    match likes(db).insert_one(&like, None).await {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_key(&e) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn toggle_response(liked: bool) -> HttpResponse {
    let message = if liked {
        "Like added successfully"
    } else {
        "Like removed successfully"
    };
    HttpResponse::Ok().json(ApiResponse::ok(ToggleResponse { liked }, message))
}

#[utoipa::path(
    post,
    path = "/api/v1/likes/toggle/v/{video_id}",
    responses(
        (status = 200, description = "Like toggled", body = ToggleResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn toggle_video_like(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;
    let like = Like::for_video(user.user_id, video_id);
    let liked = toggle(&db, user.user_id, "video", video_id, like).await?;
    Ok(toggle_response(liked))
}

#[utoipa::path(
    post,
    path = "/api/v1/likes/toggle/c/{comment_id}",
    responses(
        (status = 200, description = "Like toggled", body = ToggleResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn toggle_comment_like(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = parse_object_id(&path.into_inner(), "comment")?;
    let like = Like::for_comment(user.user_id, comment_id);
    let liked = toggle(&db, user.user_id, "comment", comment_id, like).await?;
    Ok(toggle_response(liked))
}

#[utoipa::path(
    post,
    path = "/api/v1/likes/toggle/t/{tweet_id}",
    responses(
        (status = 200, description = "Like toggled", body = ToggleResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn toggle_tweet_like(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = parse_object_id(&path.into_inner(), "tweet")?;
    let like = Like::for_tweet(user.user_id, tweet_id);
    let liked = toggle(&db, user.user_id, "tweet", tweet_id, like).await?;
    Ok(toggle_response(liked))
}

#[utoipa::path(
    get,
    path = "/api/v1/likes/videos",
    responses(
        (status = 200, description = "Videos the caller has liked", body = Vec<VideoWithOwner>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn get_liked_videos(
    user: AuthenticatedUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = vec![
        doc! {"$match": {"likedBy": user.user_id, "video": {"$exists": true}}},
        doc! {"$sort": {"createdAt": -1}},
        doc! {"$lookup": {
            "from": "videos",
            "localField": "video",
            "foreignField": "_id",
            "as": "video",
            "pipeline": [
                {"$lookup": {
                    "from": "users",
                    "localField": "owner",
                    "foreignField": "_id",
                    "as": "owner",
                    "pipeline": [
                        {"$project": {
                            "_id": {"$toString": "$_id"},
                            "username": 1,
                            "fullname": 1,
                            "avatar": 1,
                        }},
                    ],
                }},
                {"$addFields": {"owner": {"$first": "$owner"}}},
                {"$project": {
                    "_id": {"$toString": "$_id"},
                    "title": 1,
                    "description": 1,
                    "videoFile": 1,
                    "thumbnail": 1,
                    "duration": 1,
                    "views": 1,
                    "owner": 1,
                }},
            ],
        }},
        doc! {"$addFields": {"video": {"$first": "$video"}}},
        // A liked video may have been hard-deleted since.
        doc! {"$match": {"video": {"$ne": null}}},
        doc! {"$replaceRoot": {"newRoot": "$video"}},
    ];

    let mut cursor = likes(&db).aggregate(pipeline, None).await?;
    let mut results: Vec<VideoWithOwner> = Vec::new();
    while cursor.advance().await? {
        let row = mongodb::bson::from_document(cursor.deserialize_current()?)
            .map_err(|e| ApiError::internal(format!("Malformed liked-video row: {}", e)))?;
        results.push(row);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        results,
        "Liked videos fetched successfully",
    )))
}
