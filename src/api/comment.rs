use crate::api::{ensure_owner, PageQuery};
use crate::auth::AuthenticatedUser;
use crate::error::{parse_object_id, ApiError};
use crate::models::{ApiResponse, Comment, CommentRequest, CommentResponse, CommentWithOwner, Video};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;

fn comments(db: &Database) -> mongodb::Collection<Comment> {
    db.collection::<Comment>("comments")
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video id"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "Comments with owner details, newest first", body = Vec<CommentWithOwner>),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Video not found")
    ),
    tag = "comments"
)]
pub async fn get_video_comments(
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;
    let (skip, limit) = query.skip_limit(10);

    let video = db
        .collection::<Video>("videos")
        .find_one(doc! {"_id": video_id}, None)
        .await?;
    if video.is_none() {
        return Err(ApiError::not_found("Video not found"));
    }

    let pipeline = vec![
        doc! {"$match": {"video": video_id}},
        doc! {"$sort": {"createdAt": -1}},
        doc! {"$skip": skip as i64},
        doc! {"$limit": limit},
        doc! {"$lookup": {
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
        doc! {"$addFields": {"owner": {"$first": "$owner"}}},
        doc! {"$project": {
            "_id": {"$toString": "$_id"},
            "text": 1,
            "owner": 1,
            "createdAt": 1,
        }},
    ];

    let mut cursor = comments(&db).aggregate(pipeline, None).await?;
    let mut results: Vec<CommentWithOwner> = Vec::new();
    while cursor.advance().await? {
        let row = mongodb::bson::from_document(cursor.deserialize_current()?)
            .map_err(|e| ApiError::internal(format!("Malformed comment row: {}", e)))?;
        results.push(row);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(results, "Comments fetched successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{video_id}",
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty text or malformed id"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn add_comment(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<CommentRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text is required"));
    }

    let video = db
        .collection::<Video>("videos")
        .find_one(doc! {"_id": video_id}, None)
        .await?;
    if video.is_none() {
        return Err(ApiError::not_found("Video not found"));
    }

    let now = Utc::now();
    let comment = Comment {
        id: None,
        text: text.to_string(),
        video: video_id,
        owner: user.user_id,
        created_at: now,
        updated_at: now,
    };
    let inserted = comments(&db).insert_one(&comment, None).await?;
    let created = comments(&db)
        .find_one(doc! {"_id": inserted.inserted_id.clone()}, None)
        .await?
        .ok_or_else(|| ApiError::internal("Comment was not added"))?;

    Ok(HttpResponse::Created().json(ApiResponse::created(
        CommentResponse::from(created),
        "Comment added successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/comments/c/{comment_id}",
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn update_comment(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<CommentRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = parse_object_id(&path.into_inner(), "comment")?;
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text is required"));
    }

    let comment = comments(&db)
        .find_one(doc! {"_id": comment_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    ensure_owner(&comment.owner, &user.user_id, "comment")?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = comments(&db)
        .find_one_and_update(
            doc! {"_id": comment_id},
            doc! {"$set": {"text": text, "updatedAt": Utc::now().timestamp()}},
            options,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        CommentResponse::from(updated),
        "Comment updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/c/{comment_id}",
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn delete_comment(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = parse_object_id(&path.into_inner(), "comment")?;

    let comment = comments(&db)
        .find_one(doc! {"_id": comment_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    ensure_owner(&comment.owner, &user.user_id, "comment")?;

    comments(&db)
        .delete_one(doc! {"_id": comment_id}, None)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Comment deleted successfully",
    )))
}
