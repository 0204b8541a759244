use crate::api::ensure_owner;
use crate::auth::AuthenticatedUser;
use crate::error::{parse_object_id, ApiError};
use crate::models::{ApiResponse, UpdateVideoRequest, User, Video, VideoResponse};
use crate::services::{read_form, MediaStore};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;
use utoipa::ToSchema;

fn videos(db: &Database) -> mongodb::Collection<Video> {
    db.collection::<Video>("videos")
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub limit: Option<u64>,
    /// Restrict the listing to one owner's published videos.
    pub user_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/videos",
    responses(
        (status = 201, description = "Video published", body = VideoResponse),
        (status = 400, description = "Missing field or file"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn publish_video(
    user: AuthenticatedUser,
    payload: Multipart,
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;
    let title = form.require("title")?.to_string();
    let description = form.require("description")?.to_string();
    let duration: f64 = form
        .require("duration")?
        .parse()
        .map_err(|_| ApiError::bad_request("duration must be a number of seconds"))?;

    let video_file = media.store(form.require_file("videoFile")?).await?;
    let thumbnail = media.store(form.require_file("thumbnail")?).await?;

    let now = Utc::now();
    let video = Video {
        id: None,
        title,
        description,
        video_file,
        thumbnail,
        duration,
        views: 0,
        is_published: true,
        owner: user.user_id,
        created_at: now,
        updated_at: now,
    };

    let inserted = videos(&db).insert_one(&video, None).await?;
    let created = videos(&db)
        .find_one(doc! {"_id": inserted.inserted_id.clone()}, None)
        .await?
        .ok_or_else(|| ApiError::internal("Video was not published"))?;

    Ok(HttpResponse::Created().json(ApiResponse::created(
        VideoResponse::from(created),
        "Video published successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 10)"),
        ("userId" = Option<String>, Query, description = "Filter by owner")
    ),
    responses(
        (status = 200, description = "Published videos, newest first", body = Vec<VideoResponse>)
    ),
    tag = "videos"
)]
pub async fn get_videos(
    query: web::Query<VideoListQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let skip = page.saturating_sub(1).saturating_mul(limit);

    let mut filter = doc! {"isPublished": true};
    if let Some(user_id) = query.user_id.as_deref() {
        filter.insert("owner", parse_object_id(user_id, "user")?);
    }

    let options = FindOptions::builder()
        .sort(doc! {"createdAt": -1})
        .skip(skip)
        .limit(limit as i64)
        .build();
    let mut cursor = videos(&db).find(filter, options).await?;

    let mut results = Vec::new();
    while cursor.advance().await? {
        results.push(VideoResponse::from(cursor.deserialize_current()?));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(results, "Videos fetched successfully")))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{video_id}",
    params(("video_id" = String, Path, description = "Video id")),
    responses(
        (status = 200, description = "The video; records a view and updates the caller's watch history", body = VideoResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Video not found")
    ),
    tag = "videos"
)]
pub async fn get_video(
    path: web::Path<String>,
    caller: Option<AuthenticatedUser>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;

    let mut video = videos(&db)
        .find_one(doc! {"_id": video_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    videos(&db)
        .update_one(doc! {"_id": video_id}, doc! {"$inc": {"views": 1}}, None)
        .await?;
    video.views += 1;

    if let Some(caller) = caller {
        db.collection::<User>("users")
            .update_one(
                doc! {"_id": caller.user_id},
                doc! {"$addToSet": {"watchHistory": video_id}},
                None,
            )
            .await?;
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        VideoResponse::from(video),
        "Video fetched successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/videos/{video_id}",
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Video updated", body = VideoResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn update_video(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<UpdateVideoRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Title and description are required"));
    }

    let video = videos(&db)
        .find_one(doc! {"_id": video_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    ensure_owner(&video.owner, &user.user_id, "video")?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = videos(&db)
        .find_one_and_update(
            doc! {"_id": video_id},
            doc! {"$set": {
                "title": req.title.trim(),
                "description": req.description.trim(),
                "updatedAt": Utc::now().timestamp(),
            }},
            options,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        VideoResponse::from(updated),
        "Video updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/videos/{video_id}",
    responses(
        (status = 200, description = "Video deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn delete_video(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;

    let video = videos(&db)
        .find_one(doc! {"_id": video_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    ensure_owner(&video.owner, &user.user_id, "video")?;

    videos(&db).delete_one(doc! {"_id": video_id}, None).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Video deleted successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/videos/toggle/publish/{video_id}",
    responses(
        (status = 200, description = "Publish flag flipped", body = VideoResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn toggle_publish(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id(&path.into_inner(), "video")?;

    let video = videos(&db)
        .find_one(doc! {"_id": video_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    ensure_owner(&video.owner, &user.user_id, "video")?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = videos(&db)
        .find_one_and_update(
            doc! {"_id": video_id},
            doc! {"$set": {
                "isPublished": !video.is_published,
                "updatedAt": Utc::now().timestamp(),
            }},
            options,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        VideoResponse::from(updated),
        "Publish status toggled successfully",
    )))
}
