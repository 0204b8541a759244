use crate::api::ensure_owner;
use crate::auth::AuthenticatedUser;
use crate::error::{parse_object_id, ApiError};
use crate::models::{
    ApiResponse, Playlist, PlaylistDetail, PlaylistRequest, PlaylistResponse, PlaylistSummary,
    Video,
};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;

fn playlists(db: &Database) -> mongodb::Collection<Playlist> {
    db.collection::<Playlist>("playlists")
}

async fn load_playlist(db: &Database, id: ObjectId) -> Result<Playlist, ApiError> {
    playlists(db)
        .find_one(doc! {"_id": id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))
}

#[utoipa::path(
    post,
    path = "/api/v1/playlists",
    request_body = PlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = PlaylistResponse),
        (status = 400, description = "Missing name or description"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "playlists"
)]
pub async fn create_playlist(
    user: AuthenticatedUser,
    req: web::Json<PlaylistRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    if req.name.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Name and description are required"));
    }

    let now = Utc::now();
    let playlist = Playlist {
        id: None,
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        owner: user.user_id,
        videos: vec![],
        created_at: now,
        updated_at: now,
    };
    let inserted = playlists(&db).insert_one(&playlist, None).await?;
    let created = playlists(&db)
        .find_one(doc! {"_id": inserted.inserted_id.clone()}, None)
        .await?
        .ok_or_else(|| ApiError::internal("Playlist was not created"))?;

    Ok(HttpResponse::Created().json(ApiResponse::created(
        PlaylistResponse::from(created),
        "Playlist created successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/playlists/user/{user_id}",
    params(("user_id" = String, Path, description = "Owner id")),
    responses(
        (status = 200, description = "The user's playlists with totals", body = Vec<PlaylistSummary>),
        (status = 400, description = "Malformed id")
    ),
    tag = "playlists"
)]
pub async fn get_user_playlists(
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = parse_object_id(&path.into_inner(), "user")?;

    let pipeline = vec![
        doc! {"$match": {"owner": owner_id}},
        doc! {"$lookup": {
            "from": "videos",
            "localField": "videos",
            "foreignField": "_id",
            "as": "videos",
        }},
        doc! {"$addFields": {
            "totalVideos": {"$size": "$videos"},
            "totalViews": {"$sum": "$videos.views"},
        }},
        doc! {"$project": {
            "_id": {"$toString": "$_id"},
            "name": 1,
            "description": 1,
            "owner": {"$toString": "$owner"},
            "totalVideos": 1,
            "totalViews": 1,
            "updatedAt": 1,
        }},
    ];

    let mut cursor = playlists(&db).aggregate(pipeline, None).await?;
    let mut results: Vec<PlaylistSummary> = Vec::new();
    while cursor.advance().await? {
        let row = mongodb::bson::from_document(cursor.deserialize_current()?)
            .map_err(|e| ApiError::internal(format!("Malformed playlist row: {}", e)))?;
        results.push(row);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        results,
        "Playlists fetched successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/playlists/{playlist_id}",
    params(("playlist_id" = String, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist detail with joined videos and owner", body = PlaylistDetail),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Playlist not found")
    ),
    tag = "playlists"
)]
pub async fn get_playlist(
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = parse_object_id(&path.into_inner(), "playlist")?;

    let pipeline = vec![
        doc! {"$match": {"_id": playlist_id}},
        doc! {"$lookup": {
            "from": "videos",
            "localField": "videos",
            "foreignField": "_id",
            "as": "videoDetails",
        }},
        doc! {"$lookup": {
            "from": "users",
            "localField": "owner",
            "foreignField": "_id",
            "as": "ownerDetails",
        }},
        doc! {"$addFields": {
            "totalVideos": {"$size": "$videoDetails"},
            "totalViews": {"$sum": "$videoDetails.views"},
            "owner": {"$first": "$ownerDetails"},
        }},
        doc! {"$project": {
            "_id": {"$toString": "$_id"},
            "name": 1,
            "description": 1,
            "totalVideos": 1,
            "totalViews": 1,
            "owner": {
                "username": 1,
                "fullname": 1,
                "email": 1,
            },
            "videos": {
                "$map": {
                    "input": "$videoDetails",
                    "as": "v",
                    "in": {
                        "_id": {"$toString": "$$v._id"},
                        "title": "$$v.title",
                        "thumbnail": "$$v.thumbnail",
                        "description": "$$v.description",
                        "views": "$$v.views",
                        "isPublished": "$$v.isPublished",
                        "duration": "$$v.duration",
                    },
                },
            },
        }},
    ];

    let mut cursor = playlists(&db).aggregate(pipeline, None).await?;
    if !cursor.advance().await? {
        return Err(ApiError::not_found("Playlist not found"));
    }
    let detail: PlaylistDetail = mongodb::bson::from_document(cursor.deserialize_current()?)
        .map_err(|e| ApiError::internal(format!("Malformed playlist detail: {}", e)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        detail,
        "Playlist fetched successfully",
    )))
}

async fn change_playlist_videos(
    user: AuthenticatedUser,
    playlist_id: ObjectId,
    video_id: ObjectId,
    db: &Database,
    update: mongodb::bson::Document,
    message: &str,
) -> Result<HttpResponse, ApiError> {
    let playlist = load_playlist(db, playlist_id).await?;
    let video = db
        .collection::<Video>("videos")
        .find_one(doc! {"_id": video_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    ensure_owner(&playlist.owner, &user.user_id, "playlist")?;
    ensure_owner(&video.owner, &user.user_id, "video")?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = playlists(db)
        .find_one_and_update(doc! {"_id": playlist_id}, update, options)
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PlaylistResponse::from(updated), message)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/playlists/add/{video_id}/{playlist_id}",
    responses(
        (status = 200, description = "Video added (set semantics)", body = PlaylistResponse),
        (status = 403, description = "Caller does not own playlist and video"),
        (status = 404, description = "Playlist or video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "playlists"
)]
pub async fn add_video_to_playlist(
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let (video_id, playlist_id) = path.into_inner();
    let video_id = parse_object_id(&video_id, "video")?;
    let playlist_id = parse_object_id(&playlist_id, "playlist")?;

    change_playlist_videos(
        user,
        playlist_id,
        video_id,
        &db,
        doc! {
            "$addToSet": {"videos": video_id},
            "$set": {"updatedAt": Utc::now().timestamp()},
        },
        "Video added to playlist successfully",
    )
    .await
}

#[utoipa::path(
    patch,
    path = "/api/v1/playlists/remove/{video_id}/{playlist_id}",
    responses(
        (status = 200, description = "Video removed", body = PlaylistResponse),
        (status = 403, description = "Caller does not own playlist and video"),
        (status = 404, description = "Playlist or video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "playlists"
)]
pub async fn remove_video_from_playlist(
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let (video_id, playlist_id) = path.into_inner();
    let video_id = parse_object_id(&video_id, "video")?;
    let playlist_id = parse_object_id(&playlist_id, "playlist")?;

    change_playlist_videos(
        user,
        playlist_id,
        video_id,
        &db,
        doc! {
            "$pull": {"videos": video_id},
            "$set": {"updatedAt": Utc::now().timestamp()},
        },
        "Video removed from playlist successfully",
    )
    .await
}

#[utoipa::path(
    patch,
    path = "/api/v1/playlists/{playlist_id}",
    request_body = PlaylistRequest,
    responses(
        (status = 200, description = "Playlist updated", body = PlaylistResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = [])),
    tag = "playlists"
)]
pub async fn update_playlist(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<PlaylistRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = parse_object_id(&path.into_inner(), "playlist")?;
    if req.name.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Name and description are required"));
    }

    let playlist = load_playlist(&db, playlist_id).await?;
    ensure_owner(&playlist.owner, &user.user_id, "playlist")?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = playlists(&db)
        .find_one_and_update(
            doc! {"_id": playlist_id},
            doc! {"$set": {
                "name": req.name.trim(),
                "description": req.description.trim(),
                "updatedAt": Utc::now().timestamp(),
            }},
            options,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        PlaylistResponse::from(updated),
        "Playlist updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/playlists/{playlist_id}",
    responses(
        (status = 200, description = "Playlist deleted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = [])),
    tag = "playlists"
)]
pub async fn delete_playlist(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = parse_object_id(&path.into_inner(), "playlist")?;

    let playlist = load_playlist(&db, playlist_id).await?;
    ensure_owner(&playlist.owner, &user.user_id, "playlist")?;

    playlists(&db)
        .delete_one(doc! {"_id": playlist_id}, None)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Playlist deleted successfully",
    )))
}
