use crate::auth::{
    create_access_token, create_refresh_token, hash_password, verify_password,
    verify_refresh_token, AuthenticatedUser,
};
use crate::config::Config;
use crate::error::{is_duplicate_key, ApiError};
use crate::models::{
    ApiResponse, AuthResponse, ChangePasswordRequest, ChannelProfileResponse, LoginRequest,
    RefreshTokenRequest, TokenPairResponse, UpdateAccountRequest, User, UserResponse,
    VideoWithOwner,
};
use crate::services::{read_form, MediaStore};
use actix_multipart::Multipart;
use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;

fn users(db: &Database) -> mongodb::Collection<User> {
    db.collection::<User>("users")
}

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// Mints an access/refresh pair and persists the refresh token on the user
/// record. A new pair invalidates any previously stored refresh token.
pub(crate) async fn issue_session_tokens(
    db: &Database,
    config: &Config,
    user_id: ObjectId,
) -> Result<(String, String), ApiError> {
    let user = users(db)
        .find_one(doc! {"_id": user_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let id_hex = user_id.to_hex();
    let access = create_access_token(&id_hex, &user.username, &user.email, &config.jwt)
        .map_err(|e| ApiError::internal(format!("Failed to generate tokens: {}", e)))?;
    let refresh = create_refresh_token(&id_hex, &config.jwt)
        .map_err(|e| ApiError::internal(format!("Failed to generate tokens: {}", e)))?;

    users(db)
        .update_one(
            doc! {"_id": user_id},
            doc! {"$set": {"refreshToken": refresh.as_str(), "updatedAt": Utc::now().timestamp()}},
            None,
        )
        .await?;

    Ok((access, refresh))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    responses(
        (status = 201, description = "User registered (sanitized user in the envelope)", body = UserResponse),
        (status = 400, description = "Missing field or avatar"),
        (status = 409, description = "Username or email already taken")
    ),
    tag = "users"
)]
pub async fn register(
    payload: Multipart,
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;
    let fullname = form.require("fullname")?.to_string();
    let username = form.require("username")?.to_lowercase();
    let email = form.require("email")?.to_string();
    let password = form.require("password")?.to_string();

    let existing = users(&db)
        .find_one(
            doc! {"$or": [{"email": email.as_str()}, {"username": username.as_str()}]},
            None,
        )
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "User with this email or username already exists",
        ));
    }

    // Uploads are only stored once the identity checks pass.
    let avatar = media.store(form.require_file("avatar")?).await?;
    let cover_image = match form.file("coverImage") {
        Some(file) => media.store(file).await?,
        None => String::new(),
    };

    let hashed = hash_password(&password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let now = Utc::now();
    let user = User {
        id: None,
        username,
        email,
        fullname,
        avatar,
        cover_image,
        password: hashed,
        refresh_token: None,
        watch_history: vec![],
        created_at: now,
        updated_at: now,
    };

    let inserted = match users(&db).insert_one(&user, None).await {
        Ok(inserted) => inserted,
        // A racing registration won the unique index; drop the files stored
        // for this losing attempt before reporting the conflict.
        Err(e) if is_duplicate_key(&e) => {
            media.remove(&user.avatar).await;
            if !user.cover_image.is_empty() {
                media.remove(&user.cover_image).await;
            }
            return Err(ApiError::conflict(
                "User with this email or username already exists",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let created = users(&db)
        .find_one(doc! {"_id": inserted.inserted_id.clone()}, None)
        .await?
        .ok_or_else(|| ApiError::internal("User was not registered"))?;

    Ok(HttpResponse::Created().json(ApiResponse::created(
        UserResponse::from(created),
        "User registered successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; tokens also set as cookies", body = AuthResponse),
        (status = 400, description = "Neither username nor email supplied"),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn login(
    req: web::Json<LoginRequest>,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let mut identifiers = Vec::new();
    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        identifiers.push(doc! {"email": email});
    }
    if let Some(username) = req.username.as_deref().filter(|u| !u.trim().is_empty()) {
        identifiers.push(doc! {"username": username.to_lowercase()});
    }
    if identifiers.is_empty() {
        return Err(ApiError::bad_request("Username or email is required"));
    }

    let user = users(&db)
        .find_one(doc! {"$or": identifiers}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let is_valid = verify_password(&req.password, &user.password)
        .map_err(|e| ApiError::internal(format!("Password verification failed: {}", e)))?;
    if !is_valid {
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal("User record has no id"))?;
    let (access, refresh) = issue_session_tokens(&db, &config, user_id).await?;

    let logged_in = users(&db)
        .find_one(doc! {"_id": user_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie("accessToken", access.clone()))
        .cookie(auth_cookie("refreshToken", refresh.clone()))
        .json(ApiResponse::ok(
            AuthResponse {
                user: UserResponse::from(logged_in),
                access_token: access,
                refresh_token: refresh,
            },
            "User logged in successfully",
        )))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Logged out; cookies cleared"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn logout(
    user: AuthenticatedUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    users(&db)
        .update_one(
            doc! {"_id": user.user_id},
            doc! {"$unset": {"refreshToken": ""}},
            None,
        )
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie("accessToken"))
        .cookie(removal_cookie("refreshToken"))
        .json(ApiResponse::ok(
            serde_json::json!({}),
            "User logged out successfully",
        )))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPairResponse),
        (status = 401, description = "Missing, invalid, expired or rotated-out token")
    ),
    tag = "users"
)]
pub async fn refresh_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshTokenRequest>>,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let incoming = req
        .cookie("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = verify_refresh_token(&incoming, &config.jwt)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user = users(&db)
        .find_one(doc! {"_id": user_id}, None)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    // Single active session: only the most recently issued refresh token
    // matches the stored one.
    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(ApiError::unauthorized("Refresh token expired"));
    }

    let (access, refresh) = issue_session_tokens(&db, &config, user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie("accessToken", access.clone()))
        .cookie(auth_cookie("refreshToken", refresh.clone()))
        .json(ApiResponse::ok(
            TokenPairResponse {
                access_token: access,
                refresh_token: refresh,
            },
            "Access token refreshed",
        )))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Old password does not match")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn change_password(
    user: AuthenticatedUser,
    req: web::Json<ChangePasswordRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    if req.new_password.trim().is_empty() {
        return Err(ApiError::bad_request("New password must not be empty"));
    }

    let record = users(&db)
        .find_one(doc! {"_id": user.user_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let is_valid = verify_password(&req.old_password, &record.password)
        .map_err(|e| ApiError::internal(format!("Password verification failed: {}", e)))?;
    if !is_valid {
        return Err(ApiError::unauthorized("Invalid old password"));
    }

    let hashed = hash_password(&req.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    users(&db)
        .update_one(
            doc! {"_id": user.user_id},
            doc! {"$set": {"password": hashed, "updatedAt": Utc::now().timestamp()}},
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/current-user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn current_user(
    user: AuthenticatedUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let record = users(&db)
        .find_one(doc! {"_id": user.user_id}, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        UserResponse::from(record),
        "Current user fetched successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account details updated", body = UserResponse),
        (status = 400, description = "Empty fullname or email"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_account(
    user: AuthenticatedUser,
    req: web::Json<UpdateAccountRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    if req.fullname.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::bad_request("Fullname and email are required"));
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = users(&db)
        .find_one_and_update(
            doc! {"_id": user.user_id},
            doc! {"$set": {
                "fullname": req.fullname.trim(),
                "email": req.email.trim(),
                "updatedAt": Utc::now().timestamp(),
            }},
            options,
        )
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::conflict("Email already in use")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        UserResponse::from(updated),
        "Account details updated successfully",
    )))
}

async fn update_image_field(
    user: AuthenticatedUser,
    payload: Multipart,
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    field: &'static str,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;
    let url = media.store(form.require_file(field)?).await?;

    let mut set = mongodb::bson::Document::new();
    set.insert(field, url);
    set.insert("updatedAt", Utc::now().timestamp());

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = users(&db)
        .find_one_and_update(doc! {"_id": user.user_id}, doc! {"$set": set}, options)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        UserResponse::from(updated),
        "Image updated successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    responses(
        (status = 200, description = "Avatar updated", body = UserResponse),
        (status = 400, description = "Avatar file missing"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_avatar(
    user: AuthenticatedUser,
    payload: Multipart,
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
) -> Result<HttpResponse, ApiError> {
    update_image_field(user, payload, db, media, "avatar").await
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/cover-image",
    responses(
        (status = 200, description = "Cover image updated", body = UserResponse),
        (status = 400, description = "Cover image file missing"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_cover_image(
    user: AuthenticatedUser,
    payload: Multipart,
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
) -> Result<HttpResponse, ApiError> {
    update_image_field(user, payload, db, media, "coverImage").await
}

#[utoipa::path(
    get,
    path = "/api/v1/users/c/{username}",
    params(("username" = String, Path, description = "Channel username")),
    responses(
        (status = 200, description = "Channel profile with subscriber counts", body = ChannelProfileResponse),
        (status = 404, description = "Channel does not exist")
    ),
    tag = "users"
)]
pub async fn channel_profile(
    path: web::Path<String>,
    caller: Option<AuthenticatedUser>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner().to_lowercase();
    if username.trim().is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    let caller_id = caller
        .map(|c| Bson::ObjectId(c.user_id))
        .unwrap_or(Bson::Null);

    let pipeline = vec![
        doc! {"$match": {"username": username.as_str()}},
        doc! {"$lookup": {
            "from": "subscriptions",
            "localField": "_id",
            "foreignField": "channel",
            "as": "subscribers",
        }},
        doc! {"$lookup": {
            "from": "subscriptions",
            "localField": "_id",
            "foreignField": "subscriber",
            "as": "subscribedTo",
        }},
        doc! {"$project": {
            "_id": {"$toString": "$_id"},
            "username": 1,
            "fullname": 1,
            "email": 1,
            "avatar": 1,
            "coverImage": 1,
            "subscribersCount": {"$size": "$subscribers"},
            "channelsSubscribedToCount": {"$size": "$subscribedTo"},
            "isSubscribed": {"$in": [caller_id, "$subscribers.subscriber"]},
        }},
    ];

    let mut cursor = users(&db).aggregate(pipeline, None).await?;
    if !cursor.advance().await? {
        return Err(ApiError::not_found("Channel does not exist"));
    }
    let profile: ChannelProfileResponse =
        mongodb::bson::from_document(cursor.deserialize_current()?)
            .map_err(|e| ApiError::internal(format!("Malformed channel profile: {}", e)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        profile,
        "Channel profile fetched successfully",
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchHistoryDoc {
    #[serde(default)]
    watch_history: Vec<VideoWithOwner>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users/history",
    responses(
        (status = 200, description = "Watch history with owner details", body = Vec<VideoWithOwner>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn watch_history(
    user: AuthenticatedUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = vec![
        doc! {"$match": {"_id": user.user_id}},
        doc! {"$lookup": {
            "from": "videos",
            "localField": "watchHistory",
            "foreignField": "_id",
            "as": "watchHistory",
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
        doc! {"$project": {"_id": 0, "watchHistory": 1}},
    ];

    let mut cursor = users(&db).aggregate(pipeline, None).await?;
    if !cursor.advance().await? {
        return Err(ApiError::not_found("User not found"));
    }
    let history: WatchHistoryDoc = mongodb::bson::from_document(cursor.deserialize_current()?)
        .map_err(|e| ApiError::internal(format!("Malformed watch history: {}", e)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        history.watch_history,
        "Watch history fetched successfully",
    )))
}
