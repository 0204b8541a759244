// Integration tests for the API endpoints.
// They need a reachable MongoDB (MONGODB_URI / MONGODB_DATABASE from env).
// Run with: cargo test --test api_test

use actix_web::{http::StatusCode, test, web, App};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use vidtube::{
    api,
    auth::verify_access_token,
    config::Config,
    db::{create_mongodb_client, ensure_indexes},
    services::MediaStore,
};

static MEDIA_DIR: Lazy<tempfile::TempDir> =
    Lazy::new(|| tempfile::tempdir().expect("Failed to create media tempdir"));

/// Unique suffix so test users never collide across runs.
fn generate_test_id() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

async fn create_test_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let mut config = Config::from_env().expect("Failed to load configuration");
    config.media.root = MEDIA_DIR.path().to_string_lossy().to_string();

    let mongodb_db = create_mongodb_client(&config)
        .await
        .expect("Failed to create MongoDB client");
    ensure_indexes(&mongodb_db)
        .await
        .expect("Failed to create MongoDB indexes");
    let media_store = MediaStore::new(&config.media);

    App::new()
        .app_data(web::Data::new(config))
        .app_data(web::Data::new(mongodb_db))
        .app_data(web::Data::new(media_store))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/users")
                        .route("/register", web::post().to(api::user::register))
                        .route("/login", web::post().to(api::user::login))
                        .route("/logout", web::post().to(api::user::logout))
                        .route("/refresh-token", web::post().to(api::user::refresh_token))
                        .route("/change-password", web::post().to(api::user::change_password))
                        .route("/current-user", web::get().to(api::user::current_user))
                        .route("/update-account", web::patch().to(api::user::update_account))
                        .route("/c/{username}", web::get().to(api::user::channel_profile))
                        .route("/history", web::get().to(api::user::watch_history)),
                )
                .service(
                    web::scope("/videos")
                        .route("", web::post().to(api::video::publish_video))
                        .route("", web::get().to(api::video::get_videos))
                        .route("/{video_id}", web::get().to(api::video::get_video))
                        .route("/{video_id}", web::patch().to(api::video::update_video)),
                )
                .service(
                    web::scope("/comments")
                        .route("/c/{comment_id}", web::patch().to(api::comment::update_comment))
                        .route(
                            "/c/{comment_id}",
                            web::delete().to(api::comment::delete_comment),
                        )
                        .route("/{video_id}", web::get().to(api::comment::get_video_comments))
                        .route("/{video_id}", web::post().to(api::comment::add_comment)),
                )
                .service(
                    web::scope("/likes")
                        .route(
                            "/toggle/v/{video_id}",
                            web::post().to(api::like::toggle_video_like),
                        )
                        .route("/videos", web::get().to(api::like::get_liked_videos)),
                )
                .service(
                    web::scope("/playlists")
                        .route("", web::post().to(api::playlist::create_playlist))
                        .route("/{playlist_id}", web::get().to(api::playlist::get_playlist))
                        .route(
                            "/{playlist_id}",
                            web::patch().to(api::playlist::update_playlist),
                        )
                        .route(
                            "/{playlist_id}",
                            web::delete().to(api::playlist::delete_playlist),
                        ),
                ),
        )
}

/// Builds a multipart body from text fields and small in-memory files.
fn multipart_body(
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> (String, Vec<u8>) {
    let boundary = format!("----vidtube{}", generate_test_id());
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (name, filename, data) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (
        format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}

macro_rules! register_user {
    ($app:expr, $test_id:expr) => {{
        let (content_type, body) = multipart_body(
            &[
                ("fullname", &format!("Test User {}", $test_id)),
                ("username", &format!("testuser{}", $test_id)),
                ("email", &format!("test{}@example.com", $test_id)),
                ("password", "password123"),
            ],
            &[("avatar", "avatar.png", b"fake-png-bytes")],
        );

        let req = test::TestRequest::post()
            .uri("/api/v1/users/register")
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

macro_rules! login_user {
    ($app:expr, $test_id:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({
                "email": format!("test{}@example.com", $test_id),
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

macro_rules! publish_video {
    ($app:expr, $token:expr, $title:expr) => {{
        let (content_type, body) = multipart_body(
            &[
                ("title", $title),
                ("description", "uploaded from the test suite"),
                ("duration", "12.5"),
            ],
            &[
                ("videoFile", "clip.mp4", b"fake-mp4-bytes"),
                ("thumbnail", "thumb.png", b"fake-png-bytes"),
            ],
        );

        let req = test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn register_returns_sanitized_user() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();

    let body = register_user!(&app, &test_id);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);

    let user = &body["data"];
    assert_eq!(user["username"], format!("testuser{}", test_id));
    assert!(user.get("password").is_none());
    assert!(user.get("refreshToken").is_none());
    assert!(user["avatar"].as_str().unwrap().contains("/media/"));
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);

    let (content_type, body) = multipart_body(
        &[
            ("fullname", "Someone Else"),
            ("username", &format!("testuser{}", test_id)),
            ("email", &format!("other{}@example.com", test_id)),
            ("password", "password123"),
        ],
        &[("avatar", "avatar.png", b"fake-png-bytes")],
    );
    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn register_without_avatar_is_rejected() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();

    let (content_type, body) = multipart_body(
        &[
            ("fullname", "No Avatar"),
            ("username", &format!("testuser{}", test_id)),
            ("email", &format!("test{}@example.com", test_id)),
            ("password", "password123"),
        ],
        &[],
    );
    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_sets_cookies_and_token_matches_user() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    let registered = register_user!(&app, &test_id);
    let user_id = registered["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({
            "email": format!("test{}@example.com", test_id),
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie_names: Vec<String> = resp
        .response()
        .cookies()
        .map(|c| c.name().to_string())
        .collect();
    assert!(cookie_names.contains(&"accessToken".to_string()));
    assert!(cookie_names.contains(&"refreshToken".to_string()));

    let body: Value = test::read_body_json(resp).await;
    let access_token = body["data"]["accessToken"].as_str().unwrap();

    let config = Config::from_env().unwrap();
    let claims = verify_access_token(access_token, &config.jwt).unwrap();
    assert_eq!(claims.sub, user_id);
}

#[actix_web::test]
async fn wrong_password_is_unauthorized_and_keeps_session_valid() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);

    let login = login_user!(&app, &test_id);
    let refresh = login["data"]["refreshToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({
            "email": format!("test{}@example.com", test_id),
            "password": "wrong-password"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The failed login must not rotate the stored refresh token.
    let req = test::TestRequest::post()
        .uri("/api/v1/users/refresh-token")
        .set_json(json!({"refreshToken": refresh}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn rotated_out_refresh_token_is_rejected() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);

    let first = login_user!(&app, &test_id);
    let old_refresh = first["data"]["refreshToken"].as_str().unwrap().to_string();

    // Second login rotates the stored token; the first one is now stale
    // even though its signature is still valid.
    let second = login_user!(&app, &test_id);
    let new_refresh = second["data"]["refreshToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/users/refresh-token")
        .set_json(json!({"refreshToken": old_refresh}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/users/refresh-token")
        .set_json(json!({"refreshToken": new_refresh}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn like_toggle_pair_nets_to_absent() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);
    let login = login_user!(&app, &test_id);
    let token = login["data"]["accessToken"].as_str().unwrap().to_string();

    let video = publish_video!(&app, &token, "toggle target");
    let video_id = video["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/likes/toggle/v/{}", video_id);
    for expected in [true, false] {
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["liked"], expected);
    }

    // Net effect of the pair: the video is not in the liked list.
    let req = test::TestRequest::get()
        .uri("/api/v1/likes/videos")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let liked = body["data"].as_array().unwrap();
    assert!(liked.iter().all(|v| v["_id"] != video_id.as_str()));
}

#[actix_web::test]
async fn non_owner_cannot_mutate_comment() {
    let app = test::init_service(create_test_app().await).await;
    let owner_id = generate_test_id();
    register_user!(&app, &owner_id);
    let owner_login = login_user!(&app, &owner_id);
    let owner_token = owner_login["data"]["accessToken"].as_str().unwrap();

    let video = publish_video!(&app, owner_token, "commented video");
    let video_id = video["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/comments/{}", video_id))
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .set_json(json!({"text": "original text"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    let comment_id = comment["data"]["id"].as_str().unwrap().to_string();

    let intruder_id = generate_test_id();
    register_user!(&app, &intruder_id);
    let intruder_login = login_user!(&app, &intruder_id);
    let intruder_token = intruder_login["data"]["accessToken"].as_str().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/comments/c/{}", comment_id))
        .insert_header(("Authorization", format!("Bearer {}", intruder_token)))
        .set_json(json!({"text": "defaced"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Entity unchanged.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/comments/{}", video_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let comments = body["data"].as_array().unwrap();
    assert!(comments.iter().any(|c| c["text"] == "original text"));
    assert!(comments.iter().all(|c| c["text"] != "defaced"));
}

#[actix_web::test]
async fn non_owner_cannot_mutate_video() {
    let app = test::init_service(create_test_app().await).await;
    let owner_id = generate_test_id();
    register_user!(&app, &owner_id);
    let owner_login = login_user!(&app, &owner_id);
    let owner_token = owner_login["data"]["accessToken"].as_str().unwrap();

    let video = publish_video!(&app, owner_token, "original title");
    let video_id = video["data"]["id"].as_str().unwrap().to_string();

    let intruder_id = generate_test_id();
    register_user!(&app, &intruder_id);
    let intruder_login = login_user!(&app, &intruder_id);
    let intruder_token = intruder_login["data"]["accessToken"].as_str().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/videos/{}", video_id))
        .insert_header(("Authorization", format!("Bearer {}", intruder_token)))
        .set_json(json!({"title": "hijacked", "description": "changed"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/videos/{}", video_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["title"], "original title");
}

#[actix_web::test]
async fn non_owner_cannot_mutate_playlist() {
    let app = test::init_service(create_test_app().await).await;
    let owner_id = generate_test_id();
    register_user!(&app, &owner_id);
    let owner_login = login_user!(&app, &owner_id);
    let owner_token = owner_login["data"]["accessToken"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/playlists")
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .set_json(json!({"name": "favorites", "description": "keepers"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let playlist: Value = test::read_body_json(resp).await;
    let playlist_id = playlist["data"]["id"].as_str().unwrap().to_string();

    let intruder_id = generate_test_id();
    register_user!(&app, &intruder_id);
    let intruder_login = login_user!(&app, &intruder_id);
    let intruder_token = intruder_login["data"]["accessToken"].as_str().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/playlists/{}", playlist_id))
        .insert_header(("Authorization", format!("Bearer {}", intruder_token)))
        .set_json(json!({"name": "stolen", "description": "mine now"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/playlists/{}", playlist_id))
        .insert_header(("Authorization", format!("Bearer {}", intruder_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Entity survives with its original name.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/playlists/{}", playlist_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["name"], "favorites");
}

#[actix_web::test]
async fn deleted_playlist_is_gone() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);
    let login = login_user!(&app, &test_id);
    let token = login["data"]["accessToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/playlists")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({"name": "watch later", "description": "queue"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let playlist: Value = test::read_body_json(resp).await;
    let playlist_id = playlist["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/playlists/{}", playlist_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/playlists/{}", playlist_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn fresh_channel_profile_has_zero_subscribers() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/c/testuser{}", test_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["subscribersCount"], 0);
    assert_eq!(body["data"]["channelsSubscribedToCount"], 0);
    assert_eq!(body["data"]["isSubscribed"], false);
}

#[actix_web::test]
async fn watching_a_video_lands_in_history() {
    let app = test::init_service(create_test_app().await).await;
    let test_id = generate_test_id();
    register_user!(&app, &test_id);
    let login = login_user!(&app, &test_id);
    let token = login["data"]["accessToken"].as_str().unwrap().to_string();

    let video = publish_video!(&app, &token, "history entry");
    let video_id = video["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/videos/{}", video_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["views"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/history")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let history = body["data"].as_array().unwrap();
    assert!(history.iter().any(|v| v["_id"] == video_id.as_str()));
}
