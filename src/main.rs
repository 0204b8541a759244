use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod config;
mod db;
mod error;
mod models;
mod services;

use config::Config;
use db::{create_mongodb_client, ensure_indexes};
use services::MediaStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().expect("Failed to load configuration");

    log::info!(
        "Starting server on {}:{}",
        config.server.host,
        config.server.port
    );

    let mongodb_db = create_mongodb_client(&config)
        .await
        .expect("Failed to create MongoDB client");
    ensure_indexes(&mongodb_db)
        .await
        .expect("Failed to create MongoDB indexes");

    log::info!("Database connection established");

    let media_store = MediaStore::new(&config.media);
    let openapi = api::ApiDoc::openapi();

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.cors.allowed_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(mongodb_db.clone()))
            .app_data(web::Data::new(media_store.clone()))
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/users")
                            .route("/register", web::post().to(api::user::register))
                            .route("/login", web::post().to(api::user::login))
                            .route("/logout", web::post().to(api::user::logout))
                            .route("/refresh-token", web::post().to(api::user::refresh_token))
                            .route(
                                "/change-password",
                                web::post().to(api::user::change_password),
                            )
                            .route("/current-user", web::get().to(api::user::current_user))
                            .route(
                                "/update-account",
                                web::patch().to(api::user::update_account),
                            )
                            .route("/avatar", web::patch().to(api::user::update_avatar))
                            .route(
                                "/cover-image",
                                web::patch().to(api::user::update_cover_image),
                            )
                            .route("/c/{username}", web::get().to(api::user::channel_profile))
                            .route("/history", web::get().to(api::user::watch_history)),
                    )
                    .service(
                        web::scope("/videos")
                            .route("", web::post().to(api::video::publish_video))
                            .route("", web::get().to(api::video::get_videos))
                            .route(
                                "/toggle/publish/{video_id}",
                                web::patch().to(api::video::toggle_publish),
                            )
                            .route("/{video_id}", web::get().to(api::video::get_video))
                            .route("/{video_id}", web::patch().to(api::video::update_video))
                            .route("/{video_id}", web::delete().to(api::video::delete_video)),
                    )
                    .service(
                        web::scope("/comments")
                            .route(
                                "/c/{comment_id}",
                                web::patch().to(api::comment::update_comment),
                            )
                            .route(
                                "/c/{comment_id}",
                                web::delete().to(api::comment::delete_comment),
                            )
                            .route(
                                "/{video_id}",
                                web::get().to(api::comment::get_video_comments),
                            )
                            .route("/{video_id}", web::post().to(api::comment::add_comment)),
                    )
                    .service(
                        web::scope("/likes")
                            .route(
                                "/toggle/v/{video_id}",
                                web::post().to(api::like::toggle_video_like),
                            )
                            .route(
                                "/toggle/c/{comment_id}",
                                web::post().to(api::like::toggle_comment_like),
                            )
                            .route(
                                "/toggle/t/{tweet_id}",
                                web::post().to(api::like::toggle_tweet_like),
                            )
                            .route("/videos", web::get().to(api::like::get_liked_videos)),
                    )
                    .service(
                        web::scope("/playlists")
                            .route("", web::post().to(api::playlist::create_playlist))
                            .route(
                                "/user/{user_id}",
                                web::get().to(api::playlist::get_user_playlists),
                            )
                            .route(
                                "/add/{video_id}/{playlist_id}",
                                web::patch().to(api::playlist::add_video_to_playlist),
                            )
                            .route(
                                "/remove/{video_id}/{playlist_id}",
                                web::patch().to(api::playlist::remove_video_from_playlist),
                            )
                            .route(
                                "/{playlist_id}",
                                web::get().to(api::playlist::get_playlist),
                            )
                            .route(
                                "/{playlist_id}",
                                web::patch().to(api::playlist::update_playlist),
                            )
                            .route(
                                "/{playlist_id}",
                                web::delete().to(api::playlist::delete_playlist),
                            ),
                    )
                    .service(web::scope("/subscriptions").route(
                        "/c/{channel_id}",
                        web::post().to(api::subscription::toggle_subscription),
                    )),
            )
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
