use crate::auth::AuthenticatedUser;
use crate::error::{is_duplicate_key, parse_object_id, ApiError};
use crate::models::{ApiResponse, Subscription, SubscriptionToggleResponse, User};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Database;

#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/c/{channel_id}",
    responses(
        (status = 200, description = "Subscription toggled", body = SubscriptionToggleResponse),
        (status = 400, description = "Malformed id or self-subscription"),
        (status = 404, description = "Channel not found")
    ),
    security(("bearer_auth" = [])),
    tag = "subscriptions"
)]
pub async fn toggle_subscription(
    user: AuthenticatedUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let channel_id = parse_object_id(&path.into_inner(), "channel")?;
    if channel_id == user.user_id {
        return Err(ApiError::bad_request("You cannot subscribe to yourself"));
    }

    let channel = db
        .collection::<User>("users")
        .find_one(doc! {"_id": channel_id}, None)
        .await?;
    if channel.is_none() {
        return Err(ApiError::not_found("Channel not found"));
    }

    // Same atomic delete-or-insert pattern as like toggles; the unique
    // (subscriber, channel) index closes the race window.
    let subscriptions = db.collection::<Subscription>("subscriptions");
    let filter = doc! {"subscriber": user.user_id, "channel": channel_id};
    if subscriptions
        .find_one_and_delete(filter, None)
        .await?
        .is_some()
    {
        return Ok(HttpResponse::Ok().json(ApiResponse::ok(
            SubscriptionToggleResponse { subscribed: false },
            "Unsubscribed successfully",
        )));
    }

    let subscription = Subscription {
        id: None,
        subscriber: user.user_id,
        channel: channel_id,
        created_at: Utc::now(),
    };
    match subscriptions.insert_one(&subscription, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        SubscriptionToggleResponse { subscribed: true },
        "Subscribed successfully",
    )))
}
