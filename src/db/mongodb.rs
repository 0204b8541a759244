use crate::config::Config;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

pub async fn create_mongodb_client(config: &Config) -> Result<Database, anyhow::Error> {
    let client = Client::with_uri_str(&config.mongodb.uri).await?;
    let db = client.database(&config.mongodb.database);
    Ok(db)
}

/// Creates the unique indexes the handlers rely on: user identity uniqueness,
/// at most one like per (caller, target), at most one subscription per
/// (subscriber, channel). Index creation is idempotent.
pub async fn ensure_indexes(db: &Database) -> Result<(), anyhow::Error> {
    let unique = IndexOptions::builder().unique(true).build();

    let users = db.collection::<mongodb::bson::Document>("users");
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! {"username": 1})
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! {"email": 1})
                .options(unique.clone())
                .build(),
            None,
        )
        .await?;

    // Partial unique indexes per like target; a like document only carries
    // the one target field it applies to.
    let likes = db.collection::<mongodb::bson::Document>("likes");
    for target in ["video", "comment", "tweet"] {
        let mut partial = mongodb::bson::Document::new();
        partial.insert(target, doc! {"$exists": true});
        let mut keys = doc! {"likedBy": 1};
        keys.insert(target, 1);

        let options = IndexOptions::builder()
            .unique(true)
            .partial_filter_expression(partial)
            .build();
        likes
            .create_index(
                IndexModel::builder().keys(keys).options(options).build(),
                None,
            )
            .await?;
    }

    let comments = db.collection::<mongodb::bson::Document>("comments");
    comments
        .create_index(IndexModel::builder().keys(doc! {"video": 1}).build(), None)
        .await?;

    let subscriptions = db.collection::<mongodb::bson::Document>("subscriptions");
    subscriptions
        .create_index(
            IndexModel::builder()
                .keys(doc! {"subscriber": 1, "channel": 1})
                .options(unique)
                .build(),
            None,
        )
        .await?;

    Ok(())
}
