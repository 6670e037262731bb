use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{AccessCode, AccessGrant, Course, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Courses
    create_indexes(
        db,
        Course::COLLECTION,
        vec![index(bson::doc! { "created_at": -1 })],
    )
    .await?;

    // Access codes
    create_indexes(
        db,
        AccessCode::COLLECTION,
        vec![
            index_unique(bson::doc! { "code": 1 }),
            index(bson::doc! { "course_id": 1, "is_used": 1, "created_at": -1 }),
            index(bson::doc! { "created_at": -1 }),
        ],
    )
    .await?;

    // Access grants: one grant per redeemed code
    create_indexes(
        db,
        AccessGrant::COLLECTION,
        vec![
            index(bson::doc! { "user_id": 1, "course_id": 1, "access_end_at": -1 }),
            IndexModel::builder()
                .keys(bson::doc! { "code_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(
                            bson::doc! { "code_id": { "$type": "objectId" } },
                        )
                        .build(),
                )
                .build(),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
