//! Approval workflow shared by the project and testimonial collections.

use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Document, doc};
use mongodb::options::ReturnDocument;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::activity::{self, ActivityLog};
use crate::errors::{ApiError, ApiResult};
use crate::models::{ApprovalUpdate, timestamp};

use super::parse_oid;

/// Maps the `?status=` query value to a filter on `isApproved`.
pub fn approval_filter(status: Option<&str>) -> ApiResult<Document> {
    match status.unwrap_or("all") {
        "all" => Ok(doc! {}),
        "pending" => Ok(doc! { "isApproved": false }),
        "approved" => Ok(doc! { "isApproved": true }),
        other => Err(ApiError::Validation(format!(
            "Unknown status {other:?}, expected pending, approved or all"
        ))),
    }
}

/// Documents matching `filter`, newest first.
pub async fn list<T>(db: &Database, collection: &str, filter: Document) -> ApiResult<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let items = db
        .collection::<T>(collection)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(items)
}

pub async fn set_approval<T>(
    db: &Database,
    collection: &str,
    entity_type: &str,
    id: &str,
    update: ApprovalUpdate,
    admin: &str,
) -> ApiResult<T>
where
    T: DeserializeOwned + Serialize + Send + Sync,
{
    let oid = parse_oid(id)?;
    let Some(is_approved) = update.is_approved else {
        return Err(ApiError::missing_fields(&["isApproved"]));
    };

    let updated = db
        .collection::<T>(collection)
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": { "isApproved": is_approved, "updatedAt": timestamp() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {entity_type} with id {id}")))?;

    let action = if is_approved { "approve" } else { "unapprove" };
    activity::record(
        db,
        ActivityLog::new(entity_type, oid, action, admin, json!({ "isApproved": is_approved })),
    )
    .await;

    Ok(updated)
}

pub async fn remove<T>(
    db: &Database,
    collection: &str,
    entity_type: &str,
    id: &str,
    admin: &str,
) -> ApiResult<T>
where
    T: DeserializeOwned + Serialize + Send + Sync,
{
    let oid = parse_oid(id)?;

    let removed = db
        .collection::<T>(collection)
        .find_one_and_delete(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {entity_type} with id {id}")))?;

    let snapshot = serde_json::to_value(&removed).unwrap_or_default();
    activity::record(db, ActivityLog::new(entity_type, oid, "delete", admin, snapshot)).await;

    Ok(removed)
}
