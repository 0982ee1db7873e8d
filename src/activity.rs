//! Append-only audit trail of admin actions.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::errors::ApiResult;

pub const COLLECTION: &str = "activity_logs";
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub admin_username: String,
    #[serde(with = "crate::models::millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ActivityLog {
    pub fn new(
        entity_type: &str,
        entity_id: impl ToString,
        action: &str,
        admin_username: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            oid: ObjectId::new(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            admin_username: admin_username.to_string(),
            timestamp: Utc::now(),
            details,
        }
    }
}

/// Appends `entry`. A failed write is logged and swallowed: the admin action
/// it describes has already happened.
pub async fn record(db: &Database, entry: ActivityLog) {
    let collection = db.collection::<ActivityLog>(COLLECTION);
    match collection.insert_one(&entry).await {
        Ok(_) => tracing::info!(
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            action = %entry.action,
            admin = %entry.admin_username,
            "admin activity"
        ),
        Err(e) => tracing::error!(
            error = %e,
            entity_type = %entry.entity_type,
            action = %entry.action,
            "failed to record admin activity"
        ),
    }
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Newest entries first, optionally restricted to one entity type.
pub async fn recent(
    db: &Database,
    entity_type: Option<&str>,
    limit: Option<i64>,
) -> ApiResult<Vec<ActivityLog>> {
    let mut filter = Document::new();
    if let Some(entity_type) = entity_type {
        filter.insert("entityType", entity_type);
    }

    let logs = db
        .collection::<ActivityLog>(COLLECTION)
        .find(filter)
        .sort(doc! { "timestamp": -1, "_id": -1 })
        .limit(clamp_limit(limit))
        .await?
        .try_collect()
        .await?;

    Ok(logs)
}
