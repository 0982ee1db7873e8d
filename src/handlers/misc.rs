use rocket::serde::json::Json;
use rocket::{State, get, routes as rocket_routes};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::db::CommunityDb;

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub db_status: String,
    pub collections: Vec<String>,
}

/// Reports database reachability without failing the request when it is down.
#[get("/check-health")]
pub async fn health(db: &CommunityDb) -> Json<HealthStatus> {
    let mut health = HealthStatus::default();

    let database = match db.database().await {
        Ok(database) => database,
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            health.db_status = "database offline".to_string();
            return Json(health);
        }
    };

    match database.list_collection_names().await {
        Ok(mut names) => {
            names.sort();
            health.db_status = "database online".to_string();
            health.collections = names;
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed to list collections");
            health.db_status = "database offline".to_string();
        }
    }

    Json(health)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub analytics_id: Option<String>,
}

#[get("/config")]
pub fn site_config(settings: &State<Settings>) -> Json<SiteConfig> {
    Json(SiteConfig {
        analytics_id: settings.analytics_id.clone(),
    })
}

pub fn routes() -> Vec<rocket::Route> {
    rocket_routes![health]
}

pub fn api_routes() -> Vec<rocket::Route> {
    rocket_routes![site_config]
}

