use rocket::serde::json::Json;
use rocket::{get, put, routes};
use rocket_db_pools::Connection;
use serde_json::json;

use crate::activity::{self, ActivityLog};
use crate::auth::AdminSession;
use crate::catalog::{self, CatalogUpdate, ResourceCatalog, ResourceCategory};
use crate::db::CommunityDb;
use crate::errors::ApiResult;

use super::Cached;

#[get("/")]
pub async fn get_resources(
    db: Connection<CommunityDb>,
) -> ApiResult<Cached<Json<Vec<ResourceCategory>>>> {
    let catalog = catalog::load_or_seed(&db).await?;
    Ok(Cached::public(Json(catalog.published())))
}

#[get("/")]
pub async fn admin_get_resources(
    _admin: AdminSession,
    db: Connection<CommunityDb>,
) -> ApiResult<Json<ResourceCatalog>> {
    Ok(Json(catalog::load_or_seed(&db).await?))
}

#[put("/", format = "json", data = "<update>")]
pub async fn replace_resources(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    update: Json<CatalogUpdate>,
) -> ApiResult<Json<ResourceCatalog>> {
    let categories = update.into_inner().into_categories()?;
    let catalog = catalog::replace(&db, categories, admin.name()).await?;

    activity::record(
        &db,
        ActivityLog::new(
            "resources",
            catalog.oid,
            "update",
            admin.name(),
            json!({ "categories": catalog.categories.len() }),
        ),
    )
    .await;

    Ok(Json(catalog))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![get_resources]
}

pub fn admin_routes() -> Vec<rocket::Route> {
    routes![admin_get_resources, replace_resources]
}
