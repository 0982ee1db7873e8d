use mongodb::bson::doc;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, routes};
use rocket_db_pools::Connection;

use crate::auth::AdminSession;
use crate::db::CommunityDb;
use crate::errors::{ApiError, ApiResult};
use crate::models::{ApprovalUpdate, NewProject, Project};

use super::moderation;

pub const COLLECTION: &str = "projects";

#[post("/", format = "json", data = "<new_project>")]
pub async fn create_project(
    db: Connection<CommunityDb>,
    new_project: Json<NewProject>,
) -> ApiResult<status::Created<Json<Project>>> {
    let project = new_project.into_inner().into_project()?;

    db.collection::<Project>(COLLECTION)
        .insert_one(&project)
        .await?;

    tracing::info!(id = %project.oid, title = %project.title, "project submitted for review");

    Ok(submitted(project))
}

/// 201 pointing at the new project.
pub fn submitted(project: Project) -> status::Created<Json<Project>> {
    let location = format!("/api/projects/{}", project.oid.to_hex());
    status::Created::new(location).body(Json(project))
}

#[get("/")]
pub async fn get_projects(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<Project>>> {
    let projects = moderation::list(&db, COLLECTION, doc! { "isApproved": true }).await?;
    Ok(Json(projects))
}

#[get("/<project_id>")]
pub async fn get_project(
    db: Connection<CommunityDb>,
    project_id: &str,
) -> ApiResult<Json<Project>> {
    let oid = super::parse_oid(project_id)?;

    let project = db
        .collection::<Project>(COLLECTION)
        .find_one(doc! { "_id": oid, "isApproved": true })
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    Ok(Json(project))
}

#[get("/?<status>")]
pub async fn admin_list_projects(
    _admin: AdminSession,
    db: Connection<CommunityDb>,
    status: Option<&str>,
) -> ApiResult<Json<Vec<Project>>> {
    let filter = moderation::approval_filter(status)?;
    Ok(Json(moderation::list(&db, COLLECTION, filter).await?))
}

#[patch("/<project_id>/approval", format = "json", data = "<update>")]
pub async fn set_project_approval(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    project_id: &str,
    update: Json<ApprovalUpdate>,
) -> ApiResult<Json<Project>> {
    let project = moderation::set_approval(
        &db,
        COLLECTION,
        "project",
        project_id,
        update.into_inner(),
        admin.name(),
    )
    .await?;

    Ok(Json(project))
}

#[delete("/<project_id>")]
pub async fn delete_project(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    project_id: &str,
) -> ApiResult<Json<Project>> {
    let project =
        moderation::remove(&db, COLLECTION, "project", project_id, admin.name()).await?;
    Ok(Json(project))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_project, get_projects, get_project]
}

pub fn admin_routes() -> Vec<rocket::Route> {
    routes![admin_list_projects, set_project_approval, delete_project]
}
