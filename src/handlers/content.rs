//! Events ("sessions"), ambassadors and the core team: plain content records
//! readable by anyone and managed by admins.

use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Document, doc, oid::ObjectId};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, routes};
use rocket_db_pools::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::activity::{self, ActivityLog};
use crate::auth::AdminSession;
use crate::db::CommunityDb;
use crate::errors::{ApiError, ApiResult};
use crate::models::{
    Ambassador, CoreTeamMember, EventSession, NewAmbassador, NewCoreTeamMember, NewEventSession,
    timestamp,
};

use super::parse_oid;

pub const SESSIONS: &str = "sessions";
pub const AMBASSADORS: &str = "ambassadors";
pub const CORE_TEAM: &str = "core_team";

async fn find_sorted<T>(
    db: &Database,
    collection: &str,
    filter: Document,
    sort: Document,
) -> ApiResult<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let items = db
        .collection::<T>(collection)
        .find(filter)
        .sort(sort)
        .await?
        .try_collect()
        .await?;
    Ok(items)
}

async fn insert_logged<T>(
    db: &Database,
    collection: &str,
    entity_type: &str,
    id: ObjectId,
    item: &T,
    admin: &str,
) -> ApiResult<()>
where
    T: Serialize + Send + Sync,
{
    db.collection::<T>(collection).insert_one(item).await?;

    let snapshot = serde_json::to_value(item).unwrap_or_default();
    activity::record(db, ActivityLog::new(entity_type, id, "create", admin, snapshot)).await;
    Ok(())
}

async fn delete_logged(
    db: &Database,
    collection: &str,
    entity_type: &str,
    id: &str,
    admin: &str,
) -> ApiResult<()> {
    let oid = parse_oid(id)?;
    let result = db
        .collection::<Document>(collection)
        .delete_one(doc! { "_id": oid })
        .await?;

    if result.deleted_count == 0 {
        return Err(ApiError::NotFound(format!("No {entity_type} with id {id}")));
    }

    activity::record(db, ActivityLog::new(entity_type, oid, "delete", admin, json!({}))).await;
    Ok(())
}

#[get("/sessions?<upcoming>")]
pub async fn get_sessions(
    db: Connection<CommunityDb>,
    upcoming: Option<bool>,
) -> ApiResult<Json<Vec<EventSession>>> {
    let filter = if upcoming.unwrap_or(false) {
        doc! { "date": { "$gte": timestamp() } }
    } else {
        doc! {}
    };

    Ok(Json(find_sorted(&db, SESSIONS, filter, doc! { "date": 1 }).await?))
}

#[get("/ambassadors")]
pub async fn get_ambassadors(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<Ambassador>>> {
    Ok(Json(
        find_sorted(&db, AMBASSADORS, doc! {}, doc! { "name": 1 }).await?,
    ))
}

#[get("/core-team")]
pub async fn get_core_team(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<CoreTeamMember>>> {
    Ok(Json(
        find_sorted(&db, CORE_TEAM, doc! {}, doc! { "order": 1, "name": 1 }).await?,
    ))
}

#[post("/sessions", format = "json", data = "<new_session>")]
pub async fn create_session(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    new_session: Json<NewEventSession>,
) -> ApiResult<status::Created<Json<EventSession>>> {
    let session = new_session.into_inner().into_session()?;
    insert_logged(&db, SESSIONS, "session", session.oid, &session, admin.name()).await?;
    Ok(status::Created::new("/api/sessions").body(Json(session)))
}

#[delete("/sessions/<id>")]
pub async fn delete_session(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    id: &str,
) -> ApiResult<Json<serde_json::Value>> {
    delete_logged(&db, SESSIONS, "session", id, admin.name()).await?;
    Ok(Json(json!({ "success": true })))
}

#[post("/ambassadors", format = "json", data = "<new_ambassador>")]
pub async fn create_ambassador(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    new_ambassador: Json<NewAmbassador>,
) -> ApiResult<status::Created<Json<Ambassador>>> {
    let ambassador = new_ambassador.into_inner().into_ambassador()?;
    insert_logged(
        &db,
        AMBASSADORS,
        "ambassador",
        ambassador.oid,
        &ambassador,
        admin.name(),
    )
    .await?;
    Ok(status::Created::new("/api/ambassadors").body(Json(ambassador)))
}

#[delete("/ambassadors/<id>")]
pub async fn delete_ambassador(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    id: &str,
) -> ApiResult<Json<serde_json::Value>> {
    delete_logged(&db, AMBASSADORS, "ambassador", id, admin.name()).await?;
    Ok(Json(json!({ "success": true })))
}

#[post("/core-team", format = "json", data = "<new_member>")]
pub async fn create_core_team_member(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    new_member: Json<NewCoreTeamMember>,
) -> ApiResult<status::Created<Json<CoreTeamMember>>> {
    let member = new_member.into_inner().into_member()?;
    insert_logged(&db, CORE_TEAM, "coreTeamMember", member.oid, &member, admin.name()).await?;
    Ok(status::Created::new("/api/core-team").body(Json(member)))
}

#[delete("/core-team/<id>")]
pub async fn delete_core_team_member(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    id: &str,
) -> ApiResult<Json<serde_json::Value>> {
    delete_logged(&db, CORE_TEAM, "coreTeamMember", id, admin.name()).await?;
    Ok(Json(json!({ "success": true })))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![get_sessions, get_ambassadors, get_core_team]
}

pub fn admin_routes() -> Vec<rocket::Route> {
    routes![
        create_session,
        delete_session,
        create_ambassador,
        delete_ambassador,
        create_core_team_member,
        delete_core_team_member,
    ]
}
