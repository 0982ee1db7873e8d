use mongodb::bson::{Document, doc};
use mongodb::options::ReturnDocument;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::{State, get, patch, post, routes};
use rocket_db_pools::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::activity::{self, ActivityLog};
use crate::auth::{
    AccessCodeVerified, AdminSession, LoginRequest, Role, SessionGrant, SessionService,
};
use crate::db::CommunityDb;
use crate::errors::{ApiError, ApiResult};
use crate::models::{StatusUpdate, timestamp};

use super::{accounts, parse_oid};

#[derive(Debug, Default, Deserialize)]
pub struct AccessCodeRequest {
    pub code: Option<String>,
}

/// First step of the admin login: exchanges the shared access code for a
/// short-lived cookie that `/login` requires.
#[post("/verify-code", format = "json", data = "<body>")]
pub fn verify_code(
    sessions: &State<SessionService>,
    cookies: &CookieJar<'_>,
    body: Json<AccessCodeRequest>,
) -> ApiResult<Json<Value>> {
    let code = body
        .into_inner()
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| ApiError::missing_fields(&["code"]))?;

    if !sessions.access_code_matches(&code) {
        tracing::warn!("admin access code rejected");
        return Err(ApiError::InvalidCredentials);
    }

    sessions.grant_access_code(cookies)?;
    Ok(Json(json!({ "success": true })))
}

#[post("/login", format = "json", data = "<body>")]
pub async fn login(
    _code: AccessCodeVerified,
    db: Connection<CommunityDb>,
    sessions: &State<SessionService>,
    cookies: &CookieJar<'_>,
    body: Json<LoginRequest>,
) -> ApiResult<Json<SessionGrant>> {
    accounts::sign_in(Role::Admin, &db, sessions, cookies, body.into_inner()).await
}

#[post("/logout")]
pub fn logout(sessions: &State<SessionService>, cookies: &CookieJar<'_>) -> Json<Value> {
    sessions.revoke_access_code(cookies);
    accounts::sign_out(Role::Admin, sessions, cookies)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub username: Option<String>,
}

#[get("/verify")]
pub fn verify(session: Option<AdminSession>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: session.is_some(),
        username: session.map(|session| session.claims.name),
    })
}

/// (De)activates an account of any role. Sessions already issued stay valid
/// until they expire; only new logins are refused.
#[patch("/accounts/<role>/<id>/status", format = "json", data = "<update>")]
pub async fn set_account_status(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    role: &str,
    id: &str,
    update: Json<StatusUpdate>,
) -> ApiResult<Json<Value>> {
    let role = Role::from_segment(role)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown account type '{role}'")))?;
    let oid = parse_oid(id)?;
    let is_active = update
        .into_inner()
        .is_active
        .ok_or_else(|| ApiError::missing_fields(&["isActive"]))?;

    if role == Role::Admin && !is_active && admin.account_id()? == oid {
        return Err(ApiError::Validation(
            "You cannot deactivate your own account".into(),
        ));
    }

    let account = db
        .collection::<Document>(role.collection())
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": { "isActive": is_active, "updatedAt": timestamp() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let identifier = account
        .get_str(role.identifier_field())
        .unwrap_or_default()
        .to_string();

    activity::record(
        &db,
        ActivityLog::new(
            role.as_str(),
            oid,
            if is_active { "activate" } else { "deactivate" },
            admin.name(),
            json!({ "account": identifier }),
        ),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "role": role,
        "id": oid.to_hex(),
        "isActive": is_active,
    })))
}

#[get("/activity?<limit>&<entity_type>")]
pub async fn get_activity(
    _admin: AdminSession,
    db: Connection<CommunityDb>,
    limit: Option<i64>,
    entity_type: Option<&str>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    Ok(Json(activity::recent(&db, entity_type, limit).await?))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        verify_code,
        login,
        logout,
        verify,
        set_account_status,
        get_activity
    ]
}
