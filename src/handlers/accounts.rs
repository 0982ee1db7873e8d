//! Login/logout plumbing shared by every role's routes.

use mongodb::Database;
use mongodb::bson::{Document, doc};
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use serde_json::{Value, json};

use crate::auth::{LoginRequest, MongoDirectory, Role, SessionGrant, SessionService};
use crate::errors::{ApiError, ApiResult};

pub async fn sign_in(
    role: Role,
    db: &Database,
    sessions: &SessionService,
    cookies: &CookieJar<'_>,
    body: LoginRequest,
) -> ApiResult<Json<SessionGrant>> {
    let credentials = body.into_credentials(role)?;
    let directory = MongoDirectory::new(db);
    let grant = sessions
        .issue(role, &directory, &credentials, cookies)
        .await?;
    Ok(Json(grant))
}

pub fn sign_out(role: Role, sessions: &SessionService, cookies: &CookieJar<'_>) -> Json<Value> {
    sessions.revoke(role, cookies);
    Json(json!({ "success": true, "message": "Logged out" }))
}

/// 409 when a document with `email` already exists in `collection`.
pub async fn ensure_email_free(db: &Database, collection: &str, email: &str) -> ApiResult<()> {
    let existing = db
        .collection::<Document>(collection)
        .find_one(doc! { "email": email })
        .await?;

    match existing {
        Some(_) => Err(ApiError::Conflict("Email already registered".into())),
        None => Ok(()),
    }
}
