//! DSOC program: mentors publish projects, mentees apply to them, and the
//! owning mentor accepts or rejects each application.

use futures::TryStreamExt;
use mongodb::bson::{Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use rocket::http::CookieJar;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, patch, post, routes};
use rocket_db_pools::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{
    DsocMenteeSession, DsocMentorSession, LoginRequest, Role, SessionGrant, SessionService,
};
use crate::db::CommunityDb;
use crate::errors::{ApiError, ApiResult};
use crate::models::{
    ApplicationStatus, DsocApplication, DsocMentee, DsocMentor, DsocProject, NewDsocApplication,
    NewDsocMentee, NewDsocMentor, NewDsocProject, UpdateApplicationStatus, timestamp,
};

use super::{accounts, parse_oid};

pub const MENTORS: &str = "dsoc_mentors";
pub const MENTEES: &str = "dsoc_mentees";
pub const PROJECTS: &str = "dsoc_projects";
pub const APPLICATIONS: &str = "dsoc_applications";

const ALREADY_APPLIED: &str = "You have already applied to this project";

#[post("/mentor/register", format = "json", data = "<new_mentor>")]
pub async fn register_mentor(
    db: Connection<CommunityDb>,
    new_mentor: Json<NewDsocMentor>,
) -> ApiResult<status::Created<Json<DsocMentor>>> {
    let mentor = new_mentor.into_inner().into_mentor().await?;
    accounts::ensure_email_free(&db, MENTORS, &mentor.email).await?;

    db.collection::<DsocMentor>(MENTORS)
        .insert_one(&mentor)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, "Email already registered"))?;
    tracing::info!(id = %mentor.oid, email = %mentor.email, "dsoc mentor registered");

    Ok(status::Created::new("/api/dsoc/mentor/me").body(Json(mentor.redacted())))
}

#[post("/mentor/login", format = "json", data = "<body>")]
pub async fn mentor_login(
    db: Connection<CommunityDb>,
    sessions: &State<SessionService>,
    cookies: &CookieJar<'_>,
    body: Json<LoginRequest>,
) -> ApiResult<Json<SessionGrant>> {
    accounts::sign_in(Role::DsocMentor, &db, sessions, cookies, body.into_inner()).await
}

#[post("/mentor/logout")]
pub fn mentor_logout(sessions: &State<SessionService>, cookies: &CookieJar<'_>) -> Json<Value> {
    accounts::sign_out(Role::DsocMentor, sessions, cookies)
}

#[derive(Serialize)]
pub struct MentorOverview {
    #[serde(flatten)]
    pub mentor: DsocMentor,
    pub projects: Vec<DsocProject>,
}

#[get("/mentor/me")]
pub async fn mentor_me(
    session: DsocMentorSession,
    db: Connection<CommunityDb>,
) -> ApiResult<Json<MentorOverview>> {
    let id = session.account_id()?;

    let mentor = db
        .collection::<DsocMentor>(MENTORS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Mentor not found".into()))?;

    let projects = db
        .collection::<DsocProject>(PROJECTS)
        .find(doc! { "mentor": id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(MentorOverview {
        mentor: mentor.redacted(),
        projects,
    }))
}

#[post("/projects", format = "json", data = "<new_project>")]
pub async fn create_project(
    session: DsocMentorSession,
    db: Connection<CommunityDb>,
    new_project: Json<NewDsocProject>,
) -> ApiResult<status::Created<Json<DsocProject>>> {
    let mentor = session.account_id()?;
    let project = new_project
        .into_inner()
        .into_project(mentor, session.name())?;

    db.collection::<DsocProject>(PROJECTS)
        .insert_one(&project)
        .await?;
    tracing::info!(id = %project.oid, %mentor, "dsoc project created");

    Ok(status::Created::new("/api/dsoc/projects").body(Json(project)))
}

#[get("/projects")]
pub async fn get_projects(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<DsocProject>>> {
    let projects = db
        .collection::<DsocProject>(PROJECTS)
        .find(doc! { "isOpen": true })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(projects))
}

#[get("/mentor/applications?<status>")]
pub async fn mentor_applications(
    session: DsocMentorSession,
    db: Connection<CommunityDb>,
    status: Option<&str>,
) -> ApiResult<Json<Vec<DsocApplication>>> {
    let mut filter = doc! { "mentor": session.account_id()? };
    if let Some(status) = status {
        let status = parse_status(status)?;
        filter.insert("status", status.as_str());
    }

    let applications = db
        .collection::<DsocApplication>(APPLICATIONS)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(applications))
}

fn parse_status(raw: &str) -> ApiResult<ApplicationStatus> {
    match raw {
        "pending" => Ok(ApplicationStatus::Pending),
        "accepted" => Ok(ApplicationStatus::Accepted),
        "rejected" => Ok(ApplicationStatus::Rejected),
        other => Err(ApiError::Validation(format!(
            "Invalid status '{other}', expected pending, accepted or rejected"
        ))),
    }
}

/// What a review changes besides the application's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewEffect {
    /// Pair mentee and mentor, closing the project when it fills.
    Pair,
    /// Undo an earlier pairing and reopen the project if it had filled.
    Release,
    Nothing,
}

fn review_effect(current: ApplicationStatus, requested: ApplicationStatus) -> ReviewEffect {
    use ApplicationStatus::{Accepted, Rejected};

    match (current, requested) {
        (Accepted, Accepted) => ReviewEffect::Nothing,
        (_, Accepted) => ReviewEffect::Pair,
        (Accepted, Rejected) => ReviewEffect::Release,
        _ => ReviewEffect::Nothing,
    }
}

/// Checks there is room for one more acceptance. `Ok(true)` means that
/// acceptance takes the last slot.
fn claim_project_slot(accepted: u64, max_mentees: i32) -> ApiResult<bool> {
    let max = max_mentees.max(0) as u64;
    if accepted >= max {
        return Err(ApiError::Conflict("Project has no open slots".into()));
    }
    Ok(accepted + 1 >= max)
}

/// Accepts or rejects an application to one of the caller's projects.
///
/// Accepting links the mentee to the mentor on both documents and closes the
/// project once its accepted count reaches `maxMentees`. Rejecting an accepted
/// application undoes that.
#[patch("/applications/<application_id>", format = "json", data = "<update>")]
pub async fn review_application(
    session: DsocMentorSession,
    db: Connection<CommunityDb>,
    application_id: &str,
    update: Json<UpdateApplicationStatus>,
) -> ApiResult<Json<DsocApplication>> {
    let mentor = session.account_id()?;
    let oid = parse_oid(application_id)?;

    let status = match update.into_inner().status {
        Some(status @ (ApplicationStatus::Accepted | ApplicationStatus::Rejected)) => status,
        Some(ApplicationStatus::Pending) => {
            return Err(ApiError::Validation(
                "status must be accepted or rejected".into(),
            ));
        }
        None => return Err(ApiError::missing_fields(&["status"])),
    };

    let applications = db.collection::<DsocApplication>(APPLICATIONS);
    let application = applications
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;

    if application.mentor != mentor {
        return Err(ApiError::Forbidden(
            "You can only review applications to your own projects".into(),
        ));
    }

    match review_effect(application.status, status) {
        ReviewEffect::Pair => accept(&db, &application).await?,
        ReviewEffect::Release => release(&db, &application).await?,
        ReviewEffect::Nothing => {}
    }

    let updated = applications
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": { "status": status.as_str(), "updatedAt": timestamp() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;

    tracing::info!(
        id = %oid,
        %mentor,
        status = status.as_str(),
        "dsoc application reviewed"
    );

    Ok(Json(updated))
}

/// Accepted applications to `project`, not counting `except`.
async fn accepted_count(
    db: &mongodb::Database,
    project: ObjectId,
    except: ObjectId,
) -> ApiResult<u64> {
    Ok(db
        .collection::<Document>(APPLICATIONS)
        .count_documents(doc! {
            "project": project,
            "status": ApplicationStatus::Accepted.as_str(),
            "_id": { "$ne": except },
        })
        .await?)
}

async fn accept(db: &mongodb::Database, application: &DsocApplication) -> ApiResult<()> {
    let project = db
        .collection::<DsocProject>(PROJECTS)
        .find_one(doc! { "_id": application.project })
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    let accepted = accepted_count(db, project.oid, application.oid).await?;
    let fills = claim_project_slot(accepted, project.max_mentees)?;

    let linked = db
        .collection::<Document>(MENTEES)
        .update_one(
            doc! {
                "_id": application.mentee,
                "$or": [{ "mentor": null }, { "mentor": application.mentor }],
            },
            doc! { "$set": { "mentor": application.mentor, "updatedAt": timestamp() } },
        )
        .await?;

    if linked.matched_count == 0 {
        return Err(ApiError::Conflict(
            "Mentee is already paired with another mentor".into(),
        ));
    }

    db.collection::<Document>(MENTORS)
        .update_one(
            doc! { "_id": application.mentor },
            doc! {
                "$addToSet": { "mentees": application.mentee },
                "$set": { "updatedAt": timestamp() },
            },
        )
        .await?;

    if fills {
        db.collection::<Document>(PROJECTS)
            .update_one(
                doc! { "_id": project.oid },
                doc! { "$set": { "isOpen": false, "updatedAt": timestamp() } },
            )
            .await?;
        tracing::info!(id = %project.oid, "dsoc project filled and closed");
    }

    Ok(())
}

/// Reverses [`accept`] for an application that is being rejected.
///
/// The pairing stays when the mentee holds another accepted application with
/// the same mentor.
async fn release(db: &mongodb::Database, application: &DsocApplication) -> ApiResult<()> {
    let still_paired = db
        .collection::<Document>(APPLICATIONS)
        .count_documents(doc! {
            "mentee": application.mentee,
            "mentor": application.mentor,
            "status": ApplicationStatus::Accepted.as_str(),
            "_id": { "$ne": application.oid },
        })
        .await?
        > 0;

    if !still_paired {
        db.collection::<Document>(MENTORS)
            .update_one(
                doc! { "_id": application.mentor },
                doc! {
                    "$pull": { "mentees": application.mentee },
                    "$set": { "updatedAt": timestamp() },
                },
            )
            .await?;

        db.collection::<Document>(MENTEES)
            .update_one(
                doc! { "_id": application.mentee, "mentor": application.mentor },
                doc! {
                    "$unset": { "mentor": "" },
                    "$set": { "updatedAt": timestamp() },
                },
            )
            .await?;
    }

    let Some(project) = db
        .collection::<DsocProject>(PROJECTS)
        .find_one(doc! { "_id": application.project })
        .await?
    else {
        return Ok(());
    };

    let remaining = accepted_count(db, project.oid, application.oid).await?;
    if !project.is_open && claim_project_slot(remaining, project.max_mentees).is_ok() {
        db.collection::<Document>(PROJECTS)
            .update_one(
                doc! { "_id": project.oid },
                doc! { "$set": { "isOpen": true, "updatedAt": timestamp() } },
            )
            .await?;
        tracing::info!(id = %project.oid, "dsoc project reopened");
    }

    tracing::info!(
        application = %application.oid,
        mentee = %application.mentee,
        still_paired,
        "dsoc pairing released"
    );
    Ok(())
}

#[post("/mentee/register", format = "json", data = "<new_mentee>")]
pub async fn register_mentee(
    db: Connection<CommunityDb>,
    new_mentee: Json<NewDsocMentee>,
) -> ApiResult<status::Created<Json<DsocMentee>>> {
    let mentee = new_mentee.into_inner().into_mentee().await?;
    accounts::ensure_email_free(&db, MENTEES, &mentee.email).await?;

    db.collection::<DsocMentee>(MENTEES)
        .insert_one(&mentee)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, "Email already registered"))?;
    tracing::info!(id = %mentee.oid, email = %mentee.email, "dsoc mentee registered");

    Ok(status::Created::new("/api/dsoc/mentee/me").body(Json(mentee.redacted())))
}

#[post("/mentee/login", format = "json", data = "<body>")]
pub async fn mentee_login(
    db: Connection<CommunityDb>,
    sessions: &State<SessionService>,
    cookies: &CookieJar<'_>,
    body: Json<LoginRequest>,
) -> ApiResult<Json<SessionGrant>> {
    accounts::sign_in(Role::DsocMentee, &db, sessions, cookies, body.into_inner()).await
}

#[post("/mentee/logout")]
pub fn mentee_logout(sessions: &State<SessionService>, cookies: &CookieJar<'_>) -> Json<Value> {
    accounts::sign_out(Role::DsocMentee, sessions, cookies)
}

#[derive(Serialize)]
pub struct MenteeOverview {
    #[serde(flatten)]
    pub mentee: DsocMentee,
    pub applications: Vec<DsocApplication>,
}

#[get("/mentee/me")]
pub async fn mentee_me(
    session: DsocMenteeSession,
    db: Connection<CommunityDb>,
) -> ApiResult<Json<MenteeOverview>> {
    let id = session.account_id()?;

    let mentee = db
        .collection::<DsocMentee>(MENTEES)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Mentee not found".into()))?;

    let applications = db
        .collection::<DsocApplication>(APPLICATIONS)
        .find(doc! { "mentee": id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(MenteeOverview {
        mentee: mentee.redacted(),
        applications,
    }))
}

#[post("/applications", format = "json", data = "<new_application>")]
pub async fn apply(
    session: DsocMenteeSession,
    db: Connection<CommunityDb>,
    new_application: Json<NewDsocApplication>,
) -> ApiResult<status::Created<Json<DsocApplication>>> {
    let mentee: ObjectId = session.account_id()?;
    let body = new_application.into_inner();
    let project_id = body.project_id()?;

    let project = db
        .collection::<DsocProject>(PROJECTS)
        .find_one(doc! { "_id": project_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    if !project.is_open {
        return Err(ApiError::Validation(
            "Project is not accepting applications".into(),
        ));
    }

    let applications = db.collection::<DsocApplication>(APPLICATIONS);
    let existing = applications
        .find_one(doc! { "project": project_id, "mentee": mentee })
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(ALREADY_APPLIED.into()));
    }

    let application = body.into_application(&project, mentee, session.name())?;
    applications
        .insert_one(&application)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, ALREADY_APPLIED))?;
    tracing::info!(id = %application.oid, project = %project_id, %mentee, "dsoc application submitted");

    Ok(status::Created::new("/api/dsoc/mentee/me").body(Json(application)))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        register_mentor,
        mentor_login,
        mentor_logout,
        mentor_me,
        create_project,
        get_projects,
        mentor_applications,
        review_application,
        register_mentee,
        mentee_login,
        mentee_logout,
        mentee_me,
        apply,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_accepts_known_values() {
        assert_eq!(parse_status("accepted").unwrap(), ApplicationStatus::Accepted);
        assert_eq!(parse_status("pending").unwrap(), ApplicationStatus::Pending);
        assert!(parse_status("maybe").is_err());
    }

    #[test]
    fn accepting_pairs_unless_already_accepted() {
        use ApplicationStatus::*;

        assert_eq!(review_effect(Pending, Accepted), ReviewEffect::Pair);
        assert_eq!(review_effect(Rejected, Accepted), ReviewEffect::Pair);
        assert_eq!(review_effect(Accepted, Accepted), ReviewEffect::Nothing);
    }

    #[test]
    fn rejecting_releases_only_an_accepted_pairing() {
        use ApplicationStatus::*;

        assert_eq!(review_effect(Accepted, Rejected), ReviewEffect::Release);
        assert_eq!(review_effect(Pending, Rejected), ReviewEffect::Nothing);
        assert_eq!(review_effect(Rejected, Rejected), ReviewEffect::Nothing);
    }

    #[test]
    fn last_slot_fills_the_project() {
        assert_eq!(claim_project_slot(0, 2).unwrap(), false);
        assert_eq!(claim_project_slot(1, 2).unwrap(), true);
        assert_eq!(claim_project_slot(0, 1).unwrap(), true);
    }

    #[test]
    fn full_project_refuses_another_acceptance() {
        let err = claim_project_slot(2, 2).unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::Conflict);
        assert_eq!(err.public_message(), "Project has no open slots");
        assert!(claim_project_slot(0, 0).is_err());
    }
}
