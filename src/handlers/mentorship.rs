use futures::TryStreamExt;
use mongodb::bson::doc;
use rocket::http::CookieJar;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, post, routes};
use rocket_db_pools::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{LoginRequest, MentorSession, Role, SessionGrant, SessionService};
use crate::db::CommunityDb;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Mentee, Mentor, MentorCard, NewMentee, NewMentor, timestamp};

use super::accounts;

pub const MENTORS: &str = "mentors";
pub const MENTEES: &str = "mentees";

#[post("/mentors", format = "json", data = "<new_mentor>")]
pub async fn register_mentor(
    db: Connection<CommunityDb>,
    new_mentor: Json<NewMentor>,
) -> ApiResult<status::Created<Json<Mentor>>> {
    let mentor = new_mentor.into_inner().into_mentor().await?;
    accounts::ensure_email_free(&db, MENTORS, &mentor.email).await?;

    db.collection::<Mentor>(MENTORS)
        .insert_one(&mentor)
        .await
        .map_err(|e| ApiError::conflict_on_duplicate(e, "Email already registered"))?;
    tracing::info!(id = %mentor.oid, email = %mentor.email, "mentor registered");

    Ok(status::Created::new("/api/mentorship/mentors").body(Json(mentor.redacted())))
}

#[get("/mentors")]
pub async fn get_mentors(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<MentorCard>>> {
    let mentors: Vec<Mentor> = db
        .collection::<Mentor>(MENTORS)
        .find(doc! { "isActive": true })
        .sort(doc! { "name": 1 })
        .await?
        .try_collect()
        .await?;

    let cards = mentors
        .iter()
        .filter(|mentor| mentor.open_slots() > 0)
        .map(Mentor::card)
        .collect();

    Ok(Json(cards))
}

/// Registers a mentee and claims one of the mentor's open slots.
///
/// The slot is claimed with a conditional `$push` so two mentees racing for
/// the last slot cannot both get it.
#[post("/mentees", format = "json", data = "<new_mentee>")]
pub async fn register_mentee(
    db: Connection<CommunityDb>,
    new_mentee: Json<NewMentee>,
) -> ApiResult<status::Created<Json<Mentee>>> {
    let mentee = new_mentee.into_inner().into_mentee()?;
    accounts::ensure_email_free(&db, MENTEES, &mentee.email).await?;
    let mentors = db.collection::<Mentor>(MENTORS);

    let claimed = mentors
        .find_one_and_update(
            doc! {
                "_id": mentee.mentor,
                "isActive": true,
                "$expr": { "$lt": [{ "$size": "$mentees" }, "$maxMentees"] },
            },
            doc! {
                "$push": { "mentees": mentee.oid },
                "$set": { "updatedAt": timestamp() },
            },
        )
        .await?;

    if claimed.is_none() {
        let mentor = mentors.find_one(doc! { "_id": mentee.mentor }).await?;
        return Err(slot_refusal(mentor.as_ref()));
    }

    if let Err(e) = db.collection::<Mentee>(MENTEES).insert_one(&mentee).await {
        mentors
            .update_one(
                doc! { "_id": mentee.mentor },
                doc! { "$pull": { "mentees": mentee.oid } },
            )
            .await?;
        return Err(ApiError::conflict_on_duplicate(e, "Email already registered"));
    }

    tracing::info!(id = %mentee.oid, mentor = %mentee.mentor, "mentee registered");
    Ok(status::Created::new("/api/mentorship/mentees").body(Json(mentee)))
}

/// Why a slot could not be claimed, given the mentor as it is stored now.
fn slot_refusal(mentor: Option<&Mentor>) -> ApiError {
    match mentor {
        None => ApiError::NotFound("Mentor not found".into()),
        Some(mentor) if !mentor.is_active => {
            ApiError::Validation("Mentor is not accepting mentees".into())
        }
        Some(_) => ApiError::Validation("Mentor has no open slots".into()),
    }
}

#[post("/login", format = "json", data = "<body>")]
pub async fn login(
    db: Connection<CommunityDb>,
    sessions: &State<SessionService>,
    cookies: &CookieJar<'_>,
    body: Json<LoginRequest>,
) -> ApiResult<Json<SessionGrant>> {
    accounts::sign_in(Role::Mentor, &db, sessions, cookies, body.into_inner()).await
}

#[post("/logout")]
pub fn logout(sessions: &State<SessionService>, cookies: &CookieJar<'_>) -> Json<Value> {
    accounts::sign_out(Role::Mentor, sessions, cookies)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorProfile {
    #[serde(flatten)]
    pub mentor: Mentor,
    pub open_slots: i32,
    pub mentee_details: Vec<Mentee>,
}

#[get("/me")]
pub async fn me(session: MentorSession, db: Connection<CommunityDb>) -> ApiResult<Json<MentorProfile>> {
    let id = session.account_id()?;

    let mentor = db
        .collection::<Mentor>(MENTORS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Mentor not found".into()))?;

    let mentee_details = db
        .collection::<Mentee>(MENTEES)
        .find(doc! { "mentor": id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(MentorProfile {
        open_slots: mentor.open_slots(),
        mentor: mentor.redacted(),
        mentee_details,
    }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        register_mentor,
        get_mentors,
        register_mentee,
        login,
        logout,
        me
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mongodb::bson::oid::ObjectId;
    use rocket::http::Status;

    fn mentor(is_active: bool, max_mentees: i32, taken: usize) -> Mentor {
        Mentor {
            oid: ObjectId::new(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password: None,
            expertise: Vec::new(),
            bio: None,
            github: None,
            linkedin: None,
            mentees: (0..taken).map(|_| ObjectId::new()).collect(),
            max_mentees,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn missing_mentor_is_not_found() {
        let err = slot_refusal(None);
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.public_message(), "Mentor not found");
    }

    #[test]
    fn inactive_mentor_is_refused_even_with_room() {
        let err = slot_refusal(Some(&mentor(false, 3, 0)));
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.public_message(), "Mentor is not accepting mentees");
    }

    #[test]
    fn full_mentor_has_no_open_slots() {
        let full = mentor(true, 2, 2);
        assert_eq!(full.open_slots(), 0);

        let err = slot_refusal(Some(&full));
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.public_message(), "Mentor has no open slots");
    }
}
