use std::marker::PhantomData;

use mongodb::bson::oid::ObjectId;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use super::{Claims, Role, SessionService};
use crate::errors::ApiError;

pub trait SessionRole: Send + Sync + 'static {
    const ROLE: Role;
}

pub struct AdminRole;
pub struct MentorRole;
pub struct DsocMentorRole;
pub struct DsocMenteeRole;

impl SessionRole for AdminRole {
    const ROLE: Role = Role::Admin;
}

impl SessionRole for MentorRole {
    const ROLE: Role = Role::Mentor;
}

impl SessionRole for DsocMentorRole {
    const ROLE: Role = Role::DsocMentor;
}

impl SessionRole for DsocMenteeRole {
    const ROLE: Role = Role::DsocMentee;
}

/// A request carrying a valid session cookie for `R`. Fails with 401 otherwise.
pub struct Session<R: SessionRole> {
    pub claims: Claims,
    role: PhantomData<R>,
}

pub type AdminSession = Session<AdminRole>;
pub type MentorSession = Session<MentorRole>;
pub type DsocMentorSession = Session<DsocMentorRole>;
pub type DsocMenteeSession = Session<DsocMenteeRole>;

impl<R: SessionRole> Session<R> {
    pub fn account_id(&self) -> Result<ObjectId, ApiError> {
        self.claims.account_id().ok_or(ApiError::Unauthorized)
    }

    pub fn name(&self) -> &str {
        &self.claims.name
    }
}

fn session_service<'r>(request: &'r Request<'_>) -> Option<&'r SessionService> {
    request.rocket().state::<SessionService>()
}

#[rocket::async_trait]
impl<'r, R: SessionRole> FromRequest<'r> for Session<R> {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(sessions) = session_service(request) else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("session service is not managed".into()),
            ));
        };

        match sessions.verify(R::ROLE, request.cookies()) {
            Some(claims) => Outcome::Success(Session {
                claims,
                role: PhantomData,
            }),
            None => Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        }
    }
}

/// The admin access code was verified recently on this browser.
pub struct AccessCodeVerified;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessCodeVerified {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(sessions) = session_service(request) else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("session service is not managed".into()),
            ));
        };

        if sessions.access_code_verified(request.cookies()) {
            Outcome::Success(AccessCodeVerified)
        } else {
            Outcome::Error((Status::Unauthorized, ApiError::Unauthorized))
        }
    }
}
