use mongodb::bson::oid::ObjectId;
use rocket::http::Status;
use rocket::response::{self, Responder, Response, content as rcontent, status};
use rocket::{Request, catch, get};

use crate::errors::{ApiResult, error_body};
use crate::validation;

pub mod accounts;
pub mod admin;
pub mod content;
pub mod dsoc;
pub mod mentorship;
pub mod misc;
pub mod moderation;
pub mod projects;
pub mod resources;
pub mod testimonials;

#[get("/")]
pub fn index() -> &'static str {
    "community-hub API. See /check-health for database status."
}

fn json_error(status: Status, message: &str) -> status::Custom<rcontent::RawJson<String>> {
    status::Custom(status, rcontent::RawJson(error_body(status, message)))
}

#[catch(400)]
pub fn catch400() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::BadRequest, "Malformed request")
}

#[catch(401)]
pub fn catch401() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::Unauthorized, "Unauthorized")
}

#[catch(403)]
pub fn catch403() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::Forbidden, "Forbidden")
}

#[catch(404)]
pub fn catch404(req: &Request) -> status::Custom<rcontent::RawJson<String>> {
    json_error(
        Status::NotFound,
        &format!("No route for {} {}", req.method(), req.uri().path()),
    )
}

/// Body failed to deserialize (wrong JSON types, unknown enum value).
#[catch(422)]
pub fn catch422() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::BadRequest, "Malformed request body")
}

#[catch(500)]
pub fn catch500() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::InternalServerError, "Internal server error")
}

#[catch(503)]
pub fn catch503() -> status::Custom<rcontent::RawJson<String>> {
    json_error(Status::ServiceUnavailable, "Database unavailable")
}

pub fn catchers() -> Vec<rocket::Catcher> {
    rocket::catchers![catch400, catch401, catch403, catch404, catch422, catch500, catch503]
}

pub fn parse_oid(id: &str) -> ApiResult<ObjectId> {
    validation::object_id("id", id)
}

/// Wraps a responder with a `Cache-Control` header.
pub struct Cached<R> {
    inner: R,
    policy: &'static str,
}

impl<R> Cached<R> {
    pub fn public(inner: R) -> Self {
        Self {
            inner,
            policy: "public, max-age=300, stale-while-revalidate=600",
        }
    }
}

impl<'r, 'o: 'r, R: Responder<'r, 'o>> Responder<'r, 'o> for Cached<R> {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'o> {
        Response::build_from(self.inner.respond_to(request)?)
            .raw_header("Cache-Control", self.policy)
            .ok()
    }
}
