use mongodb::bson::doc;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, routes};
use rocket_db_pools::Connection;

use crate::auth::AdminSession;
use crate::db::CommunityDb;
use crate::errors::ApiResult;
use crate::models::{ApprovalUpdate, NewTestimonial, Testimonial};

use super::moderation;

pub const COLLECTION: &str = "testimonials";

#[post("/", format = "json", data = "<new_testimonial>")]
pub async fn create_testimonial(
    db: Connection<CommunityDb>,
    new_testimonial: Json<NewTestimonial>,
) -> ApiResult<status::Created<Json<Testimonial>>> {
    let testimonial = new_testimonial.into_inner().into_testimonial()?;

    db.collection::<Testimonial>(COLLECTION)
        .insert_one(&testimonial)
        .await?;

    Ok(submitted(testimonial))
}

pub fn submitted(testimonial: Testimonial) -> status::Created<Json<Testimonial>> {
    let location = format!("/api/testimonials/{}", testimonial.oid.to_hex());
    status::Created::new(location).body(Json(testimonial))
}

#[get("/")]
pub async fn get_testimonials(db: Connection<CommunityDb>) -> ApiResult<Json<Vec<Testimonial>>> {
    let testimonials = moderation::list(&db, COLLECTION, doc! { "isApproved": true }).await?;
    Ok(Json(testimonials))
}

#[get("/?<status>")]
pub async fn admin_list_testimonials(
    _admin: AdminSession,
    db: Connection<CommunityDb>,
    status: Option<&str>,
) -> ApiResult<Json<Vec<Testimonial>>> {
    let filter = moderation::approval_filter(status)?;
    Ok(Json(moderation::list(&db, COLLECTION, filter).await?))
}

#[patch("/<testimonial_id>/approval", format = "json", data = "<update>")]
pub async fn set_testimonial_approval(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    testimonial_id: &str,
    update: Json<ApprovalUpdate>,
) -> ApiResult<Json<Testimonial>> {
    let testimonial = moderation::set_approval(
        &db,
        COLLECTION,
        "testimonial",
        testimonial_id,
        update.into_inner(),
        admin.name(),
    )
    .await?;

    Ok(Json(testimonial))
}

#[delete("/<testimonial_id>")]
pub async fn delete_testimonial(
    admin: AdminSession,
    db: Connection<CommunityDb>,
    testimonial_id: &str,
) -> ApiResult<Json<Testimonial>> {
    let testimonial =
        moderation::remove(&db, COLLECTION, "testimonial", testimonial_id, admin.name()).await?;
    Ok(Json(testimonial))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_testimonial, get_testimonials]
}

pub fn admin_routes() -> Vec<rocket::Route> {
    routes![admin_list_testimonials, set_testimonial_approval, delete_testimonial]
}
