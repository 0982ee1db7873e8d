//! # community-hub
//!
//! JSON API behind the community site: project and testimonial showcases,
//! events, the resource catalog, the mentorship and DSOC programs, and the
//! admin panel that moderates all of it.
//!
//! [`build`] assembles the Rocket instance; `main` only loads the environment
//! and launches it.

use rocket::http::Method;
use rocket::{Build, Rocket, routes};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;

use crate::auth::SessionService;
use crate::config::Settings;
use crate::db::CommunityDb;

pub mod activity;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod validation;

pub fn cors(settings: &Settings) -> Result<rocket_cors::Cors, rocket_cors::Error> {
    let origins = if settings.cors_origins.is_empty() {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&settings.cors_origins)
    };

    CorsOptions::default()
        .allowed_origins(origins)
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Patch,
                Method::Put,
                Method::Delete,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
}

/// Builds the application without touching the database; the first request
/// that needs it connects.
pub fn build(settings: Settings) -> Result<Rocket<Build>, rocket_cors::Error> {
    let figment = settings.figment(rocket::Config::figment());
    let cors = cors(&settings)?;

    Ok(rocket::custom(figment)
        .manage(SessionService::from_settings(&settings))
        .manage(settings)
        .attach(CommunityDb::init())
        .attach(cors)
        .register("/", handlers::catchers())
        .mount("/", routes![handlers::index])
        .mount("/", handlers::misc::routes())
        .mount("/api", handlers::misc::api_routes())
        .mount("/api", handlers::content::routes())
        .mount("/api/projects", handlers::projects::routes())
        .mount("/api/testimonials", handlers::testimonials::routes())
        .mount("/api/resources", handlers::resources::routes())
        .mount("/api/mentorship", handlers::mentorship::routes())
        .mount("/api/dsoc", handlers::dsoc::routes())
        .mount("/api/admin", handlers::admin::routes())
        .mount("/api/admin", handlers::content::admin_routes())
        .mount("/api/admin/projects", handlers::projects::admin_routes())
        .mount("/api/admin/testimonials", handlers::testimonials::admin_routes())
        .mount("/api/admin/resources", handlers::resources::admin_routes()))
}
