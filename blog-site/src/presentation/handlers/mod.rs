pub mod admin;
pub mod auth;
pub mod pages;

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;

use crate::presentation::dto::HealthResponse;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .service(auth::token)
            .service(admin::scope()),
    )
    .service(pages::index)
    .service(pages::category)
    .service(pages::tag)
    .service(pages::search)
    .service(pages::post_detail)
    .service(pages::add_comment)
    .service(pages::add_post_form)
    .service(pages::add_post)
    .service(auth::registration_form)
    .service(auth::register)
    .service(auth::login_form)
    .service(auth::login)
    .service(auth::logout);
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
