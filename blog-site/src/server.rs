use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::application::catalog_service::CatalogService;
use crate::application::post_service::PostService;
use crate::application::sidebar_service::SidebarService;
use crate::data::Repositories;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::security::JwtKeys;
use crate::infrastructure::templates::Renderer;
use crate::presentation::handlers;
use crate::presentation::middleware::{RequestIdMiddleware, SessionMiddleware, TimingMiddleware};

/// Everything the handlers pull out of `app_data`.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub posts: PostService,
    pub catalog: CatalogService,
    pub sidebar: SidebarService,
    pub renderer: Renderer,
}

impl AppServices {
    pub fn new(repos: &Repositories, config: &AppConfig) -> Result<Self, tera::Error> {
        Ok(Self {
            auth: AuthService::new(
                repos.users.clone(),
                JwtKeys::new(config.jwt_secret.clone(), config.session_ttl_hours),
            ),
            posts: PostService::new(repos),
            catalog: CatalogService::new(repos),
            sidebar: SidebarService::new(repos, config.sidebar_size),
            renderer: Renderer::new()?,
        })
    }
}

/// Registers the services and every route, behind the session middleware.
pub fn configure(
    services: AppServices,
    config: AppConfig,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(services.auth))
            .app_data(web::Data::new(services.posts))
            .app_data(web::Data::new(services.catalog))
            .app_data(web::Data::new(services.sidebar))
            .app_data(web::Data::new(services.renderer))
            .app_data(web::Data::new(config))
            .service(
                web::scope("")
                    .wrap(SessionMiddleware)
                    .configure(handlers::configure),
            );
    }
}

pub async fn start_server(services: AppServices, config: AppConfig) -> anyhow::Result<()> {
    let bind_address = (config.host.clone(), config.port);
    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    HttpServer::new(move || {
        let cors = build_cors(&config);

        App::new()
            .wrap(Logger::default())
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "same-origin"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(cors)
            .configure(configure(services.clone(), config.clone()))
    })
    .bind(bind_address)?
    .run()
    .await
    .map_err(anyhow::Error::new)?;

    Ok(())
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600);

    for origin in &config.cors_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
