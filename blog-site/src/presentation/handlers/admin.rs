use actix_web::{HttpRequest, HttpResponse, Scope, delete, get, post, put, web};
use tracing::info;
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::application::catalog_service::CatalogService;
use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{CreateCatalogEntryRequest, UpdatePostRequest};
use crate::presentation::utils::{StaffUser, request_id};

/// Staff-only JSON API.
pub fn scope() -> Scope {
    web::scope("/admin")
        .service(list_categories)
        .service(create_category)
        .service(delete_category)
        .service(list_tags)
        .service(create_tag)
        .service(delete_tag)
        .service(update_post)
        .service(delete_post)
        .service(delete_comment)
        .service(delete_user)
}

#[get("/categories")]
pub async fn list_categories(
    _staff: StaffUser,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, DomainError> {
    Ok(HttpResponse::Ok().json(catalog.categories().await?))
}

#[post("/categories")]
pub async fn create_category(
    req: HttpRequest,
    staff: StaffUser,
    catalog: web::Data<CatalogService>,
    payload: web::Json<CreateCatalogEntryRequest>,
) -> Result<HttpResponse, DomainError> {
    let category = catalog
        .create_category(&payload.title, payload.slug.as_deref())
        .await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        slug = %category.slug,
        "category created"
    );
    Ok(HttpResponse::Created().json(category))
}

#[delete("/categories/{slug}")]
pub async fn delete_category(
    req: HttpRequest,
    staff: StaffUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    catalog.delete_category(&path).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        slug = %path,
        "category deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}

#[get("/tags")]
pub async fn list_tags(
    _staff: StaffUser,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, DomainError> {
    Ok(HttpResponse::Ok().json(catalog.tags().await?))
}

#[post("/tags")]
pub async fn create_tag(
    req: HttpRequest,
    staff: StaffUser,
    catalog: web::Data<CatalogService>,
    payload: web::Json<CreateCatalogEntryRequest>,
) -> Result<HttpResponse, DomainError> {
    let tag = catalog
        .create_tag(&payload.title, payload.slug.as_deref())
        .await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        slug = %tag.slug,
        "tag created"
    );
    Ok(HttpResponse::Created().json(tag))
}

#[delete("/tags/{slug}")]
pub async fn delete_tag(
    req: HttpRequest,
    staff: StaffUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    catalog.delete_tag(&path).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        slug = %path,
        "tag deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}

#[put("/posts/{slug}")]
pub async fn update_post(
    req: HttpRequest,
    staff: StaffUser,
    posts: web::Data<PostService>,
    path: web::Path<String>,
    payload: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, DomainError> {
    let UpdatePostRequest { fields, tag_ids } = payload.into_inner();
    let post = posts.update_post(&path, fields, tag_ids).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        post_id = %post.post.id,
        "post updated"
    );
    Ok(HttpResponse::Ok().json(post))
}

#[delete("/posts/{slug}")]
pub async fn delete_post(
    req: HttpRequest,
    staff: StaffUser,
    posts: web::Data<PostService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    posts.delete_post(&path).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        slug = %path,
        "post deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/comments/{id}")]
pub async fn delete_comment(
    req: HttpRequest,
    staff: StaffUser,
    posts: web::Data<PostService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let comment_id = path.into_inner();
    posts.delete_comment(comment_id).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        comment_id = %comment_id,
        "comment deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/users/{id}")]
pub async fn delete_user(
    req: HttpRequest,
    staff: StaffUser,
    auth: web::Data<AuthService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let user_id = path.into_inner();
    auth.delete_user(user_id).await?;
    info!(
        request_id = %request_id(&req),
        username = %staff.0.username,
        user_id = %user_id,
        "user deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}
