use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse, get, post, routes, web};
use tracing::info;

use crate::application::catalog_service::CatalogService;
use crate::application::post_service::PostService;
use crate::application::sidebar_service::SidebarService;
use crate::domain::error::DomainError;
use crate::infrastructure::templates::Renderer;
use crate::presentation::context::{DetailPage, FormPage, Layout, ListingPage};
use crate::presentation::dto::{PageQuery, SearchQuery};
use crate::presentation::forms::{AddPostForm, CommentForm, FormState};
use crate::presentation::utils::{AuthenticatedUser, MaybeUser, request_id};

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

#[get("/")]
pub async fn index(
    user: MaybeUser,
    query: web::Query<PageQuery>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let page = posts.home(query.page.as_deref()).await?;
    let layout = Layout::load(&sidebar, "Home", user.0).await?;
    let context = ListingPage::new(layout, page).with_featured(sidebar.featured().await?);
    Ok(html(renderer.render("index.html", &context)?))
}

#[get("/category/{slug}/")]
pub async fn category(
    user: MaybeUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let (found, page) = posts.by_category(&path, query.page.as_deref()).await?;
    let layout = Layout::load(&sidebar, found.title, user.0).await?;
    let context = ListingPage::new(layout, page);
    Ok(html(renderer.render("category.html", &context)?))
}

#[routes]
#[get("/tag/{slug}/")]
#[get("/tags/{slug}/")]
pub async fn tag(
    user: MaybeUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let (found, page) = posts.by_tag(&path, query.page.as_deref()).await?;
    let layout = Layout::load(&sidebar, format!("Tag: {}", found.title), user.0).await?;
    let context = ListingPage::new(layout, page);
    Ok(html(renderer.render("category.html", &context)?))
}

#[get("/search/")]
pub async fn search(
    user: MaybeUser,
    query: web::Query<SearchQuery>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let term = query.s.trim();
    let page = posts.search(term, query.page.as_deref()).await?;
    let layout = Layout::load(&sidebar, format!("Search: \"{term}\""), user.0).await?;
    let context = ListingPage::new(layout, page).with_search(term);
    Ok(html(renderer.render("search.html", &context)?))
}

async fn render_detail(
    slug: &str,
    user: Option<AuthenticatedUser>,
    form: FormState<CommentForm>,
    posts: &PostService,
    sidebar: &SidebarService,
    renderer: &Renderer,
) -> Result<String, DomainError> {
    let detail = posts.open_post(slug, user.as_ref()).await?;
    let layout = Layout::load(sidebar, detail.post.post.title.clone(), user).await?;
    renderer.render("single.html", &DetailPage::new(layout, detail, form))
}

#[get("/post/{slug}/")]
pub async fn post_detail(
    user: MaybeUser,
    path: web::Path<String>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = FormState::blank(CommentForm::default());
    let body = render_detail(&path, user.0, form, &posts, &sidebar, &renderer).await?;
    Ok(html(body))
}

#[post("/post/{slug}/")]
pub async fn add_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    path: web::Path<String>,
    form: web::Form<CommentForm>,
    posts: web::Data<PostService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let slug = path.into_inner();
    match posts.add_comment(&slug, &user, &form.content).await {
        Ok(comment) => {
            info!(
                request_id = %request_id(&req),
                username = %user.username,
                comment_id = %comment.id,
                "comment added"
            );
            Ok(redirect(&format!("/post/{slug}/")))
        }
        Err(DomainError::Validation(errors)) => {
            let form = FormState::new(form.into_inner(), errors);
            let body = render_detail(&slug, Some(user), form, &posts, &sidebar, &renderer).await?;
            Ok(html(body))
        }
        Err(err) => Err(err),
    }
}

async fn render_add_post(
    user: AuthenticatedUser,
    form: FormState<AddPostForm>,
    catalog: &CatalogService,
    sidebar: &SidebarService,
    renderer: &Renderer,
) -> Result<HttpResponse, DomainError> {
    let layout = Layout::load(sidebar, "Add post", Some(user)).await?;
    let context = FormPage::new(layout, form, "/add_post/", "add_post")
        .with_categories(catalog.categories().await?);
    Ok(html(renderer.render("add_post.html", &context)?))
}

#[get("/add_post/")]
pub async fn add_post_form(
    user: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = FormState::blank(AddPostForm::default());
    render_add_post(user, form, &catalog, &sidebar, &renderer).await
}

#[post("/add_post/")]
pub async fn add_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    form: web::Form<AddPostForm>,
    posts: web::Data<PostService>,
    catalog: web::Data<CatalogService>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = form.into_inner();
    let result = match form.validate() {
        Ok(draft) => posts.create_post(user.id, draft).await,
        Err(errors) => Err(DomainError::Validation(errors)),
    };

    match result {
        Ok(post) => {
            info!(
                request_id = %request_id(&req),
                username = %user.username,
                slug = %post.slug,
                "post created"
            );
            Ok(redirect("/"))
        }
        Err(DomainError::Validation(errors)) => {
            let form = FormState::new(form, errors);
            render_add_post(user, form, &catalog, &sidebar, &renderer).await
        }
        Err(err) => Err(err),
    }
}
