use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::info;

use crate::application::auth_service::{AuthService, BAD_CREDENTIALS};
use crate::application::sidebar_service::SidebarService;
use crate::domain::error::{DomainError, LOGIN_URL};
use crate::domain::user::User;
use crate::domain::validation::FormErrors;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::templates::Renderer;
use crate::presentation::context::{FormPage, Layout};
use crate::presentation::dto::{TokenRequest, TokenResponse};
use crate::presentation::forms::{FormState, LoginForm, RegistrationForm};
use crate::presentation::handlers::pages::{html, redirect};
use crate::presentation::utils::{MaybeUser, expired_session_cookie, request_id, session_cookie};

const REGISTRATION_FAILED: &str = "Registration failed. Please correct the errors below.";

async fn render_account_form<T: serde::Serialize>(
    user: MaybeUser,
    title: &str,
    form: FormState<T>,
    action: &'static str,
    mode: &'static str,
    sidebar: &SidebarService,
    renderer: &Renderer,
) -> Result<HttpResponse, DomainError> {
    let layout = Layout::load(sidebar, title, user.0).await?;
    let context = FormPage::new(layout, form, action, mode);
    Ok(html(renderer.render("registration.html", &context)?))
}

/// Redirects home with a fresh session cookie for `user`.
fn start_session(
    user: &User,
    auth: &AuthService,
    config: &AppConfig,
) -> Result<HttpResponse, DomainError> {
    let jwt = auth.issue_token(user)?;
    let cookie = session_cookie(jwt, auth.keys().ttl_seconds(), config.secure_cookies);
    let mut response = redirect("/");
    response
        .add_cookie(&cookie)
        .map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok(response)
}

#[get("/registration/")]
pub async fn registration_form(
    user: MaybeUser,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = FormState::blank(RegistrationForm::default());
    render_account_form(
        user,
        "Registration",
        form,
        "/registration/",
        "registration",
        &sidebar,
        &renderer,
    )
    .await
}

#[post("/registration/")]
pub async fn register(
    req: HttpRequest,
    user: MaybeUser,
    form: web::Form<RegistrationForm>,
    auth: web::Data<AuthService>,
    config: web::Data<AppConfig>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = form.into_inner();
    let result = match form.validate() {
        Ok(registration) => auth.register(registration).await,
        Err(errors) => Err(DomainError::Validation(errors)),
    };

    match result {
        Ok(created) => {
            info!(
                request_id = %request_id(&req),
                user_id = %created.id,
                username = %created.username,
                "user registered"
            );
            start_session(&created, &auth, &config)
        }
        Err(DomainError::Validation(mut errors)) => {
            errors.add_general(REGISTRATION_FAILED);
            let form = FormState::new(form, errors);
            render_account_form(
                user,
                "Registration",
                form,
                "/registration/",
                "registration",
                &sidebar,
                &renderer,
            )
            .await
        }
        Err(err) => Err(err),
    }
}

#[get("/login/")]
pub async fn login_form(
    user: MaybeUser,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = FormState::blank(LoginForm::default());
    render_account_form(user, "Log in", form, LOGIN_URL, "login", &sidebar, &renderer).await
}

#[post("/login/")]
pub async fn login(
    req: HttpRequest,
    user: MaybeUser,
    form: web::Form<LoginForm>,
    auth: web::Data<AuthService>,
    config: web::Data<AppConfig>,
    sidebar: web::Data<SidebarService>,
    renderer: web::Data<Renderer>,
) -> Result<HttpResponse, DomainError> {
    let form = form.into_inner();
    let result = match form.validate() {
        Ok(()) => auth.login(&form.username, &form.password).await,
        Err(errors) => Err(DomainError::Validation(errors)),
    };

    let errors = match result {
        Ok((logged_in, _)) => {
            info!(
                request_id = %request_id(&req),
                username = %logged_in.username,
                "user logged in"
            );
            return start_session(&logged_in, &auth, &config);
        }
        Err(DomainError::Validation(errors)) => errors,
        Err(DomainError::Unauthorized) => {
            let mut errors = FormErrors::new();
            errors.add_general(BAD_CREDENTIALS);
            errors
        }
        Err(err) => return Err(err),
    };
    let form = FormState::new(form, errors);
    render_account_form(user, "Log in", form, LOGIN_URL, "login", &sidebar, &renderer).await
}

#[get("/logout/")]
pub async fn logout(req: HttpRequest, user: MaybeUser) -> HttpResponse {
    if let Some(user) = user.0 {
        info!(request_id = %request_id(&req), username = %user.username, "user logged out");
    }
    HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, LOGIN_URL))
        .cookie(expired_session_cookie())
        .finish()
}

/// Bearer token for API clients.
#[post("/auth/token")]
pub async fn token(
    auth: web::Data<AuthService>,
    payload: web::Json<TokenRequest>,
) -> Result<HttpResponse, DomainError> {
    let (user, jwt) = auth.login(&payload.username, &payload.password).await?;
    info!(username = %user.username, "api token issued");
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: jwt,
        expires_in: auth.keys().ttl_seconds(),
        token_type: "Bearer".to_string(),
    }))
}
