use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::dev::Payload;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};
use serde::Serialize;
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::domain::user::User;
use crate::presentation::middleware::RequestId;

pub const SESSION_COOKIE: &str = "sessionid";

/// The logged-in user. Extracting it on an anonymous request sends the
/// client to the login page.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(DomainError::LoginRequired.into())),
        }
    }
}

/// The current user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequest for MaybeUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(MaybeUser(
            req.extensions().get::<AuthenticatedUser>().cloned(),
        )))
    }
}

/// A staff member calling the admin API.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthenticatedUser);

impl FromRequest for StaffUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<AuthenticatedUser>() {
            Some(user) if user.is_staff => Ok(StaffUser(user.clone())),
            Some(_) => Err(DomainError::Forbidden.into()),
            None => Err(DomainError::Unauthorized.into()),
        };
        ready(result)
    }
}

pub async fn extract_user_from_token(
    token: &str,
    auth_service: &AuthService,
) -> Result<AuthenticatedUser, DomainError> {
    auth_service
        .authenticate(token)
        .await
        .map(AuthenticatedUser::from)
}

/// Session token candidates in the order they are tried: the `sessionid`
/// cookie, then a bearer `Authorization` header. A stale cookie must not
/// hide a valid bearer token.
pub fn session_tokens(cookie: Option<Cookie<'_>>, headers: &HeaderMap) -> Vec<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    cookie
        .map(|cookie| cookie.value().to_string())
        .into_iter()
        .chain(bearer)
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn session_cookie(token: String, ttl_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(ttl_seconds))
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    fn staff() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "root".into(),
            is_staff: true,
        }
    }

    fn tokens(req: &HttpRequest) -> Vec<String> {
        session_tokens(req.cookie(SESSION_COOKIE), req.headers())
    }

    #[test]
    fn cookie_is_tried_before_bearer_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();
        assert_eq!(tokens(&req), ["from-cookie", "from-header"]);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();
        assert_eq!(tokens(&req), ["from-header"]);

        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, ""))
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert!(tokens(&req).is_empty());
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie("t".into(), 3600, false);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }

    #[actix_web::test]
    async fn staff_extractor_distinguishes_anonymous_and_regular_users() {
        let req = TestRequest::default().to_http_request();
        let err = StaffUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(AuthenticatedUser {
            is_staff: false,
            ..staff()
        });
        let err = StaffUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(staff());
        assert!(StaffUser::extract(&req).await.is_ok());
    }

    #[actix_web::test]
    async fn anonymous_user_is_sent_to_login() {
        let req = TestRequest::default().to_http_request();
        let err = AuthenticatedUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FOUND);
        assert!(MaybeUser::extract(&req).await.unwrap().0.is_none());
    }
}
