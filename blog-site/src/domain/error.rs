use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::validation::FormErrors;

pub const LOGIN_URL: &str = "/login/";

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("post not found: {0}")]
    PostNotFound(String),
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("tag not found: {0}")]
    TagNotFound(String),
    #[error("comment not found: {0}")]
    CommentNotFound(Uuid),
    #[error("invalid page: {0}")]
    InvalidPage(String),
    #[error("empty listing")]
    EmptyListing,
    #[error("slug already taken: {0}")]
    SlugTaken(String),
    #[error("cannot delete {resource}: still referenced by {referenced_by}")]
    Protected {
        resource: &'static str,
        referenced_by: &'static str,
    },
    #[error("validation failed")]
    Validation(FormErrors),
    #[error("login required")]
    LoginRequired,
    #[error("forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::PostNotFound(_)
            | DomainError::CategoryNotFound(_)
            | DomainError::TagNotFound(_)
            | DomainError::CommentNotFound(_)
            | DomainError::InvalidPage(_)
            | DomainError::EmptyListing => StatusCode::NOT_FOUND,
            DomainError::LoginRequired => StatusCode::FOUND,
            DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden => StatusCode::FORBIDDEN,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::UserAlreadyExists(_)
            | DomainError::SlugTaken(_)
            | DomainError::Protected { .. } => StatusCode::CONFLICT,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let DomainError::LoginRequired = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, LOGIN_URL))
                .finish();
        }

        let message = self.to_string();
        let details = match self {
            DomainError::PostNotFound(resource)
            | DomainError::CategoryNotFound(resource)
            | DomainError::TagNotFound(resource) => Some(json!({ "resource": resource })),
            DomainError::UserNotFound(resource) | DomainError::CommentNotFound(resource) => {
                Some(json!({ "resource": resource }))
            }
            DomainError::Protected {
                resource,
                referenced_by,
            } => Some(json!({ "resource": resource, "referenced_by": referenced_by })),
            DomainError::Validation(errors) => Some(json!({ "fields": errors })),
            DomainError::Forbidden => Some(json!({ "message": "staff access required" })),
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_required_redirects_to_login_page() {
        let response = DomainError::LoginRequired.error_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_URL
        );
    }

    #[test]
    fn protected_delete_is_a_conflict() {
        let err = DomainError::Protected {
            resource: "category",
            referenced_by: "posts",
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "cannot delete category: still referenced by posts"
        );
    }

    #[test]
    fn empty_listing_and_bad_pages_are_not_found() {
        assert!(DomainError::EmptyListing.is_not_found());
        assert!(DomainError::InvalidPage("abc".into()).is_not_found());
        assert!(!DomainError::Forbidden.is_not_found());
    }
}
