//! HTML form payloads and their field validation.
//!
//! Every field defaults to empty so a missing input shows up as a field
//! error instead of a rejected request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::auth_service::Registration;
use crate::application::post_service::INVALID_CATEGORY;
use crate::domain::post::NewPost;
use crate::domain::validation::{
    FormErrors, REQUIRED, validate_email, validate_password, validate_post_title,
    validate_username,
};

pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

/// What a template needs to redisplay a form: the submitted values and the
/// errors, with form-wide messages split out.
#[derive(Debug, Clone, Serialize)]
pub struct FormState<T: Serialize> {
    pub values: T,
    pub errors: FormErrors,
    pub non_field_errors: Vec<String>,
}

impl<T: Serialize> FormState<T> {
    pub fn new(values: T, errors: FormErrors) -> Self {
        Self {
            non_field_errors: errors.field("").to_vec(),
            values,
            errors,
        }
    }

    pub fn blank(values: T) -> Self {
        Self::new(values, FormErrors::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AddPostForm {
    pub title: String,
    pub content: String,
    pub category: String,
    /// Browsers send `on` for a ticked checkbox and nothing otherwise.
    pub is_published: Option<String>,
}

impl AddPostForm {
    pub fn validate(&self) -> Result<NewPost, FormErrors> {
        let mut errors = FormErrors::new();
        let title = validate_post_title(&self.title)
            .map_err(|message| errors.add("title", message))
            .ok();
        let category = match self.category.trim() {
            "" => {
                errors.add("category", REQUIRED);
                None
            }
            raw => Uuid::parse_str(raw)
                .map_err(|_| errors.add("category", INVALID_CATEGORY))
                .ok(),
        };

        match (title, category) {
            (Some(title), Some(category_id)) if errors.is_empty() => Ok(NewPost {
                title,
                content: self.content.clone(),
                category_id,
                is_published: self
                    .is_published
                    .as_deref()
                    .is_some_and(|v| !matches!(v, "" | "false" | "off")),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::new();
        let username = validate_username(&self.username)
            .map_err(|message| errors.add("username", message))
            .ok();
        let email = validate_email(&self.email)
            .map_err(|message| errors.add("email", message))
            .ok();

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else if let Err(problems) =
                validate_password(&self.password2, username.as_deref().unwrap_or(""))
            {
                for problem in problems {
                    errors.add("password2", problem);
                }
            }
        }

        match (username, email) {
            (Some(username), Some(email)) if errors.is_empty() => Ok(Registration {
                username,
                email,
                password: self.password1.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password1: &str, password2: &str) -> RegistrationForm {
        RegistrationForm {
            username: "new_user".into(),
            email: "new@example.com".into(),
            password1: password1.into(),
            password2: password2.into(),
        }
    }

    #[test]
    fn add_post_requires_title_and_category() {
        let errors = AddPostForm::default().validate().unwrap_err();
        assert_eq!(errors.field("title"), [REQUIRED]);
        assert_eq!(errors.field("category"), [REQUIRED]);

        let form = AddPostForm {
            title: "1 Test post".into(),
            category: "not-a-uuid".into(),
            ..AddPostForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("title"));
        assert_eq!(errors.field("category"), [INVALID_CATEGORY]);
    }

    #[test]
    fn add_post_checkbox_and_blank_content() {
        let category = Uuid::new_v4();
        let form = AddPostForm {
            title: "Test post".into(),
            content: String::new(),
            category: category.to_string(),
            is_published: Some("on".into()),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.category_id, category);
        assert!(draft.is_published);
        assert!(draft.content.is_empty());

        let unticked = AddPostForm {
            is_published: None,
            ..form
        };
        assert!(!unticked.validate().unwrap().is_published);
    }

    #[test]
    fn registration_password_rules() {
        let ok = registration("Sup3rSecret!", "Sup3rSecret!").validate().unwrap();
        assert_eq!(ok.username, "new_user");

        let mismatch = registration("Sup3rSecret!", "Different1!").validate().unwrap_err();
        assert_eq!(mismatch.field("password2"), [PASSWORD_MISMATCH]);

        let numeric = registration("12345678", "12345678").validate().unwrap_err();
        assert!(numeric.has("password2"));

        let short = registration("abc", "abc").validate().unwrap_err();
        assert!(short.has("password2"));

        let same_as_name = registration("new_user", "new_user").validate().unwrap_err();
        assert!(same_as_name.has("password2"));
    }

    #[test]
    fn passwords_are_not_echoed_back() {
        let state = FormState::blank(registration("Sup3rSecret!", "Sup3rSecret!"));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["values"]["username"], "new_user");
        assert!(json["values"].get("password1").is_none());
    }

    #[test]
    fn general_errors_are_split_out() {
        let mut errors = FormErrors::single("username", REQUIRED);
        errors.add_general("Registration failed.");
        let state = FormState::new(LoginForm::default(), errors);
        assert_eq!(state.non_field_errors, ["Registration failed."]);
    }
}
