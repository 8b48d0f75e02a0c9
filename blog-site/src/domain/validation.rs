use std::collections::BTreeMap;

use serde::Serialize;

pub const TITLE_MAX_LEN: usize = 255;
pub const TAG_TITLE_MAX_LEN: usize = 50;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

pub const REQUIRED: &str = "This field is required.";

/// Field-keyed validation messages. The empty key holds errors that belong
/// to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_general(&mut self, message: impl Into<String>) {
        self.add("", message);
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

pub fn validate_title(title: &str, max_len: usize) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(REQUIRED.to_string());
    }
    if title.chars().count() > max_len {
        return Err(format!(
            "Ensure this value has at most {max_len} characters."
        ));
    }
    Ok(title.to_string())
}

/// Post titles additionally must not start with a digit.
pub fn validate_post_title(title: &str) -> Result<String, String> {
    let title = validate_title(title, TITLE_MAX_LEN)?;
    if title.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err("Title must not start with a digit.".to_string());
    }
    Ok(title)
}

pub fn validate_username(username: &str) -> Result<String, String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(REQUIRED.to_string());
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Ensure this value has at most {USERNAME_MAX_LEN} characters."
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    Ok(username.to_string())
}

pub fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(REQUIRED.to_string());
    }
    let invalid = || "Enter a valid email address.".to_string();
    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || local.contains(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2
        || labels
            .iter()
            .any(|label| label.is_empty() || !label.chars().all(|c| c.is_alphanumeric() || c == '-'))
    {
        return Err(invalid());
    }
    Ok(email.to_string())
}

pub fn validate_password(password: &str, username: &str) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    if password.chars().count() < PASSWORD_MIN_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_title_starting_with_digit_is_rejected() {
        assert!(validate_post_title("1 Test post").is_err());
        assert!(validate_post_title("  7 samurai").is_err());
        assert_eq!(validate_post_title("Test post").unwrap(), "Test post");
    }

    #[test]
    fn only_decimal_digits_count_as_a_leading_digit() {
        assert!(validate_post_title("½ price").is_ok());
        assert!(validate_post_title("Ⅻ chairs").is_ok());
        assert!(validate_post_title("²nd edition").is_ok());
    }

    #[test]
    fn post_title_is_trimmed_and_required() {
        assert_eq!(validate_post_title("  Hello  ").unwrap(), "Hello");
        assert_eq!(validate_post_title("   ").unwrap_err(), REQUIRED);
        assert!(validate_post_title(&"a".repeat(256)).is_err());
        assert!(validate_post_title(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("test_user").is_ok());
        assert!(validate_username("name.with+chars@x-y").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"u".repeat(151)).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("test_user@test.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("@test.com").is_err());
        assert!(validate_email("user@test..com").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Exs4Lyyf7Ad3aeD", "test_user").is_ok());
        let problems = validate_password("12345", "test_user").unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(validate_password("test_user", "test_user").is_err());
    }

    #[test]
    fn form_errors_collect_by_field() {
        let mut errors = FormErrors::new();
        errors.check("title", validate_post_title("9lives").map(|_| ()));
        errors.add_general("Could not add the post.");
        assert!(errors.has("title"));
        assert_eq!(errors.field(""), ["Could not add the post."]);
        assert!(errors.field("content").is_empty());
        assert!(errors.into_result(()).is_err());
    }
}
