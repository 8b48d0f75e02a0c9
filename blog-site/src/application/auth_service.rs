use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::User;
use crate::domain::validation::FormErrors;
use crate::infrastructure::config::AdminAccount;
use crate::infrastructure::security::{JwtKeys, hash_password, verify_password};

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Resolves a session token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, DomainError> {
        let claims = self
            .keys
            .verify_token(token)
            .map_err(|_| DomainError::Unauthorized)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthorized)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::Unauthorized)
    }

    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(DomainError::Validation(FormErrors::single(
                "username",
                DUPLICATE_USERNAME,
            )));
        }

        let hash = hash_password(&registration.password)
            .map_err(|err| DomainError::Internal(err.to_string()))?;
        let user = User::new(registration.username, registration.email.to_lowercase(), hash);
        match self.users.create(user).await {
            Err(DomainError::UserAlreadyExists(_)) => Err(DomainError::Validation(
                FormErrors::single("username", DUPLICATE_USERNAME),
            )),
            other => other,
        }
    }

    /// Checks credentials and issues a session token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), DomainError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(DomainError::Unauthorized)?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|_| DomainError::Unauthorized)?;
        if !valid {
            return Err(DomainError::Unauthorized);
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub fn issue_token(&self, user: &User) -> Result<String, DomainError> {
        self.keys
            .generate_token(user.id)
            .map_err(|err| DomainError::Internal(err.to_string()))
    }

    /// Creates the configured staff account unless a user with that name exists.
    #[instrument(skip(self, account), fields(username = %account.username))]
    pub async fn ensure_admin(&self, account: &AdminAccount) -> Result<User, DomainError> {
        if let Some(existing) = self.users.find_by_username(&account.username).await? {
            if !existing.is_staff {
                warn!(user_id = %existing.id, "bootstrap admin name belongs to a non-staff user");
            }
            return Ok(existing);
        }

        let hash = hash_password(&account.password)
            .map_err(|err| DomainError::Internal(err.to_string()))?;
        let user = User::new(
            account.username.clone(),
            account.email.to_lowercase(),
            hash,
        )
        .staff();
        let user = self.users.create(user).await?;
        info!(user_id = %user.id, "bootstrap admin created");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        self.users.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Repositories;

    fn service() -> AuthService {
        let repos = Repositories::in_memory();
        AuthService::new(repos.users, JwtKeys::new("secret".into(), 1))
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.into(),
            email: "Test@Example.com".into(),
            password: "Sup3rSecret!".into(),
        }
    }

    #[tokio::test]
    async fn registered_user_can_log_in() {
        let service = service();
        let user = service.register(registration("test_user")).await.unwrap();
        assert_eq!(user.email, "test@example.com");
        assert!(!user.is_staff);

        let (logged_in, token) = service.login("test_user", "Sup3rSecret!").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(service.authenticate(&token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn usernames_are_unique_ignoring_case() {
        let service = service();
        service.register(registration("Alice")).await.unwrap();
        let err = service.register(registration("alice")).await.unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.field("username"), [DUPLICATE_USERNAME])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let service = service();
        service.register(registration("bob")).await.unwrap();
        assert!(matches!(
            service.login("bob", "nope").await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            service.login("nobody", "Sup3rSecret!").await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            service.authenticate("garbage").await,
            Err(DomainError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let service = service();
        let account = AdminAccount {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "Sup3rSecret!".into(),
        };
        let first = service.ensure_admin(&account).await.unwrap();
        assert!(first.is_staff);
        let second = service.ensure_admin(&account).await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
