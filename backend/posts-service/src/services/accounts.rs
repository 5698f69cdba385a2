/// Account service - signup, login and administrative account creation
use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::forms::{FormErrors, LoginForm, SignupForm, NON_FIELD};
use crate::models::{Group, NewUser, User};
use crate::security::{hash_password, verify_password};
use crate::services::posts::FormResult;

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a user from the signup form.
    pub async fn signup(&self, form: &SignupForm) -> Result<FormResult<User>> {
        let valid = match form.clean() {
            Ok(valid) => valid,
            Err(errors) => return Ok(Err(errors)),
        };

        if self
            .store
            .get_user_by_username(&valid.username)
            .await?
            .is_some()
        {
            return Ok(Err(username_taken()));
        }

        let password_hash = hash_password(&valid.password)?;
        match self
            .store
            .create_user(NewUser {
                username: valid.username,
                first_name: valid.first_name,
                last_name: valid.last_name,
                email: valid.email,
                password_hash,
            })
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "user signed up");
                Ok(Ok(user))
            }
            Err(AppError::Conflict(_)) => Ok(Err(username_taken())),
            Err(e) => Err(e),
        }
    }

    /// Check credentials from the login form.
    pub async fn login(&self, form: &LoginForm) -> Result<FormResult<User>> {
        if let Err(errors) = form.validate() {
            return Ok(Err(errors));
        }

        let user = self.store.get_user_by_username(form.username.trim()).await?;
        match user {
            Some(user) if verify_password(&form.password, &user.password_hash) => {
                tracing::info!(user_id = user.id, "user logged in");
                Ok(Ok(user))
            }
            _ => {
                let mut errors = FormErrors::new();
                errors.add(NON_FIELD, INVALID_LOGIN);
                Ok(Err(errors))
            }
        }
    }

    /// Create a user outside the signup form (admin tooling).
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash,
            })
            .await
    }

    /// Create a group (admin tooling).
    pub async fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<Group> {
        if title.trim().is_empty() || slug.trim().is_empty() {
            return Err(AppError::ValidationError(
                "group title and slug are required".to_string(),
            ));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::ValidationError(format!(
                "slug '{}' may contain only letters, numbers, hyphens and underscores",
                slug
            )));
        }
        self.store.create_group(title, slug, description).await
    }
}

fn username_taken() -> FormErrors {
    let mut errors = FormErrors::new();
    errors.add("username", "A user with that username already exists.");
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn signup_form(username: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: "war-and-peace".to_string(),
            password2: "war-and-peace".to_string(),
            ..SignupForm::default()
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let service = AccountService::new(Arc::new(MemoryStore::new()));
        let user = service.signup(&signup_form("leo")).await.unwrap().unwrap();
        assert_eq!(user.username, "leo");

        let duplicate = service.signup(&signup_form("leo")).await.unwrap();
        assert!(duplicate.unwrap_err().has("username"));

        let ok = service
            .login(&LoginForm {
                username: "leo".to_string(),
                password: "war-and-peace".to_string(),
                next: None,
            })
            .await
            .unwrap();
        assert_eq!(ok.unwrap().id, user.id);

        let bad = service
            .login(&LoginForm {
                username: "leo".to_string(),
                password: "wrong-password".to_string(),
                next: None,
            })
            .await
            .unwrap();
        assert_eq!(bad.unwrap_err().non_field(), vec![INVALID_LOGIN.to_string()]);
    }

    #[tokio::test]
    async fn group_slug_validated() {
        let service = AccountService::new(Arc::new(MemoryStore::new()));
        assert!(service.create_group("Cats", "cats", "").await.is_ok());
        assert!(matches!(
            service.create_group("Dogs", "dogs and more", "").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.create_group("Cats again", "cats", "").await,
            Err(AppError::Conflict(_))
        ));
    }
}
