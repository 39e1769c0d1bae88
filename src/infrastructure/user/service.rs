//! User service: account creation, credential checks and profile edits

use std::sync::Arc;

use tracing::debug;

use crate::domain::user::{
    normalize_email, validate_email, validate_name, validate_password, User, UserId,
    UserRepository, UserRole,
};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// Request for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Admin edit of another account; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

/// User service wrapping the user store and the password hasher
#[derive(Debug)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    /// Verified against when the email is unknown, so both login failure
    /// paths pay for one hash verification.
    dummy_hash: Option<String>,
}

impl UserService {
    /// Create a new user service
    pub fn new(repository: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        let dummy_hash = hasher.hash("authgate-timing-equalizer").ok();

        Self {
            repository,
            hasher,
            dummy_hash,
        }
    }

    /// Create a new user after validating input and hashing the password
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        validate_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let email = normalize_email(&request.email);

        if self.repository.email_exists(&email).await? {
            return Err(DomainError::conflict("User already exists"));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = User::new(request.name.trim(), email, password_hash, request.role);

        self.repository.create(user).await
    }

    /// Check an email/password pair. `None` covers both unknown email and
    /// wrong password.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let email = normalize_email(email);

        let Some(user) = self.repository.get_by_email(&email).await? else {
            if let Some(dummy) = &self.dummy_hash {
                let _ = self.hasher.verify(password, dummy);
            }
            debug!("Login attempt for unknown email");
            return Ok(None);
        };

        if !self.hasher.verify(password, user.password_hash()) {
            debug!(user_id = %user.id(), "Login attempt with wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Get a user by ID
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        self.repository.get(id).await
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>, DomainError> {
        self.repository.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    /// Apply a profile update. Email stays unique; a new password is re-hashed.
    pub async fn update_profile(
        &self,
        id: &UserId,
        request: UpdateProfileRequest,
    ) -> Result<User, DomainError> {
        let mut user = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))?;

        apply_identity(&mut user, request.name, request.email)?;

        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            validate_password(&password).map_err(|e| DomainError::validation(e.to_string()))?;
            user.set_password_hash(self.hasher.hash(&password)?);
        }

        self.repository.update(&user).await
    }

    /// Admin edit: name, email and role. A signed-in client sees the new
    /// profile on its next refresh.
    pub async fn update_user(
        &self,
        id: &UserId,
        request: UpdateUserRequest,
    ) -> Result<User, DomainError> {
        let mut user = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))?;

        apply_identity(&mut user, request.name, request.email)?;

        if let Some(role) = request.role {
            user.set_role(role);
        }

        self.repository.update(&user).await
    }

    /// Delete a user. Their refresh cookie stops working immediately.
    pub async fn delete(&self, id: &UserId) -> Result<(), DomainError> {
        if !self.repository.delete(id).await? {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        }

        debug!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Blank values count as "not provided"
fn apply_identity(
    user: &mut User,
    name: Option<String>,
    email: Option<String>,
) -> Result<(), DomainError> {
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        validate_name(&name).map_err(|e| DomainError::validation(e.to_string()))?;
        user.set_name(name.trim());
    }

    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        validate_email(&email).map_err(|e| DomainError::validation(e.to_string()))?;
        user.set_email(normalize_email(&email));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::user::password::Argon2PasswordHasher;
    use crate::infrastructure::user::repository::InMemoryUserRepository;

    fn create_service() -> UserService {
        let repository = Arc::new(InMemoryUserRepository::new());
        let hasher = Arc::new(Argon2PasswordHasher::with_costs(1024, 1, 1).unwrap());
        UserService::new(repository, hasher)
    }

    fn make_request(name: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_create_user() {
        let service = create_service();

        let user = service
            .create(make_request("Ada", "Ada@X.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(user.name(), "Ada");
        assert_eq!(user.email(), "ada@x.com");
        assert_ne!(user.password_hash(), "secret1");
        assert_eq!(user.role(), UserRole::User);
    }

    #[tokio::test]
    async fn test_create_user_invalid_input() {
        let service = create_service();

        assert!(service.create(make_request("", "a@x.com", "secret1")).await.is_err());
        assert!(service.create(make_request("Ada", "nope", "secret1")).await.is_err());
        assert!(service.create(make_request("Ada", "a@x.com", "short")).await.is_err());
    }

    #[tokio::test]
    async fn test_create_duplicate_email_is_conflict() {
        let service = create_service();

        service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let result = service
            .create(make_request("Other", "A@x.com", "secret2"))
            .await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let service = create_service();

        let created = service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let user = service.authenticate("a@x.com", "secret1").await.unwrap();
        assert_eq!(user.unwrap().id(), created.id());
    }

    #[tokio::test]
    async fn test_authenticate_normalizes_email() {
        let service = create_service();

        service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let user = service.authenticate(" A@X.COM ", "secret1").await.unwrap();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let service = create_service();

        service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = service.authenticate("a@x.com", "wrong-pass").await.unwrap();
        let unknown_email = service.authenticate("b@x.com", "secret1").await.unwrap();

        assert!(wrong_password.is_none());
        assert!(unknown_email.is_none());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let service = create_service();

        let user = service
            .create(make_request("Ada", "a@x.com", "old-secret"))
            .await
            .unwrap();

        let updated = service
            .update_profile(
                user.id(),
                UpdateProfileRequest {
                    name: Some("Ada L".to_string()),
                    email: Some("ada@x.com".to_string()),
                    password: Some("new-secret".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Ada L");
        assert_eq!(updated.email(), "ada@x.com");

        assert!(service.authenticate("ada@x.com", "old-secret").await.unwrap().is_none());
        assert!(service.authenticate("ada@x.com", "new-secret").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_blank_fields() {
        let service = create_service();

        let user = service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let updated = service
            .update_profile(
                user.id(),
                UpdateProfileRequest {
                    name: Some("  ".to_string()),
                    email: None,
                    password: Some(String::new()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Ada");
        assert!(service.authenticate("a@x.com", "secret1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let service = create_service();

        service.create(make_request("A", "a@x.com", "secret1")).await.unwrap();
        service.create(make_request("B", "b@x.com", "secret2")).await.unwrap();

        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(service.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_user_changes_role() {
        let service = create_service();

        let user = service
            .create(make_request("Ada", "a@x.com", "secret1"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                user.id(),
                UpdateUserRequest {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role(), UserRole::Admin);
        assert_eq!(updated.name(), "Ada");
        assert!(service.authenticate("a@x.com", "secret1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_user_rejects_taken_email() {
        let service = create_service();

        let user = service.create(make_request("A", "a@x.com", "secret1")).await.unwrap();
        service.create(make_request("B", "b@x.com", "secret2")).await.unwrap();

        let result = service
            .update_user(
                user.id(),
                UpdateUserRequest {
                    email: Some("B@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = create_service();

        let user = service.create(make_request("A", "a@x.com", "secret1")).await.unwrap();

        service.delete(user.id()).await.unwrap();

        assert!(service.get(user.id()).await.unwrap().is_none());
        assert!(matches!(
            service.delete(user.id()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
