//! Authentication and member accounts

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::user::{LoginResponse, NewUser, Permission, User, UserClaims, LIBRARIANS_GROUP},
    repository::Repository,
};

/// Account creation request
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Check credentials and issue a bearer token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !user.is_active || !verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let token = self.create_token_for_user(&user).await?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours as i64 * 3600,
            user,
        })
    }

    /// Claims carrying the user's groups and effective permissions
    pub async fn claims_for(&self, user: &User) -> AppResult<UserClaims> {
        let groups = self.repository.users.groups(user.id).await?;
        let permissions = self
            .repository
            .users
            .permissions(user.id)
            .await?
            .iter()
            .filter_map(|codename| codename.parse::<Permission>().ok())
            .collect();

        let now = Utc::now().timestamp();
        Ok(UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            groups,
            permissions,
            exp: now + self.config.jwt_expiration_hours as i64 * 3600,
            iat: now,
        })
    }

    pub async fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        self.claims_for(user)
            .await?
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        let created = self
            .repository
            .users
            .create(&NewUser {
                password_hash: hash_password(&user.password)?,
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
            })
            .await?;
        tracing::info!(user_id = created.id, username = %created.username, "user created");
        Ok(created)
    }

    /// Make sure the librarian group exists, and when a bootstrap password is
    /// configured, that the admin account exists and belongs to it
    pub async fn ensure_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<Option<User>> {
        let codenames: Vec<&str> = Permission::ALL.iter().map(|p| p.codename()).collect();
        self.repository
            .users
            .ensure_group(LIBRARIANS_GROUP, &codenames)
            .await?;

        let Some(password) = bootstrap.admin_password.as_deref() else {
            return Ok(None);
        };
        if let Some(existing) = self
            .repository
            .users
            .get_by_username(&bootstrap.admin_username)
            .await?
        {
            return Ok(Some(existing));
        }

        let admin = self
            .create_user(CreateUser {
                username: bootstrap.admin_username.clone(),
                password: password.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: None,
            })
            .await?;
        self.repository
            .users
            .add_to_group(admin.id, LIBRARIANS_GROUP)
            .await?;
        tracing::info!(username = %admin.username, "bootstrap librarian created");
        Ok(Some(admin))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Accounts with an unparseable hash can never log in
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let Ok(parsed_hash) = PasswordHash::new(&user.password_hash) else {
        return Ok(false);
    };
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_admin_logs_in_as_librarian() {
        let repository = Repository::in_memory();
        let config = AuthConfig {
            jwt_secret: "test-secret".into(),
            ..Default::default()
        };
        let service = UsersService::new(repository, config);
        let bootstrap = BootstrapConfig {
            admin_username: "admin".into(),
            admin_password: Some("s3cret".into()),
        };

        let admin = service.ensure_admin(&bootstrap).await.unwrap().unwrap();
        let again = service.ensure_admin(&bootstrap).await.unwrap().unwrap();
        assert_eq!(admin.id, again.id);

        let login = service.authenticate("admin", "s3cret").await.unwrap();
        let claims = UserClaims::from_token(&login.token, "test-secret").unwrap();
        assert!(claims.is_librarian());
        assert_eq!(claims.permissions.len(), Permission::ALL.len());

        assert!(matches!(
            service.authenticate("admin", "wrong").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            service.authenticate("nobody", "s3cret").await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_codenames_are_ignored() {
        let repository = Repository::in_memory();
        let service = UsersService::new(repository.clone(), AuthConfig::default());
        let user = repository
            .users
            .create(&NewUser {
                username: "ann".into(),
                password_hash: "!".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: None,
            })
            .await
            .unwrap();
        repository.users.grant_permission(user.id, "catalog.add_author").await.unwrap();
        repository.users.grant_permission(user.id, "admin.view_logentry").await.unwrap();

        let claims = service.claims_for(&user).await.unwrap();
        assert_eq!(claims.permissions, vec![Permission::AddAuthor]);
        assert!(claims.groups.is_empty());
    }
}
