//! Members, permissions and token claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Group whose members see every member's loans
pub const LIBRARIANS_GROUP: &str = "Librarians";

/// Named permission grants, serialized as `app.codename`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "catalog.can_mark_returned")]
    CanMarkReturned,
    #[serde(rename = "catalog.add_author")]
    AddAuthor,
    #[serde(rename = "catalog.change_author")]
    ChangeAuthor,
    #[serde(rename = "catalog.delete_author")]
    DeleteAuthor,
    #[serde(rename = "catalog.add_book")]
    AddBook,
    #[serde(rename = "catalog.change_book")]
    ChangeBook,
    #[serde(rename = "catalog.delete_book")]
    DeleteBook,
    #[serde(rename = "catalog.add_bookinstance")]
    AddBookInstance,
    #[serde(rename = "catalog.change_bookinstance")]
    ChangeBookInstance,
    #[serde(rename = "catalog.delete_bookinstance")]
    DeleteBookInstance,
    #[serde(rename = "catalog.add_genre")]
    AddGenre,
    #[serde(rename = "catalog.delete_genre")]
    DeleteGenre,
    #[serde(rename = "catalog.add_language")]
    AddLanguage,
    #[serde(rename = "catalog.delete_language")]
    DeleteLanguage,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::CanMarkReturned,
        Permission::AddAuthor,
        Permission::ChangeAuthor,
        Permission::DeleteAuthor,
        Permission::AddBook,
        Permission::ChangeBook,
        Permission::DeleteBook,
        Permission::AddBookInstance,
        Permission::ChangeBookInstance,
        Permission::DeleteBookInstance,
        Permission::AddGenre,
        Permission::DeleteGenre,
        Permission::AddLanguage,
        Permission::DeleteLanguage,
    ];

    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanMarkReturned => "catalog.can_mark_returned",
            Permission::AddAuthor => "catalog.add_author",
            Permission::ChangeAuthor => "catalog.change_author",
            Permission::DeleteAuthor => "catalog.delete_author",
            Permission::AddBook => "catalog.add_book",
            Permission::ChangeBook => "catalog.change_book",
            Permission::DeleteBook => "catalog.delete_book",
            Permission::AddBookInstance => "catalog.add_bookinstance",
            Permission::ChangeBookInstance => "catalog.change_bookinstance",
            Permission::DeleteBookInstance => "catalog.delete_bookinstance",
            Permission::AddGenre => "catalog.add_genre",
            Permission::DeleteGenre => "catalog.delete_genre",
            Permission::AddLanguage => "catalog.add_language",
            Permission::DeleteLanguage => "catalog.delete_language",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.codename())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.codename() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Library member account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub is_active: bool,
}

/// New account, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

/// JWT Claims for authenticated members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub groups: Vec<String>,
    pub permissions: Vec<Permission>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_librarian(&self) -> bool {
        self.groups.iter().any(|g| g == LIBRARIANS_GROUP)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Login request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response carrying the bearer token
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> UserClaims {
        let now = chrono::Utc::now().timestamp();
        UserClaims {
            sub: "marian".into(),
            user_id: 4,
            groups: vec![LIBRARIANS_GROUP.into()],
            permissions: vec![Permission::CanMarkReturned],
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = claims();
        let token = claims.create_token("secret").unwrap();
        assert_eq!(UserClaims::from_token(&token, "secret").unwrap(), claims);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut expired = claims();
        expired.exp = chrono::Utc::now().timestamp() - 3600;
        let token = expired.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_permission_codenames() {
        for permission in Permission::ALL {
            assert_eq!(permission.codename().parse::<Permission>(), Ok(permission));
            assert_eq!(
                serde_json::to_value(permission).unwrap(),
                serde_json::Value::String(permission.codename().to_string())
            );
        }
    }

    #[test]
    fn test_librarian_membership() {
        let mut c = claims();
        assert!(c.is_librarian());
        c.groups.clear();
        assert!(!c.is_librarian());
        assert!(c.has_permission(Permission::CanMarkReturned));
        assert!(!c.has_permission(Permission::AddAuthor));
    }
}
