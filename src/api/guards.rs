//! Access guards run by handlers before any service call

use super::Caller;
use crate::{
    error::{AppError, AppResult},
    models::user::{Permission, UserClaims},
};

/// Result of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// No valid session: send the caller to the login page
    Unauthenticated,
    /// Signed in without the required permission: hard denial
    Forbidden,
}

pub fn login_required(caller: &Caller) -> Access {
    match caller.claims {
        Some(_) => Access::Allowed,
        None => Access::Unauthenticated,
    }
}

pub fn permission_required(caller: &Caller, permission: Permission) -> Access {
    match &caller.claims {
        None => Access::Unauthenticated,
        Some(claims) if claims.has_permission(permission) => Access::Allowed,
        Some(_) => Access::Forbidden,
    }
}

/// Login page URL carrying the path to come back to
pub fn login_redirect(login_url: &str, next: &str) -> String {
    format!(
        "{}?next={}",
        login_url,
        urlencoding::encode(next).replace("%2F", "/")
    )
}

impl Caller {
    fn enforce(&self, access: Access, denied: impl FnOnce() -> String) -> AppResult<&UserClaims> {
        match (access, &self.claims) {
            (Access::Allowed, Some(claims)) => Ok(claims),
            (Access::Forbidden, _) => Err(AppError::Authorization(denied())),
            _ => Err(AppError::LoginRequired(login_redirect(&self.login_url, &self.path))),
        }
    }

    /// Claims of a signed-in caller, or a redirect to the login page
    pub fn require_login(&self) -> AppResult<&UserClaims> {
        self.enforce(login_required(self), String::new)
    }

    /// Claims of a signed-in caller holding `permission`
    pub fn require_permission(&self, permission: Permission) -> AppResult<&UserClaims> {
        self.enforce(permission_required(self, permission), || {
            format!("Permission '{}' required", permission)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(permissions: Option<Vec<Permission>>) -> Caller {
        Caller {
            claims: permissions.map(|permissions| UserClaims {
                sub: "ann".into(),
                user_id: 1,
                groups: vec![],
                permissions,
                exp: 0,
                iat: 0,
            }),
            path: "/catalog/mybooks/?page=2".into(),
            login_url: "/accounts/login/".into(),
        }
    }

    #[test]
    fn test_guard_outcomes() {
        assert_eq!(login_required(&caller(None)), Access::Unauthenticated);
        assert_eq!(login_required(&caller(Some(vec![]))), Access::Allowed);

        let perm = Permission::AddAuthor;
        assert_eq!(permission_required(&caller(None), perm), Access::Unauthenticated);
        assert_eq!(permission_required(&caller(Some(vec![])), perm), Access::Forbidden);
        assert_eq!(permission_required(&caller(Some(vec![perm])), perm), Access::Allowed);
    }

    #[test]
    fn test_anonymous_caller_is_redirected_with_next() {
        match caller(None).require_permission(Permission::AddBook) {
            Err(AppError::LoginRequired(location)) => assert_eq!(
                location,
                "/accounts/login/?next=/catalog/mybooks/%3Fpage%3D2"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_permission_is_forbidden() {
        let binding = caller(Some(vec![Permission::AddBook]));
        let result = binding.require_permission(Permission::AddAuthor);
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }
}
