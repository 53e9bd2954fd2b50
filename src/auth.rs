use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Admin authority: one configured account, one opaque token per login.
///
/// Tokens instead of a shared logged-in flag so concurrent admin clients
/// don't revoke each other on logout.
pub struct AdminAuth {
    username: String,
    password: String,
    tokens: Mutex<HashSet<String>>,
}

impl AdminAuth {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            tokens: Mutex::new(HashSet::new()),
        }
    }

    /// Check credentials and mint a session token.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        if username != self.username || password != self.password {
            return Err(Error::InvalidCredentials);
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens
            .lock()
            .map_err(|_| Error::Internal("admin token set poisoned".into()))?
            .insert(token.clone());
        Ok(token)
    }

    /// Revoke a token. Safe to call with an unknown or already-revoked token.
    pub fn logout(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(token);
        }
    }

    /// Guard for admin-only operations.
    pub fn require(&self, token: Option<&str>) -> Result<()> {
        let token = token.ok_or(Error::Unauthorized)?;
        let tokens = self
            .tokens
            .lock()
            .map_err(|_| Error::Internal("admin token set poisoned".into()))?;
        if tokens.contains(token) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AdminAuth {
        AdminAuth::new("root", "secret")
    }

    #[test]
    fn login_with_bad_credentials_fails() {
        let auth = auth();
        assert!(matches!(
            auth.login("root", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("admin", "secret"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn require_fails_before_login_and_succeeds_after() {
        let auth = auth();
        assert!(matches!(auth.require(None), Err(Error::Unauthorized)));
        assert!(matches!(
            auth.require(Some("bogus")),
            Err(Error::Unauthorized)
        ));

        let token = auth.login("root", "secret").unwrap();
        assert!(auth.require(Some(&token)).is_ok());

        auth.logout(&token);
        assert!(matches!(
            auth.require(Some(&token)),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn logout_of_one_token_leaves_others_valid() {
        let auth = auth();
        let a = auth.login("root", "secret").unwrap();
        let b = auth.login("root", "secret").unwrap();
        assert_ne!(a, b);

        auth.logout(&a);
        assert!(auth.require(Some(&b)).is_ok());
    }

    #[test]
    fn logout_of_unknown_token_is_a_no_op() {
        let auth = auth();
        auth.logout("never-issued");
    }
}
