//! Bearer credentials supplied by the external session collaborator.

use std::{fmt, sync::RwLock};

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Source of the credential attached to each store call. Issuance and
/// renewal belong to whoever implements this.
pub trait CredentialSource: Send + Sync {
    fn current_credential(&self) -> Option<Credential>;
}

/// Credential holder that the session layer can rotate or clear.
#[derive(Default)]
pub struct SessionCredentials {
    current: RwLock<Option<Credential>>,
}

impl SessionCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(Credential::bearer(token))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn replace(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(Credential::bearer(token));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.current.write() {
            *guard = None;
        }
    }
}

impl CredentialSource for SessionCredentials {
    fn current_credential(&self) -> Option<Credential> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }
}
