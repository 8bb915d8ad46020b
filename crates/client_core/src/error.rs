//! Error taxonomy for relationship operations.

use std::time::Duration;

use shared::{
    domain::Role,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// The store call an error came back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Search,
    Create,
    Respond,
}

/// Why the store (or the local in-flight guard) refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicatePending,
    AlreadyEstablished,
    AlreadyTerminal,
    InFlight,
    Other,
}

impl ConflictKind {
    /// Derives the conflict kind from a store error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("not pending")
            || lower.contains("terminal")
            || lower.contains("already responded")
            || lower.contains("already accepted")
            || lower.contains("already rejected")
        {
            ConflictKind::AlreadyTerminal
        } else if lower.contains("established") || lower.contains("already linked") {
            ConflictKind::AlreadyEstablished
        } else if lower.contains("duplicate") || lower.contains("pending") {
            ConflictKind::DuplicatePending
        } else {
            ConflictKind::Other
        }
    }

    /// A refused respond always means the request left `pending`; a refused
    /// create is either a duplicate or an existing link.
    pub fn for_call(call: StoreCall, message: &str) -> Self {
        match call {
            StoreCall::Respond => ConflictKind::AlreadyTerminal,
            StoreCall::Create => {
                let lower = message.to_ascii_lowercase();
                if lower.contains("established")
                    || lower.contains("already linked")
                    || lower.contains("already accepted")
                {
                    ConflictKind::AlreadyEstablished
                } else {
                    ConflictKind::DuplicatePending
                }
            }
            StoreCall::List | StoreCall::Search => ConflictKind::classify(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },
    #[error("session expired or credential rejected")]
    AuthExpired,
    #[error("no session credential available")]
    MissingCredential,
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("{operation} is not available to a {role}")]
    RoleMismatch { operation: &'static str, role: Role },
}

impl ClientError {
    pub fn in_flight(message: impl Into<String>) -> Self {
        ClientError::Conflict {
            kind: ConflictKind::InFlight,
            message: message.into(),
        }
    }

    /// Maps a non-2xx response to `call` onto the taxonomy.
    pub fn from_response(
        call: StoreCall,
        status: u16,
        body: Option<ApiError>,
        raw_body: &str,
    ) -> Self {
        let message = match &body {
            Some(api) => api.message.clone(),
            None if !raw_body.trim().is_empty() => raw_body.trim().to_string(),
            None => format!("request failed with status {status}"),
        };
        let code = body.map(|api| api.code);

        if status == 401 || code == Some(ErrorCode::Unauthorized) {
            return ClientError::AuthExpired;
        }
        if status == 409 || code == Some(ErrorCode::Conflict) {
            return ClientError::Conflict {
                kind: ConflictKind::for_call(call, &message),
                message,
            };
        }
        ClientError::Server { status, message }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }

    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            ClientError::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            ClientError::AuthExpired | ClientError::MissingCredential
        )
    }

    /// Everything except auth problems can be retried by the user in place.
    pub fn is_recoverable(&self) -> bool {
        !self.requires_reauth()
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => ClientError::Server {
                status: status.as_u16(),
                message: value.to_string(),
            },
            None => ClientError::Network(value.to_string()),
        }
    }
}
