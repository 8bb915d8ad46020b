//! UI/backend events and error modeling for the relationship front end.

use client_core::{views::error_banner, ClientError, LearnerViewModel, MentorViewModel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewModel {
    Mentor(MentorViewModel),
    Learner(LearnerViewModel),
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Info(String),
    ViewUpdated(ViewModel),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Conflict,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Dispatch,
    Input,
    Refresh,
    Search,
    SendRequest,
    Respond,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_client(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::AuthExpired | ClientError::MissingCredential => UiErrorCategory::Auth,
            ClientError::Conflict { .. } => UiErrorCategory::Conflict,
            ClientError::Network(_) | ClientError::Timeout { .. } | ClientError::Server { .. } => {
                UiErrorCategory::Transport
            }
            ClientError::RoleMismatch { .. } => UiErrorCategory::Validation,
        };

        Self {
            category,
            context,
            message: error_banner(err),
        }
    }

    /// Classifies free-form failures that never went through the client, such as startup errors.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("unauthorized")
            || message_lower.contains("session expired")
            || message_lower.contains("token")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("unknown")
            || message_lower.contains("usage")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} failed: {}", self.context, self.message)
    }
}
