//! Backend commands queued from the front end to the backend worker.

use shared::domain::{Decision, RequestId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Initial load of the active view.
    Mount,
    Refresh,
    Search {
        query: String,
    },
    SendRequest {
        user_id: UserId,
    },
    Respond {
        request_id: RequestId,
        decision: Decision,
    },
    /// Re-emit the current view model without touching the store.
    Show,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Mount => "mount",
            BackendCommand::Refresh => "refresh",
            BackendCommand::Search { .. } => "search",
            BackendCommand::SendRequest { .. } => "send_request",
            BackendCommand::Respond { .. } => "respond",
            BackendCommand::Show => "show",
        }
    }
}
