//! Role-specific projections of controller state.
//!
//! Views own nothing but transient input text. All reads come from
//! [`RelationshipController::snapshot`] and all actions go through the
//! controller, which is the only path to the store.

use std::sync::Arc;

use shared::{
    domain::{Decision, RequestId, Role, UserId},
    protocol::{CandidateUser, RelationshipRequest},
};
use tokio::sync::broadcast;

use crate::{
    controller::{RelationshipController, RelationshipEvent, RelationshipSnapshot},
    error::{ClientError, ConflictKind, Result},
};

pub const MENTOR_BADGE: &str = "Mentor";

/// Link-out target for a learner's progress data.
pub fn learner_progress_path(learner_id: UserId) -> String {
    format!("/learners/{}/progress", learner_id.0)
}

/// User-facing explanation of a failed operation.
pub fn error_banner(err: &ClientError) -> String {
    match err {
        ClientError::Conflict { kind, message } => match kind {
            ConflictKind::DuplicatePending => {
                "A request to this learner is already pending.".to_string()
            }
            ConflictKind::AlreadyEstablished => {
                "You are already connected with this learner.".to_string()
            }
            ConflictKind::AlreadyTerminal => {
                "This request was already answered. Showing its current state.".to_string()
            }
            ConflictKind::InFlight => "Still working on the previous action.".to_string(),
            ConflictKind::Other => format!("Request refused: {message}"),
        },
        ClientError::AuthExpired | ClientError::MissingCredential => {
            "Your session has expired. Please sign in again.".to_string()
        }
        ClientError::Timeout { .. } => "The server took too long to respond. Try again.".to_string(),
        ClientError::Network(_) => "Could not reach the server. Check your connection.".to_string(),
        ClientError::Server { message, .. } => format!("The server reported an error: {message}"),
        ClientError::RoleMismatch { operation, role } => {
            format!("'{operation}' is not available for a {role} account.")
        }
    }
}

fn format_requested_at(request: &RelationshipRequest) -> Option<String> {
    request
        .created_at
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub user_id: UserId,
    pub display_name: String,
    pub username: String,
    pub request_in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub request_id: RequestId,
    pub counterpart_id: UserId,
    pub display_name: String,
    pub username: String,
    pub requested_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerRow {
    pub user_id: UserId,
    pub display_name: String,
    pub username: String,
    pub progress_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorViewModel {
    pub search_text: String,
    pub searching: bool,
    pub search_results_stale: bool,
    pub candidates: Vec<CandidateRow>,
    pub pending_outgoing: Vec<PendingRow>,
    pub my_learners: Vec<LearnerRow>,
    pub loading: bool,
    pub error_banner: Option<String>,
}

impl MentorViewModel {
    pub fn from_snapshot(snapshot: &RelationshipSnapshot, search_text: &str) -> Self {
        let candidates = snapshot
            .last_search_results
            .iter()
            .map(|candidate: &CandidateUser| CandidateRow {
                user_id: candidate.user_id,
                display_name: candidate.display_name().to_string(),
                username: candidate.username.clone(),
                request_in_flight: snapshot.inflight.is_sending(candidate.user_id),
            })
            .collect();

        let pending_outgoing = snapshot
            .pending_outgoing
            .iter()
            .map(|request| PendingRow {
                request_id: request.id,
                counterpart_id: request.counterpart.user_id,
                display_name: request.counterpart.display_name().to_string(),
                username: request.counterpart.username.clone(),
                requested_at: format_requested_at(request),
            })
            .collect();

        let my_learners = snapshot
            .established
            .iter()
            .map(|request| LearnerRow {
                user_id: request.learner_id,
                display_name: request.counterpart.display_name().to_string(),
                username: request.counterpart.username.clone(),
                progress_link: learner_progress_path(request.learner_id),
            })
            .collect();

        Self {
            search_text: search_text.to_string(),
            searching: snapshot.inflight.searching,
            search_results_stale: snapshot.search_results_stale,
            candidates,
            pending_outgoing,
            my_learners,
            loading: !snapshot.loaded && snapshot.inflight.refreshing,
            error_banner: snapshot.last_error.as_ref().map(error_banner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRow {
    pub request_id: RequestId,
    pub from_user_id: UserId,
    pub display_name: String,
    pub username: String,
    pub requested_at: Option<String>,
    /// False while a response to this row is awaiting the store.
    pub actions_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorRow {
    pub user_id: UserId,
    pub display_name: String,
    pub username: String,
    pub badge: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerViewModel {
    pub incoming: Vec<IncomingRow>,
    pub my_mentors: Vec<MentorRow>,
    pub loading: bool,
    pub error_banner: Option<String>,
}

impl LearnerViewModel {
    pub fn from_snapshot(snapshot: &RelationshipSnapshot) -> Self {
        let incoming = snapshot
            .pending_incoming
            .iter()
            .map(|request| IncomingRow {
                request_id: request.id,
                from_user_id: request.mentor_id,
                display_name: request.counterpart.display_name().to_string(),
                username: request.counterpart.username.clone(),
                requested_at: format_requested_at(request),
                actions_enabled: !snapshot.inflight.is_responding(request.id),
            })
            .collect();

        let my_mentors = snapshot
            .established
            .iter()
            .map(|request| MentorRow {
                user_id: request.mentor_id,
                display_name: request.counterpart.display_name().to_string(),
                username: request.counterpart.username.clone(),
                badge: MENTOR_BADGE,
            })
            .collect();

        Self {
            incoming,
            my_mentors,
            loading: !snapshot.loaded && snapshot.inflight.refreshing,
            error_banner: snapshot.last_error.as_ref().map(error_banner),
        }
    }
}

fn ensure_role(controller: &RelationshipController, role: Role, view: &'static str) -> Result<()> {
    let viewer = controller.viewer();
    if viewer.role == role {
        Ok(())
    } else {
        Err(ClientError::RoleMismatch {
            operation: view,
            role: viewer.role,
        })
    }
}

/// The mentor's "manage learners" screen.
pub struct MentorView {
    controller: Arc<RelationshipController>,
    search_text: String,
}

impl MentorView {
    pub fn new(controller: Arc<RelationshipController>) -> Result<Self> {
        ensure_role(&controller, Role::Mentor, "manage learners view")?;
        Ok(Self {
            controller,
            search_text: String::new(),
        })
    }

    pub async fn on_mount(&self) -> Result<()> {
        self.controller.refresh().await
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub async fn submit_search(&self) -> Result<Vec<CandidateUser>> {
        self.controller.search(&self.search_text).await
    }

    pub async fn send_request(&self, candidate_id: UserId) -> Result<RelationshipRequest> {
        self.controller.send_request(candidate_id).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.controller.refresh().await
    }

    pub async fn model(&self) -> MentorViewModel {
        let snapshot = self.controller.snapshot().await;
        MentorViewModel::from_snapshot(&snapshot, &self.search_text)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelationshipEvent> {
        self.controller.subscribe_events()
    }
}

/// The learner's "manage requests" screen.
pub struct LearnerView {
    controller: Arc<RelationshipController>,
}

impl LearnerView {
    pub fn new(controller: Arc<RelationshipController>) -> Result<Self> {
        ensure_role(&controller, Role::Learner, "manage requests view")?;
        Ok(Self { controller })
    }

    pub async fn on_mount(&self) -> Result<()> {
        self.controller.refresh().await
    }

    pub async fn accept(&self, request_id: RequestId) -> Result<RelationshipRequest> {
        self.controller.respond(request_id, Decision::Accepted).await
    }

    pub async fn reject(&self, request_id: RequestId) -> Result<RelationshipRequest> {
        self.controller.respond(request_id, Decision::Rejected).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.controller.refresh().await
    }

    pub async fn model(&self) -> LearnerViewModel {
        let snapshot = self.controller.snapshot().await;
        LearnerViewModel::from_snapshot(&snapshot)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelationshipEvent> {
        self.controller.subscribe_events()
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
