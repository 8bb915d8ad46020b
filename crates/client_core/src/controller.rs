//! Client-side relationship state.
//!
//! The controller keeps a read cache of the viewer's relationships and never
//! patches it incrementally: every successful mutation is followed by a full
//! [`RelationshipController::refresh`], and whatever the store returns last
//! replaces the cache wholesale. The only local edit is removing a candidate
//! from the current search results once a request to them was created.

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use shared::{
    domain::{Decision, RequestId, RequestStatus, Role, UserId, Viewer},
    protocol::{CandidateUser, RelationshipRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    credentials::{Credential, CredentialSource},
    directory::DirectorySearch,
    error::{ClientError, ConflictKind, Result},
    store::RelationshipStore,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const EVENT_CHANNEL_CAPACITY: usize = 256;
const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound for a single store call.
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Operations currently awaiting the store, for pending indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub refreshing: bool,
    pub searching: bool,
    pub sending: Vec<UserId>,
    pub responding: Vec<RequestId>,
}

impl InflightSnapshot {
    pub fn is_sending(&self, user_id: UserId) -> bool {
        self.sending.contains(&user_id)
    }

    pub fn is_responding(&self, request_id: RequestId) -> bool {
        self.responding.contains(&request_id)
    }

    pub fn any(&self) -> bool {
        self.refreshing || self.searching || !self.sending.is_empty() || !self.responding.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSnapshot {
    pub viewer: Viewer,
    pub pending_outgoing: Vec<RelationshipRequest>,
    pub pending_incoming: Vec<RelationshipRequest>,
    pub established: Vec<RelationshipRequest>,
    pub last_search_results: Vec<CandidateUser>,
    /// Set when the latest search failed and `last_search_results` are from an earlier one.
    pub search_results_stale: bool,
    pub last_query: Option<String>,
    pub last_error: Option<ClientError>,
    /// Whether at least one refresh has completed.
    pub loaded: bool,
    pub inflight: InflightSnapshot,
}

#[derive(Debug, Clone)]
pub enum RelationshipEvent {
    SnapshotUpdated(RelationshipSnapshot),
    OperationFailed {
        operation: &'static str,
        error: ClientError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub pending_outgoing: Vec<RelationshipRequest>,
    pub pending_incoming: Vec<RelationshipRequest>,
    pub established: Vec<RelationshipRequest>,
}

/// Splits the viewer's records by status, preserving store order.
pub fn partition_relationships(viewer: Viewer, records: Vec<RelationshipRequest>) -> Partition {
    let mut partition = Partition::default();
    for record in records {
        if !record.involves(viewer.user_id) {
            warn!(
                "relationships: ignoring request {} that does not involve user {}",
                record.id, viewer.user_id
            );
            continue;
        }
        match record.status {
            RequestStatus::Pending if record.initiator_role == viewer.role => {
                partition.pending_outgoing.push(record)
            }
            RequestStatus::Pending => partition.pending_incoming.push(record),
            RequestStatus::Accepted => partition.established.push(record),
            RequestStatus::Rejected => {}
        }
    }
    partition
}

#[derive(Default)]
struct ControllerState {
    pending_outgoing: Vec<RelationshipRequest>,
    pending_incoming: Vec<RelationshipRequest>,
    established: Vec<RelationshipRequest>,
    last_search_results: Vec<CandidateUser>,
    search_results_stale: bool,
    last_query: Option<String>,
    last_error: Option<ClientError>,
    last_error_operation: Option<&'static str>,
    loaded: bool,
    refreshes_in_flight: usize,
    search_in_flight: bool,
    sending: HashSet<UserId>,
    responding: HashSet<RequestId>,
    refresh_issued: u64,
    refresh_applied: u64,
    search_generation: u64,
}

impl ControllerState {
    fn clear_error(&mut self) {
        self.last_error = None;
        self.last_error_operation = None;
    }

    fn snapshot(&self, viewer: Viewer) -> RelationshipSnapshot {
        let mut sending: Vec<UserId> = self.sending.iter().copied().collect();
        sending.sort();
        let mut responding: Vec<RequestId> = self.responding.iter().copied().collect();
        responding.sort();

        RelationshipSnapshot {
            viewer,
            pending_outgoing: self.pending_outgoing.clone(),
            pending_incoming: self.pending_incoming.clone(),
            established: self.established.clone(),
            last_search_results: self.last_search_results.clone(),
            search_results_stale: self.search_results_stale,
            last_query: self.last_query.clone(),
            last_error: self.last_error.clone(),
            loaded: self.loaded,
            inflight: InflightSnapshot {
                refreshing: self.refreshes_in_flight > 0,
                searching: self.search_in_flight,
                sending,
                responding,
            },
        }
    }
}

pub struct RelationshipController {
    viewer: Viewer,
    store: Arc<dyn RelationshipStore>,
    directory: DirectorySearch,
    credentials: Arc<dyn CredentialSource>,
    config: ControllerConfig,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<RelationshipEvent>,
}

impl RelationshipController {
    pub fn new(
        viewer: Viewer,
        store: Arc<dyn RelationshipStore>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Arc<Self> {
        Self::with_config(viewer, store, credentials, ControllerConfig::default())
    }

    pub fn with_config(
        viewer: Viewer,
        store: Arc<dyn RelationshipStore>,
        credentials: Arc<dyn CredentialSource>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            viewer,
            directory: DirectorySearch::new(Arc::clone(&store)),
            store,
            credentials,
            config,
            inner: Mutex::new(ControllerState::default()),
            events,
        })
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RelationshipEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> RelationshipSnapshot {
        self.inner.lock().await.snapshot(self.viewer)
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.clear_error();
        self.publish().await;
    }

    /// Re-fetches every relationship of the viewer and replaces the cache.
    pub async fn refresh(&self) -> Result<()> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.refresh_issued += 1;
            guard.refreshes_in_flight += 1;
            guard.refresh_issued
        };
        self.publish().await;

        let result = match self.credential() {
            Ok(credential) => {
                self.bounded(REFRESH, self.store.list_relationships(&credential))
                    .await
            }
            Err(err) => Err(err),
        };

        let (outcome, superseded) = {
            let mut guard = self.inner.lock().await;
            guard.refreshes_in_flight = guard.refreshes_in_flight.saturating_sub(1);
            let superseded = ticket < guard.refresh_applied;
            let outcome = match result {
                Ok(records) if ticket > guard.refresh_applied => {
                    let partition = partition_relationships(self.viewer, records);
                    debug!(
                        "relationships: refresh #{ticket} applied outgoing={} incoming={} established={}",
                        partition.pending_outgoing.len(),
                        partition.pending_incoming.len(),
                        partition.established.len()
                    );
                    guard.refresh_applied = ticket;
                    guard.pending_outgoing = partition.pending_outgoing;
                    guard.pending_incoming = partition.pending_incoming;
                    guard.established = partition.established;
                    guard.loaded = true;
                    if guard.last_error_operation == Some(REFRESH) {
                        guard.clear_error();
                    }
                    Ok(())
                }
                Ok(_) => {
                    debug!(
                        "relationships: discarding refresh #{ticket}; #{} already applied",
                        guard.refresh_applied
                    );
                    Ok(())
                }
                Err(err) => Err(err),
            };
            (outcome, superseded)
        };

        match outcome {
            Ok(()) => {
                self.publish().await;
                Ok(())
            }
            Err(err) if superseded => {
                debug!(
                    "relationships: refresh #{ticket} failed after a newer one was applied: {err}"
                );
                self.publish().await;
                Err(err)
            }
            Err(err) => {
                self.record_failure(REFRESH, &err).await;
                Err(err)
            }
        }
    }

    /// Looks up counterparts for the viewer. A blank query clears the
    /// results without contacting the store. A failed search keeps the
    /// previous results and flags them stale.
    pub async fn search(&self, query: &str) -> Result<Vec<CandidateUser>> {
        const OPERATION: &str = "search";
        self.require_role(Role::Mentor, OPERATION).await?;

        let Some(query) = DirectorySearch::normalize_query(query) else {
            {
                let mut guard = self.inner.lock().await;
                guard.search_generation += 1;
                guard.last_search_results.clear();
                guard.search_results_stale = false;
                guard.last_query = None;
            }
            self.publish().await;
            return Ok(Vec::new());
        };

        let generation = {
            let mut guard = self.inner.lock().await;
            if guard.search_in_flight {
                None
            } else {
                guard.search_in_flight = true;
                guard.search_generation += 1;
                guard.clear_error();
                Some(guard.search_generation)
            }
        };
        let Some(generation) = generation else {
            let err = ClientError::in_flight("a search is already in progress");
            self.record_failure(OPERATION, &err).await;
            return Err(err);
        };
        self.publish().await;

        let target_role = self.viewer.role.counterpart();
        let result = match self.credential() {
            Ok(credential) => {
                self.bounded(
                    OPERATION,
                    self.directory.search(&credential, query, target_role),
                )
                .await
            }
            Err(err) => Err(err),
        };

        let failure = {
            let mut guard = self.inner.lock().await;
            guard.search_in_flight = false;
            let current = guard.search_generation == generation;
            match &result {
                Ok(candidates) if current => {
                    guard.last_search_results = candidates.clone();
                    guard.search_results_stale = false;
                    guard.last_query = Some(query.to_string());
                    None
                }
                Ok(_) => {
                    debug!("relationships: discarding superseded search for '{query}'");
                    None
                }
                Err(err) if current => {
                    if !guard.last_search_results.is_empty() {
                        guard.search_results_stale = true;
                    }
                    Some(err.clone())
                }
                Err(err) => {
                    debug!(
                        "relationships: ignoring failure of superseded search for '{query}': {err}"
                    );
                    None
                }
            }
        };

        match failure {
            None => self.publish().await,
            Some(err) => self.record_failure(OPERATION, &err).await,
        }
        result
    }

    /// Asks the store to create a pending request from the viewer (a mentor)
    /// to `candidate_id`. Never retried.
    pub async fn send_request(&self, candidate_id: UserId) -> Result<RelationshipRequest> {
        const OPERATION: &str = "send_request";
        self.require_role(Role::Mentor, OPERATION).await?;

        let admitted = {
            let mut guard = self.inner.lock().await;
            let admitted = guard.sending.insert(candidate_id);
            if admitted {
                guard.clear_error();
            }
            admitted
        };
        if !admitted {
            let err = ClientError::in_flight(format!(
                "a request to user {candidate_id} is already being sent"
            ));
            self.record_failure(OPERATION, &err).await;
            return Err(err);
        }
        self.publish().await;

        let result = match self.credential() {
            Ok(credential) => {
                self.bounded(OPERATION, self.store.create_request(&credential, candidate_id))
                    .await
            }
            Err(err) => Err(err),
        };

        {
            let mut guard = self.inner.lock().await;
            guard.sending.remove(&candidate_id);
            if result.is_ok() {
                guard
                    .last_search_results
                    .retain(|candidate| candidate.user_id != candidate_id);
            }
        }

        match result {
            Ok(created) => {
                info!(
                    "relationships: request {} sent to user {candidate_id}",
                    created.id
                );
                self.publish().await;
                self.refresh_after(OPERATION).await;
                Ok(created)
            }
            Err(err) => {
                self.record_failure(OPERATION, &err).await;
                Err(err)
            }
        }
    }

    /// Records the viewer's (a learner's) decision on a pending request.
    pub async fn respond(
        &self,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<RelationshipRequest> {
        const OPERATION: &str = "respond";
        self.require_role(Role::Learner, OPERATION).await?;

        let admitted = {
            let mut guard = self.inner.lock().await;
            let admitted = guard.responding.insert(request_id);
            if admitted {
                guard.clear_error();
            }
            admitted
        };
        if !admitted {
            let err = ClientError::in_flight(format!(
                "a response to request {request_id} is already being sent"
            ));
            self.record_failure(OPERATION, &err).await;
            return Err(err);
        }
        self.publish().await;

        let result = match self.credential() {
            Ok(credential) => {
                self.bounded(
                    OPERATION,
                    self.store
                        .respond_to_request(&credential, request_id, decision),
                )
                .await
            }
            Err(err) => Err(err),
        };

        self.inner.lock().await.responding.remove(&request_id);

        match result {
            Ok(updated) => {
                info!("relationships: request {request_id} {decision}");
                self.refresh_after(OPERATION).await;
                Ok(updated)
            }
            Err(err) => {
                self.record_failure(OPERATION, &err).await;
                // Answered elsewhere: rebuild from the store so the row stops being actionable.
                if err.conflict_kind() == Some(ConflictKind::AlreadyTerminal) {
                    self.refresh_after(OPERATION).await;
                }
                Err(err)
            }
        }
    }

    fn credential(&self) -> Result<Credential> {
        self.credentials
            .current_credential()
            .ok_or(ClientError::MissingCredential)
    }

    async fn require_role(&self, role: Role, operation: &'static str) -> Result<()> {
        if self.viewer.role == role {
            return Ok(());
        }
        let err = ClientError::RoleMismatch {
            operation,
            role: self.viewer.role,
        };
        self.record_failure(operation, &err).await;
        Err(err)
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout {
                operation,
                after: self.config.request_timeout,
            }),
        }
    }

    async fn refresh_after(&self, operation: &'static str) {
        if let Err(err) = self.refresh().await {
            warn!("relationships: refresh after {operation} failed: {err}");
        }
    }

    async fn record_failure(&self, operation: &'static str, err: &ClientError) {
        warn!("relationships: {operation} failed: {err}");
        {
            let mut guard = self.inner.lock().await;
            guard.last_error = Some(err.clone());
            guard.last_error_operation = Some(operation);
        }
        self.publish().await;
        let _ = self.events.send(RelationshipEvent::OperationFailed {
            operation,
            error: err.clone(),
        });
    }

    async fn publish(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(RelationshipEvent::SnapshotUpdated(snapshot));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
