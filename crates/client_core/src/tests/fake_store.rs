//! In-memory relationship store shared by controller and view tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{Decision, RequestId, RequestStatus, Role, UserId},
    protocol::{CandidateUser, CounterpartProfile, RelationshipRequest},
};
use tokio::sync::Mutex;

use crate::{
    credentials::Credential,
    error::{ClientError, ConflictKind, Result},
    store::RelationshipStore,
};

pub const MENTOR_TOKEN: &str = "mentor-token";
pub const OTHER_MENTOR_TOKEN: &str = "other-mentor-token";
pub const ANNA_TOKEN: &str = "anna-token";
pub const ANNABEL_TOKEN: &str = "annabel-token";
pub const BOB_TOKEN: &str = "bob-token";

pub const MENTOR_ID: UserId = UserId(1);
pub const OTHER_MENTOR_ID: UserId = UserId(2);
pub const ANNA_ID: UserId = UserId(42);
pub const ANNABEL_ID: UserId = UserId(43);
pub const BOB_ID: UserId = UserId(44);

pub const LIST: &str = "list";
pub const SEARCH: &str = "search";
pub const CREATE: &str = "create";
pub const RESPOND: &str = "respond";

#[derive(Debug, Clone)]
struct FakeUser {
    id: UserId,
    name: &'static str,
    username: &'static str,
    role: Role,
}

impl FakeUser {
    fn profile(&self) -> CounterpartProfile {
        CounterpartProfile {
            user_id: self.id,
            name: self.name.to_string(),
            username: self.username.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredRequest {
    id: RequestId,
    mentor_id: UserId,
    learner_id: UserId,
    status: RequestStatus,
}

#[derive(Default)]
struct CallCounts {
    list: AtomicUsize,
    search: AtomicUsize,
    create: AtomicUsize,
    respond: AtomicUsize,
}

pub struct FakeStore {
    users: Vec<FakeUser>,
    tokens: HashMap<&'static str, UserId>,
    requests: Mutex<Vec<StoredRequest>>,
    failures: Mutex<HashMap<&'static str, ClientError>>,
    stalls: Mutex<HashMap<&'static str, Duration>>,
    extra_candidates: Mutex<Vec<CandidateUser>>,
    calls: CallCounts,
}

impl FakeStore {
    pub fn new() -> Self {
        let users = vec![
            FakeUser {
                id: MENTOR_ID,
                name: "Morgan Mentor",
                username: "morgan",
                role: Role::Mentor,
            },
            FakeUser {
                id: OTHER_MENTOR_ID,
                name: "Otto Coach",
                username: "otto",
                role: Role::Mentor,
            },
            FakeUser {
                id: ANNA_ID,
                name: "Anna Smith",
                username: "anna99",
                role: Role::Learner,
            },
            FakeUser {
                id: ANNABEL_ID,
                name: "Annabel Lee",
                username: "annabel",
                role: Role::Learner,
            },
            FakeUser {
                id: BOB_ID,
                name: "Bob Jones",
                username: "bobby",
                role: Role::Learner,
            },
        ];
        let tokens = HashMap::from([
            (MENTOR_TOKEN, MENTOR_ID),
            (OTHER_MENTOR_TOKEN, OTHER_MENTOR_ID),
            (ANNA_TOKEN, ANNA_ID),
            (ANNABEL_TOKEN, ANNABEL_ID),
            (BOB_TOKEN, BOB_ID),
        ]);

        Self {
            users,
            tokens,
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            stalls: Mutex::new(HashMap::new()),
            extra_candidates: Mutex::new(Vec::new()),
            calls: CallCounts::default(),
        }
    }

    /// Makes the next call of `operation` fail with `err`.
    pub async fn fail_next(&self, operation: &'static str, err: ClientError) {
        self.failures.lock().await.insert(operation, err);
    }

    /// Delays every call of `operation` by `delay`.
    pub async fn stall(&self, operation: &'static str, delay: Duration) {
        self.stalls.lock().await.insert(operation, delay);
    }

    pub async fn clear_stall(&self, operation: &'static str) {
        self.stalls.lock().await.remove(operation);
    }

    /// Appends a search hit regardless of the query, e.g. a wrong-role record.
    pub async fn push_search_hit(&self, candidate: CandidateUser) {
        self.extra_candidates.lock().await.push(candidate);
    }

    pub fn calls(&self, operation: &str) -> usize {
        let counter = match operation {
            LIST => &self.calls.list,
            SEARCH => &self.calls.search,
            CREATE => &self.calls.create,
            RESPOND => &self.calls.respond,
            _ => return 0,
        };
        counter.load(Ordering::SeqCst)
    }

    pub async fn seed_request(
        &self,
        mentor_id: UserId,
        learner_id: UserId,
        status: RequestStatus,
    ) -> RequestId {
        let mut requests = self.requests.lock().await;
        let id = RequestId(requests.len() as i64 + 100);
        requests.push(StoredRequest {
            id,
            mentor_id,
            learner_id,
            status,
        });
        id
    }

    pub async fn status_of(&self, request_id: RequestId) -> Option<RequestStatus> {
        self.requests
            .lock()
            .await
            .iter()
            .find(|request| request.id == request_id)
            .map(|request| request.status)
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        let counter = match operation {
            LIST => &self.calls.list,
            SEARCH => &self.calls.search,
            CREATE => &self.calls.create,
            _ => &self.calls.respond,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let stall = self.stalls.lock().await.get(operation).copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        // Let concurrent callers interleave even without a stall.
        tokio::task::yield_now().await;

        match self.failures.lock().await.remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn user(&self, id: UserId) -> Option<&FakeUser> {
        self.users.iter().find(|user| user.id == id)
    }

    fn authenticate(&self, credential: &Credential) -> Result<&FakeUser> {
        self.tokens
            .get(credential.token())
            .and_then(|id| self.user(*id))
            .ok_or(ClientError::AuthExpired)
    }

    fn to_wire(&self, viewer: &FakeUser, stored: &StoredRequest) -> Option<RelationshipRequest> {
        let counterpart_id = if viewer.id == stored.mentor_id {
            stored.learner_id
        } else {
            stored.mentor_id
        };
        let counterpart = self.user(counterpart_id)?.profile();
        Some(RelationshipRequest {
            id: stored.id,
            mentor_id: stored.mentor_id,
            learner_id: stored.learner_id,
            initiator_role: Role::Mentor,
            target_role: Role::Learner,
            counterpart,
            status: stored.status,
            created_at: None,
            responded_at: None,
        })
    }
}

#[async_trait]
impl RelationshipStore for FakeStore {
    async fn list_relationships(
        &self,
        credential: &Credential,
    ) -> Result<Vec<RelationshipRequest>> {
        self.enter(LIST).await?;
        let viewer = self.authenticate(credential)?;
        let requests = self.requests.lock().await;
        Ok(requests
            .iter()
            .filter(|request| request.mentor_id == viewer.id || request.learner_id == viewer.id)
            .filter_map(|request| self.to_wire(viewer, request))
            .collect())
    }

    async fn search_candidates(
        &self,
        credential: &Credential,
        query: &str,
        role: Role,
    ) -> Result<Vec<CandidateUser>> {
        self.enter(SEARCH).await?;
        self.authenticate(credential)?;
        let needle = query.to_ascii_lowercase();
        let mut hits: Vec<CandidateUser> = self
            .users
            .iter()
            .filter(|user| user.role == role)
            .filter(|user| {
                user.name.to_ascii_lowercase().contains(&needle)
                    || user.username.to_ascii_lowercase().contains(&needle)
            })
            .map(|user| CandidateUser {
                user_id: user.id,
                name: user.name.to_string(),
                username: user.username.to_string(),
                role: user.role,
            })
            .collect();
        hits.extend(self.extra_candidates.lock().await.iter().cloned());
        Ok(hits)
    }

    async fn create_request(
        &self,
        credential: &Credential,
        target_user_id: UserId,
    ) -> Result<RelationshipRequest> {
        self.enter(CREATE).await?;
        let viewer = self.authenticate(credential)?;
        if viewer.role != Role::Mentor {
            return Err(ClientError::Server {
                status: 403,
                message: "only mentors can create requests".to_string(),
            });
        }
        let target = self
            .user(target_user_id)
            .filter(|user| user.role == Role::Learner)
            .ok_or_else(|| ClientError::Server {
                status: 404,
                message: format!("learner {target_user_id} not found"),
            })?;

        let mut requests = self.requests.lock().await;
        for existing in requests
            .iter()
            .filter(|r| r.mentor_id == viewer.id && r.learner_id == target.id)
        {
            match existing.status {
                RequestStatus::Pending => {
                    return Err(ClientError::Conflict {
                        kind: ConflictKind::DuplicatePending,
                        message: "a pending request already exists".to_string(),
                    })
                }
                RequestStatus::Accepted => {
                    return Err(ClientError::Conflict {
                        kind: ConflictKind::AlreadyEstablished,
                        message: "relationship already established".to_string(),
                    })
                }
                RequestStatus::Rejected => {}
            }
        }

        let stored = StoredRequest {
            id: RequestId(requests.len() as i64 + 100),
            mentor_id: viewer.id,
            learner_id: target.id,
            status: RequestStatus::Pending,
        };
        requests.push(stored.clone());
        self.to_wire(viewer, &stored).ok_or_else(|| ClientError::Server {
            status: 500,
            message: "dangling user".to_string(),
        })
    }

    async fn respond_to_request(
        &self,
        credential: &Credential,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<RelationshipRequest> {
        self.enter(RESPOND).await?;
        let viewer = self.authenticate(credential)?;
        let mut requests = self.requests.lock().await;
        let stored = requests
            .iter_mut()
            .find(|request| request.id == request_id && request.learner_id == viewer.id)
            .ok_or_else(|| ClientError::Server {
                status: 404,
                message: format!("request {request_id} not found"),
            })?;
        if stored.status.is_terminal() {
            return Err(ClientError::Conflict {
                kind: ConflictKind::AlreadyTerminal,
                message: "request is not pending".to_string(),
            });
        }
        stored.status = decision.resulting_status();
        let stored = stored.clone();
        self.to_wire(viewer, &stored).ok_or_else(|| ClientError::Server {
            status: 500,
            message: "dangling user".to_string(),
        })
    }
}
