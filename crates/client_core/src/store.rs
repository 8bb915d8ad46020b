//! The relationship store contract consumed by the controller.

use async_trait::async_trait;
use shared::{
    domain::{Decision, RequestId, Role, UserId},
    protocol::{CandidateUser, RelationshipRequest},
};

use crate::{credentials::Credential, error::Result};

/// Authoritative holder of relationship state. Every call receives the
/// credential of the session it acts for.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// All relationship records of the credential's owner, in store order.
    async fn list_relationships(&self, credential: &Credential)
        -> Result<Vec<RelationshipRequest>>;

    async fn search_candidates(
        &self,
        credential: &Credential,
        query: &str,
        role: Role,
    ) -> Result<Vec<CandidateUser>>;

    async fn create_request(
        &self,
        credential: &Credential,
        target_user_id: UserId,
    ) -> Result<RelationshipRequest>;

    async fn respond_to_request(
        &self,
        credential: &Credential,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<RelationshipRequest>;
}
