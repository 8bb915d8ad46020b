//! Candidate lookup against the user directory.

use std::sync::Arc;

use shared::{domain::Role, protocol::CandidateUser};
use tracing::debug;

use crate::{credentials::Credential, error::Result, store::RelationshipStore};

pub struct DirectorySearch {
    store: Arc<dyn RelationshipStore>,
}

impl DirectorySearch {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    /// Trimmed query text, or `None` when there is nothing worth sending.
    pub fn normalize_query(query: &str) -> Option<&str> {
        let trimmed = query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Candidates of `role` matching `query`. Blank queries never reach the store.
    pub async fn search(
        &self,
        credential: &Credential,
        query: &str,
        role: Role,
    ) -> Result<Vec<CandidateUser>> {
        let Some(query) = Self::normalize_query(query) else {
            return Ok(Vec::new());
        };

        let candidates = self.store.search_candidates(credential, query, role).await?;
        let returned = candidates.len();
        let candidates: Vec<CandidateUser> = candidates
            .into_iter()
            .filter(|candidate| candidate.role == role)
            .collect();
        if candidates.len() != returned {
            debug!(
                "directory: dropped {} candidates not in role {role}",
                returned - candidates.len()
            );
        }
        Ok(candidates)
    }
}
