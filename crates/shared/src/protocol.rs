use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Decision, RequestId, RequestStatus, Role, UserId};

/// Public profile of the other party, embedded by the store at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartProfile {
    pub user_id: UserId,
    pub name: String,
    pub username: String,
}

impl CounterpartProfile {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRequest {
    pub id: RequestId,
    pub mentor_id: UserId,
    pub learner_id: UserId,
    pub initiator_role: Role,
    pub target_role: Role,
    pub counterpart: CounterpartProfile,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl RelationshipRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn is_established(&self) -> bool {
        self.status == RequestStatus::Accepted
    }

    /// Whether `user_id` is one of the two parties of this request.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.mentor_id == user_id || self.learner_id == user_id
    }
}

/// A user returned by directory search. Only lives as long as one result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUser {
    pub user_id: UserId,
    pub name: String,
    pub username: String,
    pub role: Role,
}

impl CandidateUser {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSearchQuery {
    pub q: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRelationshipRequest {
    pub target_user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRelationshipRequest {
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_request_decodes_store_payload_without_timestamps() {
        let raw = r#"{
            "id": 9,
            "mentor_id": 1,
            "learner_id": 42,
            "initiator_role": "mentor",
            "target_role": "learner",
            "counterpart": {"user_id": 42, "name": "Anna", "username": "anna99"},
            "status": "pending"
        }"#;

        let request: RelationshipRequest = serde_json::from_str(raw).expect("decode");
        assert_eq!(request.id, RequestId(9));
        assert_eq!(request.counterpart.username, "anna99");
        assert!(request.is_pending());
        assert!(request.involves(UserId(42)));
        assert!(request.created_at.is_none());
    }

    #[test]
    fn respond_body_uses_snake_case_decision() {
        let body = RespondRelationshipRequest {
            decision: Decision::Rejected,
        };
        assert_eq!(
            serde_json::to_string(&body).expect("encode"),
            r#"{"decision":"rejected"}"#
        );
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let candidate = CandidateUser {
            user_id: UserId(3),
            name: "  ".to_string(),
            username: "quiet".to_string(),
            role: Role::Learner,
        };
        assert_eq!(candidate.display_name(), "quiet");
    }
}
