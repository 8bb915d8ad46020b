//! Client core for mentor/learner relationships: the store contract, its
//! HTTP binding, directory search, the relationship controller, and the
//! role-specific view adapters built on top of it.

pub mod controller;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod http_store;
pub mod store;
pub mod views;

pub use controller::{
    partition_relationships, ControllerConfig, InflightSnapshot, Partition,
    RelationshipController, RelationshipEvent, RelationshipSnapshot, DEFAULT_REQUEST_TIMEOUT,
};
pub use credentials::{Credential, CredentialSource, SessionCredentials};
pub use directory::DirectorySearch;
pub use error::{ClientError, ConflictKind, StoreCall};
pub use http_store::HttpRelationshipStore;
pub use store::RelationshipStore;
pub use views::{LearnerView, LearnerViewModel, MentorView, MentorViewModel};

#[cfg(test)]
#[path = "tests/fake_store.rs"]
mod fake_store;
