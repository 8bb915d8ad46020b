//! HTTP binding of the relationship store protocol.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Decision, RequestId, Role, UserId},
    error::ApiError,
    protocol::{
        CandidateSearchQuery, CandidateUser, CreateRelationshipRequest, RelationshipRequest,
        RespondRelationshipRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    credentials::Credential,
    error::{ClientError, Result, StoreCall},
    store::RelationshipStore,
};

pub struct HttpRelationshipStore {
    http: Client,
    base_url: Url,
}

impl HttpRelationshipStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Network(format!("invalid endpoint '{path}': {err}")))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        call: StoreCall,
        request: RequestBuilder,
        credential: &Credential,
    ) -> Result<T> {
        let response = request.bearer_auth(credential.token()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let raw_body = response.text().await.unwrap_or_default();
            let api_error = serde_json::from_str::<ApiError>(&raw_body).ok();
            return Err(ClientError::from_response(
                call,
                status.as_u16(),
                api_error,
                &raw_body,
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Server {
                status: status.as_u16(),
                message: format!("undecodable response body: {err}"),
            })
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::Network(format!(
            "server url must start with http:// or https://: '{trimmed}'"
        )));
    }

    let mut url = Url::parse(trimmed)
        .map_err(|err| ClientError::Network(format!("invalid server url '{trimmed}': {err}")))?;
    // Url::join drops the last path segment unless the base ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl RelationshipStore for HttpRelationshipStore {
    async fn list_relationships(
        &self,
        credential: &Credential,
    ) -> Result<Vec<RelationshipRequest>> {
        let url = self.endpoint("relationships")?;
        debug!("store: GET {url}");
        self.send_json(StoreCall::List, self.http.get(url), credential)
            .await
    }

    async fn search_candidates(
        &self,
        credential: &Credential,
        query: &str,
        role: Role,
    ) -> Result<Vec<CandidateUser>> {
        let url = self.endpoint("users/search")?;
        debug!("store: GET {url} role={role}");
        let params = CandidateSearchQuery {
            q: query.to_string(),
            role,
        };
        self.send_json(
            StoreCall::Search,
            self.http.get(url).query(&params),
            credential,
        )
        .await
    }

    async fn create_request(
        &self,
        credential: &Credential,
        target_user_id: UserId,
    ) -> Result<RelationshipRequest> {
        let url = self.endpoint("relationships")?;
        debug!("store: POST {url} target={target_user_id}");
        self.send_json(
            StoreCall::Create,
            self.http
                .post(url)
                .json(&CreateRelationshipRequest { target_user_id }),
            credential,
        )
        .await
    }

    async fn respond_to_request(
        &self,
        credential: &Credential,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<RelationshipRequest> {
        let url = self.endpoint(&format!("relationships/{}/respond", request_id.0))?;
        debug!("store: POST {url} decision={decision}");
        self.send_json(
            StoreCall::Respond,
            self.http
                .post(url)
                .json(&RespondRelationshipRequest { decision }),
            credential,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod tests;
