//! Sending GraphQL documents.
//!
//! Requests are always a constant document plus a `variables` object, so
//! names and titles supplied by users never become part of the query text.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::{Credential, Envelope, GithubConfig, RemoteError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub variables: Value,
}

impl GraphqlRequest {
    pub fn new(query: &'static str, variables: Value) -> Self {
        Self { query, variables }
    }

    /// `ResolveUser` for `query ResolveUser($login: String!) { ... }`.
    pub fn operation_name(&self) -> &'static str {
        self.query
            .split_whitespace()
            .nth(1)
            .map(|word| word.split(['(', '{']).next().unwrap_or(word))
            .unwrap_or("anonymous")
    }
}

/// Executes one request, one attempt, no retries.
pub trait GraphqlTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError>;
}

impl<T: GraphqlTransport + ?Sized> GraphqlTransport for &T {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError> {
        (**self).execute(request)
    }
}

impl<T: GraphqlTransport + ?Sized> GraphqlTransport for Box<T> {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError> {
        (**self).execute(request)
    }
}

/// Blocking HTTPS transport with bearer authentication.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    credential: Credential,
}

impl HttpTransport {
    pub fn new(config: &GithubConfig) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RemoteError::Transport {
                message: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            credential: config.credential.clone(),
        })
    }
}

impl GraphqlTransport for HttpTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError> {
        let operation = request.operation_name();
        tracing::debug!(operation, endpoint = %self.endpoint, "sending graphql request");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.expose())
            .json(request)
            .send()
            .map_err(|e| RemoteError::Transport {
                message: format!("failed to reach {} ({e})", self.endpoint),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "graphql request rejected");
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Envelope>()
            .map_err(|e| RemoteError::Malformed(format!("response is not a GraphQL envelope: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_name() {
        let req = GraphqlRequest::new(
            "query ResolveUser($login: String!) { user(login: $login) { id } }",
            json!({"login": "x"}),
        );
        assert_eq!(req.operation_name(), "ResolveUser");
        assert_eq!(
            GraphqlRequest::new("query Viewer { viewer { login } }", json!({})).operation_name(),
            "Viewer"
        );
    }

    #[test]
    fn test_request_body_keeps_user_text_in_variables() {
        let hostile = "a\" } mutation { deleteEverything";
        let req = GraphqlRequest::new(
            "query ResolveUser($login: String!) { user(login: $login) { id } }",
            json!({"login": hostile}),
        );
        let body = serde_json::to_value(&req).unwrap();
        assert!(!body["query"].as_str().unwrap().contains("deleteEverything"));
        assert_eq!(body["variables"]["login"], hostile);
    }
}
