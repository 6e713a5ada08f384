//! Client for the Snowflake agents REST endpoint.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use snowflake_rest::{AgentTarget, AgentsConnector, AuthToken, serde_json::json};
//!
//! let connector = AgentsConnector::try_new(&AuthToken::Bearer("<token>".into()))?;
//! let target = AgentTarget::new("myorg-myaccount.snowflakecomputing.com", "DB", "PUBLIC");
//! let body = json!({ "name": "CLAIMS_AGENT" });
//! let response = connector.create_or_replace(&target, &body).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue,
    USER_AGENT,
};
use serde::Serialize;
pub use serde_json;

pub use jwt::{
    KeyFileReadError, KeyPairError, TokenFromFileError, create_token, create_token_from_file,
};

mod jwt;

/// Credential sent as `Authorization: Bearer ...`.
#[derive(Clone)]
pub enum AuthToken {
    /// Programmatic access token or OAuth token, passed through as-is.
    Bearer(String),
    /// Token signed locally from an RSA key pair, see [create_token].
    KeyPairJwt(String),
}

impl AuthToken {
    pub fn from_key_files<P: AsRef<Path>>(
        public_key_path: P,
        private_key_path: P,
        account_identifier: &str,
        user: &str,
    ) -> Result<Self, TokenFromFileError> {
        create_token_from_file(public_key_path, private_key_path, account_identifier, user)
            .map(AuthToken::KeyPairJwt)
    }
    pub fn secret(&self) -> &str {
        match self {
            AuthToken::Bearer(token) | AuthToken::KeyPairJwt(token) => token,
        }
    }
    fn token_type(&self) -> Option<&'static str> {
        match self {
            AuthToken::Bearer(_) => None,
            AuthToken::KeyPairJwt(_) => Some("KEYPAIR_JWT"),
        }
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthToken::Bearer(_) => f.write_str("Bearer(***)"),
            AuthToken::KeyPairJwt(_) => f.write_str("KeyPairJwt(***)"),
        }
    }
}

/// Where an agent lives: account host plus database and schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentTarget {
    pub base_url: String,
    pub database: String,
    pub schema: String,
}

impl AgentTarget {
    pub fn new(
        base_url: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        AgentTarget {
            base_url: base_url.into(),
            database: database.into(),
            schema: schema.into(),
        }
    }
    /// Account host with any `https://` or `http://` removed.
    pub fn host(&self) -> String {
        strip_scheme(&self.base_url)
    }
    pub fn path_and_query(&self) -> String {
        format!(
            "/api/v2/databases/{}/schemas/{}/agents?createMode=orReplace",
            self.database, self.schema
        )
    }
}

pub fn strip_scheme(base_url: &str) -> String {
    base_url.replace("https://", "").replace("http://", "")
}

/// `https://{host}/api/v2/databases/{database}/schemas/{schema}/agents?createMode=orReplace`
pub fn agents_url(target: &AgentTarget) -> String {
    format!("https://{}{}", target.host(), target.path_and_query())
}

#[derive(Debug)]
pub struct AgentsConnector {
    client: reqwest::Client,
    origin: Option<String>,
}

impl AgentsConnector {
    pub fn try_new(token: &AuthToken) -> Result<Self, NewAgentsConnectorError> {
        let headers = Self::get_headers(token)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(AgentsConnector {
            client,
            origin: None,
        })
    }
    /// Sends every request to `origin` (scheme and host) instead of
    /// `https://{base_url}`; path and query stay the same.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into().trim_end_matches('/').to_owned());
        self
    }
    pub fn url(&self, target: &AgentTarget) -> String {
        match &self.origin {
            Some(origin) => format!("{origin}{}", target.path_and_query()),
            None => agents_url(target),
        }
    }
    /// `POST`s `body` to the agents endpoint with `createMode=orReplace`.
    ///
    /// Any HTTP status is returned as an [AgentResponse]; only transport
    /// failures are errors.
    pub async fn create_or_replace<B: Serialize + ?Sized>(
        &self,
        target: &AgentTarget,
        body: &B,
    ) -> Result<AgentResponse, CreateOrReplaceError> {
        let url = self.url(target);
        tracing::debug!(%url, "creating agent");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(CreateOrReplaceError::Request)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(CreateOrReplaceError::ToText)?;
        tracing::debug!(%status, bytes = body.len(), "agent endpoint responded");
        Ok(AgentResponse {
            url,
            status,
            headers,
            body,
        })
    }
    fn get_headers(token: &AuthToken) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::with_capacity(5);
        headers.append(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(ACCEPT, HeaderValue::from_static("application/json"));
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.secret()))?;
        authorization.set_sensitive(true);
        headers.append(AUTHORIZATION, authorization);
        if let Some(token_type) = token.token_type() {
            headers.append(
                HeaderName::from_static("x-snowflake-authorization-token-type"),
                HeaderValue::from_static(token_type),
            );
        }
        headers.append(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                '/',
                env!("CARGO_PKG_VERSION")
            )),
        );
        Ok(headers)
    }
}

/// Snapshot of the endpoint's answer.
#[derive(Debug)]
pub struct AgentResponse {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl AgentResponse {
    /// Only `200 OK` and `201 Created` count as success.
    pub fn is_success(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::CREATED)
    }
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Error creating a new [AgentsConnector]
#[derive(thiserror::Error, Debug)]
pub enum NewAgentsConnectorError {
    #[error("token cannot be sent as a header value")]
    InvalidToken(#[from] InvalidHeaderValue),
    #[error(transparent)]
    ClientBuildError(#[from] reqwest::Error),
}

/// Error sending a create-or-replace request
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum CreateOrReplaceError {
    Request(reqwest::Error),
    ToText(reqwest::Error),
}
