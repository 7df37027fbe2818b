//! HTTP transport for typed operations and file uploads.

use async_trait::async_trait;
use bizdesk_shared::{ApiError, GraphqlRequest, GraphqlResponse, UploadResponse, HEADER_AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::auth_session::SessionToken;
use crate::config::ClientConfig;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// The call channel the protocol client talks through.
///
/// Futures are not `Send`: the client runs on a single-threaded event loop.
#[async_trait(?Send)]
pub trait Transport {
    /// POST one operation. The token, when present, travels as a bearer credential.
    async fn execute(
        &self,
        request: &GraphqlRequest,
        token: Option<&SessionToken>,
    ) -> Result<GraphqlResponse, ApiError>;

    /// Multipart POST of one file under the `files` field.
    async fn upload(
        &self,
        file: UploadFile,
        token: Option<&SessionToken>,
    ) -> Result<UploadResponse, ApiError>;
}

/// HTTP client for the GraphQL and upload endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    graphql_url: String,
    upload_url: String,
}

impl ApiClient {
    /// Create a new API client talking to root-relative endpoints
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::new("", ""))
    }

    /// Endpoints come from [`ClientConfig::graphql_url`] and [`ClientConfig::upload_url`].
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            graphql_url: config.graphql_url(),
            upload_url: config.upload_url(),
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let config = ClientConfig::new(base_url, "");
        self.graphql_url = config.graphql_url();
        self.upload_url = config.upload_url();
        self
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn authorize(rb: reqwest::RequestBuilder, token: Option<&SessionToken>) -> reqwest::RequestBuilder {
        match token {
            Some(token) => rb.header(HEADER_AUTHORIZATION, token.bearer()),
            None => rb,
        }
    }

    async fn read_json<TRes: DeserializeOwned>(resp: reqwest::Response) -> Result<TRes, ApiError> {
        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Transport for ApiClient {
    async fn execute(
        &self,
        request: &GraphqlRequest,
        token: Option<&SessionToken>,
    ) -> Result<GraphqlResponse, ApiError> {
        let body_bytes = serde_json::to_vec(request).map_err(|e| ApiError::Deserialize(e.to_string()))?;

        let rb = Self::authorize(self.client.post(&self.graphql_url), token);
        let resp = rb
            .body(body_bytes)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_json(resp).await
    }

    async fn upload(
        &self,
        file: UploadFile,
        token: Option<&SessionToken>,
    ) -> Result<UploadResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime)
            .map_err(|e| ApiError::Network(format!("invalid mime type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("files", part);

        let rb = Self::authorize(self.client.post(&self.upload_url), token);
        let resp = rb
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_json(resp).await
    }
}
