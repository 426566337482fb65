//! Request plumbing shared by every adapter

use crate::{Error, Result};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use sweep_core::ApiConfig;
use sweep_runtime::CollaboratorError;

/// Basic-auth HTTP client bound to one API
#[derive(Clone)]
pub(crate) struct ApiClient {
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl ApiClient {
    pub(crate) fn new(api: &ApiConfig, timeout: Duration) -> Result<Self> {
        if api.url.is_empty() {
            return Err(Error::Config("API url must not be empty".to_string()));
        }

        // Redirects carry task IDs in their Location header, so they are
        // returned to the caller rather than followed.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url: api.url.trim_end_matches('/').to_string(),
            username: api.username().to_string(),
            password: api.password().to_string(),
            timeout,
            http,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.authed(self.http.get(url))
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.authed(self.http.post(url))
    }

    pub(crate) fn put(&self, url: &str) -> RequestBuilder {
        self.authed(self.http.put(url))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    /// Send a request, turning transport failures and non-2xx/3xx answers
    /// into [`CollaboratorError`]s
    pub(crate) async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, CollaboratorError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let description = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, description = %description, "Unexpected response");
        Err(CollaboratorError::UnexpectedStatus {
            status: status.as_u16(),
            description,
        })
    }

    pub(crate) fn transport_error(&self, e: reqwest::Error) -> CollaboratorError {
        if e.is_timeout() {
            CollaboratorError::Timeout(self.timeout)
        } else if e.is_decode() {
            CollaboratorError::Decode(e.to_string())
        } else {
            CollaboratorError::Request(e.to_string())
        }
    }
}
