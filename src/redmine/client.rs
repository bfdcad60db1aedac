use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use crate::auth::ApiKey;
use crate::error::{NotifyError, Result};

use super::types::{IssueEnvelope, IssuePatch, IssueStateResponse};

const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const API_KEY_HEADER: &str = "X-Redmine-API-Key";

/// Minimal Redmine REST client: one issue read, one issue update.
///
/// Requests are made once; there is no retry.
pub struct RedmineClient {
    client: Client,
    server: Url,
    api_key: ApiKey,
}

impl RedmineClient {
    /// `server` must already be validated and free of trailing slashes.
    pub fn new(server: &str, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("redmine-notify/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to create HTTP client: {e}")))?;

        let server = Url::parse(server)
            .map_err(|e| NotifyError::Config(format!("Invalid Redmine URL: {e}")))?;
        if server.cannot_be_a_base() {
            return Err(NotifyError::Config(format!(
                "Invalid Redmine URL: {server} cannot have issue paths"
            )));
        }

        Ok(Self {
            client,
            server,
            api_key,
        })
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.api_key.as_str())
    }

    /// `{server}/issues/{id}.json`, with the id encoded as a single path
    /// segment so a capture like `1/../2?x` cannot change the target.
    pub fn issue_url(&self, issue_id: &str) -> Result<Url> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|()| NotifyError::Config(format!("Invalid Redmine URL: {}", self.server)))?
            .pop_if_empty()
            .push("issues")
            .push(&format!("{issue_id}.json"));
        Ok(url)
    }

    /// Reads the current status id of an issue.
    ///
    /// Returns `Ok(None)` when the reply is JSON but carries no
    /// `issue.status.id`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or when the body is not JSON.
    pub async fn fetch_issue_status(&self, issue_id: &str) -> Result<Option<u32>> {
        let url = self.issue_url(issue_id)?;
        debug!("GET {url}");

        let response = self.auth_request(self.client.get(url.clone())).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("GET {url} -> {status}");

        let parsed: IssueStateResponse = serde_json::from_str(&body)?;
        Ok(parsed.status_id())
    }

    /// Sends `{"issue": patch}` as a PUT.
    ///
    /// Only HTTP 200 counts as success; the status is checked explicitly
    /// instead of letting the transport treat 4xx/5xx as errors.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::UpdateRejected`] with the status code (0 when no
    /// response arrived), the response body and the transport error, if any.
    pub async fn update_issue(&self, issue_id: &str, patch: &IssuePatch) -> Result<()> {
        let url = self.issue_url(issue_id)?;
        debug!("PUT {url}");

        let request = self
            .client
            .put(url.clone())
            .json(&IssueEnvelope { issue: patch });

        let response = match self.auth_request(request).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(NotifyError::UpdateRejected {
                    status: e.status().map_or(0, |status| status.as_u16()),
                    response: String::new(),
                    errno: transport_error_kind(&e),
                    error: e.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|e| {
            warn!("Failed to read Redmine response body: {e}");
            String::new()
        });
        debug!("PUT {url} -> {status}");

        if status != StatusCode::OK {
            return Err(NotifyError::UpdateRejected {
                status: status.as_u16(),
                response: body,
                errno: "none",
                error: String::new(),
            });
        }

        Ok(())
    }
}

fn transport_error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else if error.is_builder() {
        "builder"
    } else if error.is_request() {
        "request"
    } else if error.is_body() {
        "body"
    } else if error.is_decode() {
        "decode"
    } else {
        "other"
    }
}
