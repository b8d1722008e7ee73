//! HTTP client for the batch API and the basic transfer adapter.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use tracing::debug;

use crate::batch::{Action, BatchRequest, BatchResponse, ErrorBody, MEDIA_TYPE, ObjectSpec, Operation};
use crate::endpoint::Endpoint;
use crate::error::ApiError;

/// Default timeout for a single HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP basic auth credentials for the batch API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

/// Client bound to one API endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Endpoint,
    credentials: Option<Credentials>,
}

impl Client {
    pub fn new(endpoint: Endpoint) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("lfs-conformance/", env!("CARGO_PKG_VERSION")))
            // The upload queue and the test suite drive this client from
            // different runtimes; pooled connections must not outlive theirs.
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            credentials: None,
        })
    }

    /// Authenticate batch requests with HTTP basic auth.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Issue a batch request for `objects`.
    pub async fn batch(
        &self,
        operation: Operation,
        objects: &[ObjectSpec],
    ) -> Result<BatchResponse, ApiError> {
        let request = BatchRequest::new(operation, objects.to_vec());
        debug!(
            operation = operation.as_str(),
            count = objects.len(),
            "batch request"
        );
        let response = self.batch_request().json(&request).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// POST an arbitrary JSON body to the batch endpoint.
    ///
    /// Returns the status code and the parsed body (`Null` when the body is
    /// not JSON) without treating error statuses as failures.
    pub async fn batch_raw(
        &self,
        body: &serde_json::Value,
    ) -> Result<(u16, serde_json::Value), ApiError> {
        let response = self.batch_request().json(body).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        Ok((status, value))
    }

    /// Send object content to an upload action.
    pub async fn upload(&self, action: &Action, content: Vec<u8>) -> Result<(), ApiError> {
        let request = with_action_headers(self.http.put(&action.href), action)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content);
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Confirm a finished upload with the server.
    pub async fn verify(&self, action: &Action, object: &ObjectSpec) -> Result<(), ApiError> {
        let request = with_action_headers(self.http.post(&action.href), action)
            .header(ACCEPT, MEDIA_TYPE)
            .json(object);
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Fetch object content from a download action.
    pub async fn download(&self, action: &Action) -> Result<Vec<u8>, ApiError> {
        let request = with_action_headers(self.http.get(&action.href), action);
        let response = check_status(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn batch_request(&self) -> RequestBuilder {
        let request = self
            .http
            .post(self.endpoint.batch_url())
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, MEDIA_TYPE);
        match &self.credentials {
            Some(c) => request.basic_auth(&c.user, c.password.as_ref()),
            None => request,
        }
    }
}

fn with_action_headers(mut request: RequestBuilder, action: &Action) -> RequestBuilder {
    for (name, value) in &action.header {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

/// Turn a non-success response into [`ApiError::Status`], preferring the
/// server's own error message.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string(),
    };

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
