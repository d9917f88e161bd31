//! Azure Resource Manager REST client
//!
//! Direct ARM API implementation using a caller-supplied bearer token.

use crate::models::ArmModel;
use armature_cloud::{
    CloudError, Operation, PollOperation, PollStatus, ProviderRegistrar, ProviderRegistration,
    ResourceClient, ResourceId, Result,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";
const PROVIDERS_API_VERSION: &str = "2021-04-01";

/// ARM API client
#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Use another ARM endpoint (sovereign clouds, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, path, api_version)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(http_error)
    }

    async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response.bytes().await.map_err(http_error)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_model<M: ArmModel>(&self, id: &ResourceId) -> Result<M> {
        let url = self.url(&id.to_string(), M::API_VERSION);
        tracing::debug!("GET {}", url);

        let response = self.send(self.client.get(&url)).await?;
        if !response.status().is_success() {
            return Err(api_error(id, response).await);
        }
        Self::json(response).await
    }

    /// Poll an `Azure-AsyncOperation` status URL once
    async fn poll_async_operation(&self, url: &str) -> Result<PollStatus<()>> {
        let response = self.send(self.client.get(url)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = error_message(response).await;
            return Err(CloudError::ApiError { status, message });
        }
        let retry_after = retry_after(response.headers());
        let body: AsyncOperationStatus = Self::json(response).await?;

        match body.status.as_str() {
            "Succeeded" => Ok(PollStatus::Done(())),
            "Failed" | "Canceled" => Err(CloudError::OperationFailed(format!(
                "{}: {}",
                body.status,
                body.error.map(|e| e.message).unwrap_or_default()
            ))),
            _ => Ok(PollStatus::InProgress { retry_after }),
        }
    }

    /// Poll a `Location` URL once; 202 means still running
    async fn poll_location(&self, url: &str) -> Result<PollStatus<()>> {
        let response = self.send(self.client.get(url)).await?;
        match response.status() {
            StatusCode::ACCEPTED => Ok(PollStatus::InProgress {
                retry_after: retry_after(response.headers()),
            }),
            status if status.is_success() => Ok(PollStatus::Done(())),
            status => Err(CloudError::ApiError {
                status: status.as_u16(),
                message: error_message(response).await,
            }),
        }
    }

    /// Provider registrations of one subscription
    pub fn providers(&self, subscription_id: impl Into<String>) -> SubscriptionProviders {
        SubscriptionProviders {
            client: self.clone(),
            subscription_id: subscription_id.into(),
        }
    }
}

#[async_trait]
impl<M: ArmModel> ResourceClient<M> for ArmClient {
    async fn get(&self, id: &ResourceId) -> Result<M> {
        self.get_model(id).await
    }

    async fn create_or_update(&self, id: &ResourceId, model: &M) -> Result<Operation<M>> {
        let url = self.url(&id.to_string(), M::API_VERSION);
        tracing::debug!("PUT {}", url);

        let response = self.send(self.client.put(&url).json(model)).await?;
        if !matches!(response.status(), StatusCode::OK | StatusCode::CREATED) {
            return Err(api_error(id, response).await);
        }

        match header(response.headers(), ASYNC_OPERATION_HEADER) {
            Some(status_url) => Ok(Operation::pending(
                format!("PUT {}", id),
                PutPoller::<M> {
                    client: self.clone(),
                    status_url,
                    id: id.clone(),
                    succeeded: false,
                    _model: PhantomData,
                },
            )),
            None => Ok(Operation::completed(Self::json(response).await?)),
        }
    }

    async fn delete(&self, id: &ResourceId) -> Result<Operation<()>> {
        let url = self.url(&id.to_string(), M::API_VERSION);
        tracing::debug!("DELETE {}", url);

        let response = self.send(self.client.delete(&url)).await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(Operation::completed(())),
            StatusCode::ACCEPTED => {
                let headers = response.headers();
                let target = if let Some(url) = header(headers, ASYNC_OPERATION_HEADER) {
                    PollTarget::AsyncOperation(url)
                } else if let Some(url) = header(headers, LOCATION.as_str()) {
                    PollTarget::Location(url)
                } else {
                    return Ok(Operation::completed(()));
                };
                Ok(Operation::pending(
                    format!("DELETE {}", id),
                    DeletePoller {
                        client: self.clone(),
                        target,
                    },
                ))
            }
            _ => Err(api_error(id, response).await),
        }
    }
}

/// Waits for a PUT to finish, then reads the resulting object
struct PutPoller<M> {
    client: ArmClient,
    status_url: String,
    id: ResourceId,
    succeeded: bool,
    _model: PhantomData<fn() -> M>,
}

#[async_trait]
impl<M: ArmModel> PollOperation<M> for PutPoller<M> {
    async fn poll(&mut self) -> Result<PollStatus<M>> {
        if !self.succeeded {
            match self.client.poll_async_operation(&self.status_url).await? {
                PollStatus::InProgress { retry_after } => {
                    return Ok(PollStatus::InProgress { retry_after });
                }
                PollStatus::Done(()) => self.succeeded = true,
            }
        }
        Ok(PollStatus::Done(self.client.get_model(&self.id).await?))
    }
}

enum PollTarget {
    AsyncOperation(String),
    Location(String),
}

struct DeletePoller {
    client: ArmClient,
    target: PollTarget,
}

#[async_trait]
impl PollOperation<()> for DeletePoller {
    async fn poll(&mut self) -> Result<PollStatus<()>> {
        match &self.target {
            PollTarget::AsyncOperation(url) => self.client.poll_async_operation(url).await,
            PollTarget::Location(url) => self.client.poll_location(url).await,
        }
    }
}

/// [`ProviderRegistrar`] backed by the ARM providers API
#[derive(Debug, Clone)]
pub struct SubscriptionProviders {
    client: ArmClient,
    subscription_id: String,
}

#[async_trait]
impl ProviderRegistrar for SubscriptionProviders {
    async fn list_states(&self) -> Result<Vec<ProviderRegistration>> {
        let path = format!("/subscriptions/{}/providers", self.subscription_id);
        let url = self.client.url(&path, PROVIDERS_API_VERSION);

        let response = self.client.send(self.client.client.get(&url)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = error_message(response).await;
            return Err(CloudError::ApiError { status, message });
        }

        let list: ProviderList = ArmClient::json(response).await?;
        Ok(list.value)
    }

    async fn register(&self, namespace: &str) -> Result<()> {
        let path = format!(
            "/subscriptions/{}/providers/{}/register",
            self.subscription_id, namespace
        );
        let url = self.client.url(&path, PROVIDERS_API_VERSION);

        let response = self.client.send(self.client.client.post(&url)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = error_message(response).await;
            return Err(CloudError::ApiError { status, message });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderList {
    #[serde(default)]
    value: Vec<ProviderRegistration>,
}

#[derive(Debug, Deserialize)]
struct AsyncOperationStatus {
    status: String,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn http_error(e: reqwest::Error) -> CloudError {
    CloudError::Http(e.to_string())
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn api_error(id: &ResourceId, response: reqwest::Response) -> CloudError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return CloudError::ResourceNotFound(id.to_string());
    }
    CloudError::ApiError {
        status: status.as_u16(),
        message: error_message(response).await,
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    parse_error_message(&body)
}

/// `code: message` from an ARM error body, or the raw body
fn parse_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) if error.code.is_empty() => error.message,
        Ok(ErrorResponse { error }) => format!("{}: {}", error.code, error.message),
        Err(_) if body.is_empty() => "Unknown error".to_string(),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = ArmClient::new("token").with_endpoint("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(
            client.url("/subscriptions/sub", "2021-04-01"),
            "http://localhost:8080/subscriptions/sub?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ArmClient::new("secret-token");
        assert!(!format!("{:?}", client).contains("secret-token"));
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error":{"code":"InUseSubnetCannotBeDeleted","message":"Subnet frontend is in use"}}"#;
        assert_eq!(
            parse_error_message(body),
            "InUseSubnetCannotBeDeleted: Subnet frontend is in use"
        );
        assert_eq!(parse_error_message("upstream timeout"), "upstream timeout");
        assert_eq!(parse_error_message(""), "Unknown error");
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "10".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(10)));

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_async_operation_status_parses() {
        let status: AsyncOperationStatus = serde_json::from_str(
            r#"{"status":"Failed","error":{"code":"Conflict","message":"address space overlaps"}}"#,
        )
        .unwrap();
        assert_eq!(status.status, "Failed");
        assert_eq!(status.error.unwrap().message, "address space overlaps");
    }
}
