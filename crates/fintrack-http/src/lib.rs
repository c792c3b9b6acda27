//! REST backend for fintrack entity stores.
//!
//! Each entity type maps onto one resource collection:
//!
//! - `GET {base}/api/<resource>` lists every record
//! - `POST {base}/api/<resource>` creates a record from a draft
//! - `GET`, `PUT` and `DELETE {base}/api/<resource>/{id}` address a single record
//!
//! Requests carry `Authorization: Bearer <token>` and JSON bodies. Error bodies may
//! contain a `message` field, which is surfaced to the user for client errors.

use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use fintrack_core::{ApiError, ApiResult, Backend};
use fintrack_domain::Entity;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, instrument};

pub use reqwest::Client as HttpClient;

const API_PREFIX: &str = "api";

/// Builds a client whose requests give up after `timeout`. Clones share one connection pool.
pub fn build_client(timeout: Duration) -> ApiResult<HttpClient> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ApiError::Unknown(format!("failed to build HTTP client: {err}")))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for one resource collection.
pub struct HttpBackend<T: Entity> {
    client: reqwest::Client,
    collection_url: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for HttpBackend<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collection_url: self.collection_url.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for HttpBackend<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("url", &self.collection_url)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> HttpBackend<T> {
    /// Backend with its own client; see [`build_client`].
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        Ok(Self::with_client(build_client(timeout)?, base_url))
    }

    /// Shares an existing client, e.g. one connection pool across all resources.
    pub fn with_client(client: HttpClient, base_url: &str) -> Self {
        let collection_url = format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            API_PREFIX,
            T::RESOURCE
        );
        Self {
            client,
            collection_url,
            _entity: PhantomData,
        }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url, id)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
    ) -> ApiResult<Response> {
        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if status.is_success() {
            Ok(response)
        } else {
            Err(status_error(status, response).await)
        }
    }

    async fn send_for_record(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
        id: &str,
    ) -> ApiResult<Response> {
        match self.send(request, token).await {
            Err(ApiError::NotFound { message, .. }) => Err(ApiError::NotFound {
                id: id.to_string(),
                message,
            }),
            other => other,
        }
    }
}

#[async_trait]
impl<T: Entity> Backend<T> for HttpBackend<T> {
    #[instrument(skip_all, fields(resource = T::RESOURCE))]
    async fn list_all(&self, token: &SecretString) -> ApiResult<Vec<T>> {
        let response = self
            .send(self.client.get(&self.collection_url), token)
            .await?;
        decode(response).await
    }

    #[instrument(skip(self, token), fields(resource = T::RESOURCE))]
    async fn get(&self, token: &SecretString, id: &str) -> ApiResult<T> {
        let response = self
            .send_for_record(self.client.get(self.record_url(id)), token, id)
            .await?;
        decode(response).await
    }

    #[instrument(skip_all, fields(resource = T::RESOURCE))]
    async fn create(&self, token: &SecretString, draft: &T::Draft) -> ApiResult<T> {
        let response = self
            .send(self.client.post(&self.collection_url).json(draft), token)
            .await?;
        decode(response).await
    }

    #[instrument(skip(self, token, patch), fields(resource = T::RESOURCE))]
    async fn update(&self, token: &SecretString, id: &str, patch: &T::Patch) -> ApiResult<T> {
        let response = self
            .send_for_record(self.client.put(self.record_url(id)).json(patch), token, id)
            .await?;
        decode(response).await
    }

    #[instrument(skip(self, token), fields(resource = T::RESOURCE))]
    async fn delete(&self, token: &SecretString, id: &str) -> ApiResult<()> {
        self.send_for_record(self.client.delete(self.record_url(id)), token, id)
            .await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::NetworkUnreachable(err.to_string())
}

async fn decode<R: DeserializeOwned>(response: Response) -> ApiResult<R> {
    response
        .json()
        .await
        .map_err(|err| ApiError::Unknown(format!("failed to parse response: {err}")))
}

/// The `NotFound` id is filled in by callers that address a single record.
async fn status_error(status: StatusCode, response: Response) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        status if status.is_server_error() => ApiError::ServerError {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => ApiError::NotFound {
            id: String::new(),
            message: error_message(response).await,
        },
        status => ApiError::ValidationFailed {
            status: Some(status.as_u16()),
            message: error_message(response).await,
        },
    }
}

// Bodies that are not JSON or lack `message` yield no backend text.
async fn error_message(response: Response) -> Option<String> {
    let body: ErrorBody = response.json().await.ok()?;
    body.message.filter(|message| !message.trim().is_empty())
}
