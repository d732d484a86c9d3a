// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource Manager REST client

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

mod auth;
mod error;
mod lro;
mod shared;

pub use auth::ClientSecretCredential;
pub use error::{error_code, is_not_found, is_precondition_failed, OperationError, ResponseError};
pub use shared::SharedClient;

const USER_AGENT: &str = concat!("terraform-provider-azurerm/", env!("CARGO_PKG_VERSION"));

/// Default delay between two polls of a long-running operation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Condition attached to a write request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    #[default]
    None,
    /// `If-None-Match: *`: the write fails with `412` if the object already exists
    IfNoneMatch,
}

/// Raw successful answer, before decoding
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub async_operation: Option<Url>,
    pub location: Option<Url>,
    pub retry_after: Option<Duration>,
}

impl RawResponse {
    fn is_long_running(&self) -> bool {
        self.async_operation.is_some()
            || (self.status == StatusCode::ACCEPTED && self.location.is_some())
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<Url>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisioningProperties {
    #[serde(rename = "provisioningState")]
    provisioning_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Provisioning {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

/// Client for one subscription of the Resource Manager API
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    subscription_id: String,
    credential: ClientSecretCredential,
    poll_interval: Duration,
}

impl Client {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        subscription_id: impl Into<String>,
        credential: ClientSecretCredential,
    ) -> Self {
        Self {
            http,
            endpoint,
            subscription_id: subscription_id.into(),
            credential,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build the HTTP client shared by the API calls and the authentication
    pub fn http() -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")
    }

    /// Override the delay between two polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(path)
            .with_context(|| format!("invalid resource path {path:?}"))?;
        url.query_pairs_mut()
            .append_pair("api-version", api_version);
        Ok(url)
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        precondition: Precondition,
    ) -> Result<RawResponse> {
        tracing::debug!(%method, %url, "sending request");

        let token = self.credential.token().await?;
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        if precondition == Precondition::IfNoneMatch {
            request = request.header(header::IF_NONE_MATCH, "*");
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("sending {method} {url}"))?;

        let status = response.status();
        let headers = response.headers();
        let header_url = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Url::parse(value).ok())
        };
        let async_operation = header_url("Azure-AsyncOperation");
        let location = header_url(header::LOCATION.as_str());
        let retry_after = headers
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response
            .text()
            .await
            .with_context(|| format!("reading the response of {method} {url}"))?;

        if !status.is_success() {
            tracing::debug!(%method, %url, %status, "request failed");
            return Err(ResponseError::from_body(status.as_u16(), &body).into());
        }

        Ok(RawResponse {
            status,
            body,
            async_operation,
            location,
            retry_after,
        })
    }

    /// Fetch and decode the object at `path`
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        let url = self.url(path, api_version)?;
        let response = self
            .send(Method::GET, url, None, Precondition::None)
            .await?;
        serde_json::from_str(&response.body)
            .with_context(|| format!("decoding the response of GET {path}"))
    }

    /// Fetch every element of a collection, following `nextLink`
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version)?);
        while let Some(url) = next.take() {
            let response = self
                .send(Method::GET, url, None, Precondition::None)
                .await?;
            let page: Page<T> = serde_json::from_str(&response.body)
                .with_context(|| format!("decoding a page of {path}"))?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// Create or replace the object at `path`, wait for it to be provisioned and return it
    pub async fn put<B, T>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
        precondition: Precondition,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, api_version)?;
        let body = serde_json::to_value(body).context("encoding the request body")?;
        let response = self
            .send(Method::PUT, url, Some(&body), precondition)
            .await?;

        let mut current = if response.is_long_running() {
            lro::wait(self, &response).await?;
            self.get::<serde_json::Value>(path, api_version).await?
        } else if response.body.trim().is_empty() {
            self.get::<serde_json::Value>(path, api_version).await?
        } else {
            serde_json::from_str(&response.body)
                .with_context(|| format!("decoding the response of PUT {path}"))?
        };

        loop {
            let provisioning_state = match Provisioning::deserialize(&current) {
                Ok(provisioning) => provisioning
                    .properties
                    .and_then(|properties| properties.provisioning_state),
                Err(err) => {
                    tracing::debug!(path, %err, "unreadable provisioning state, using the response as is");
                    None
                }
            };
            match provisioning_state.as_deref() {
                None | Some("Succeeded") => break,
                Some(state @ ("Failed" | "Canceled")) => {
                    return Err(OperationError {
                        status: state.to_owned(),
                        code: "ProvisioningFailed".to_owned(),
                        message: format!("provisioning of {path} ended in state {state}"),
                    }
                    .into());
                }
                Some(state) => {
                    tracing::debug!(path, state, "waiting for provisioning to finish");
                    tokio::time::sleep(self.poll_interval).await;
                    current = self.get(path, api_version).await?;
                }
            }
        }

        serde_json::from_value(current)
            .with_context(|| format!("decoding the provisioned object {path}"))
    }

    /// Delete the object at `path` and wait for the deletion to complete
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<()> {
        let url = self.url(path, api_version)?;
        let response = self
            .send(Method::DELETE, url, None, Precondition::None)
            .await?;
        if response.is_long_running() {
            lro::wait(self, &response).await?;
        }
        Ok(())
    }
}
