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

//! Long-running operations
//!
//! Write requests either complete synchronously or hand back a handle to poll:
//! an `Azure-AsyncOperation` status URL, or a `Location` URL answering `202`
//! until the operation is over.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

use super::error::{ErrorDetail, OperationError};
use super::{Client, Precondition, RawResponse};

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    error: Option<ErrorDetail>,
}

/// Wait for the operation started by `response`
pub(super) async fn wait(client: &Client, response: &RawResponse) -> Result<()> {
    if let Some(url) = &response.async_operation {
        poll_async_operation(client, url, response.retry_after).await
    } else if let (StatusCode::ACCEPTED, Some(url)) = (response.status, &response.location) {
        poll_location(client, url, response.retry_after).await
    } else {
        Ok(())
    }
}

async fn poll_async_operation(
    client: &Client,
    url: &Url,
    mut retry_after: Option<Duration>,
) -> Result<()> {
    loop {
        tokio::time::sleep(retry_after.unwrap_or(client.poll_interval())).await;

        let response = client
            .send(Method::GET, url.clone(), None, Precondition::None)
            .await?;
        let operation: OperationStatus = serde_json::from_str(&response.body)
            .context("decoding the status of the long-running operation")?;

        match operation.status.as_str() {
            "Succeeded" => return Ok(()),
            "Failed" | "Canceled" => {
                let detail = operation.error.unwrap_or_default();
                return Err(OperationError {
                    status: operation.status,
                    code: detail.code,
                    message: detail.message,
                }
                .into());
            }
            status => tracing::debug!(%url, status, "operation still running"),
        }
        retry_after = response.retry_after;
    }
}

async fn poll_location(
    client: &Client,
    url: &Url,
    mut retry_after: Option<Duration>,
) -> Result<()> {
    loop {
        tokio::time::sleep(retry_after.unwrap_or(client.poll_interval())).await;

        let response = client
            .send(Method::GET, url.clone(), None, Precondition::None)
            .await?;
        if response.status != StatusCode::ACCEPTED {
            return Ok(());
        }
        tracing::debug!(%url, "operation still running");
        retry_after = response.retry_after;
    }
}
