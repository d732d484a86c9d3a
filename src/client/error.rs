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

use serde::Deserialize;
use thiserror::Error;

/// Non-successful answer of the Resource Manager API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected status {status} with error: {code}: {message}")]
pub struct ResponseError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

/// Long-running operation that ended in a failed or canceled state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the operation finished with status {status:?}: {code}: {message}")]
pub struct OperationError {
    pub status: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
    code: Option<String>,
    message: Option<String>,
}

impl ResponseError {
    /// Build the error from the raw body of an error response
    ///
    /// Both `{"error": {"code", "message"}}` and a bare `{"code", "message"}` are accepted.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                error: Some(detail),
                ..
            }) => (detail.code, detail.message),
            Ok(ErrorBody { code, message, .. }) => {
                (code.unwrap_or_default(), message.unwrap_or_default())
            }
            Err(_) => (String::new(), body.trim().to_owned()),
        };
        Self {
            status,
            code: if code.is_empty() {
                "Unknown".to_owned()
            } else {
                code
            },
            message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.status == 412
    }
}

/// Check if any error in the chain is a `404 Not Found` answer
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ResponseError>()
            .is_some_and(ResponseError::is_not_found)
    })
}

/// Check if any error in the chain is a `412 Precondition Failed` answer
pub fn is_precondition_failed(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ResponseError>()
            .is_some_and(ResponseError::is_precondition_failed)
    })
}

/// ARM error code carried by the first API or operation error of the chain
pub fn error_code(err: &anyhow::Error) -> Option<&str> {
    err.chain().find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<ResponseError>() {
            Some(err.code.as_str())
        } else {
            cause
                .downcast_ref::<OperationError>()
                .map(|err| err.code.as_str())
        }
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn nested_error_body() {
        let err = ResponseError::from_body(
            404,
            r#"{"error":{"code":"ResourceNotFound","message":"The zone was not found"}}"#,
        );
        assert_eq!(err.code, "ResourceNotFound");
        assert_eq!(err.message, "The zone was not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn flat_and_unparsable_bodies() {
        let err = ResponseError::from_body(409, r#"{"code":"Conflict","message":"busy"}"#);
        assert_eq!(err.code, "Conflict");

        let err = ResponseError::from_body(502, "Bad Gateway\n");
        assert_eq!(err.code, "Unknown");
        assert_eq!(err.message, "Bad Gateway");
    }

    #[test]
    fn classification_survives_context() {
        let err = Err::<(), _>(ResponseError::from_body(404, ""))
            .context("retrieving the zone")
            .unwrap_err();
        assert!(is_not_found(&err));
        assert!(!is_precondition_failed(&err));

        let err = anyhow::Error::new(OperationError {
            status: "Failed".to_owned(),
            code: "ServerNameAlreadyExists".to_owned(),
            message: "taken".to_owned(),
        })
        .context("creating the server");
        assert_eq!(error_code(&err), Some("ServerNameAlreadyExists"));
    }
}
