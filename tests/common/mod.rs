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

//! Mock Resource Manager shared by the integration tests

#![allow(dead_code)]

use std::time::Duration;

use url::Url;
use serde_json::json;
use terraform_provider_azurerm::client::{Client, ClientSecretCredential, SharedClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const TENANT: &str = "11111111-1111-1111-1111-111111111111";

/// Start a server answering the token requests of [`client`]
pub async fn server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "token",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    server
}

/// Client talking to `server` for both authentication and management, polling every millisecond
pub fn client(server: &MockServer) -> Client {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    let http = Client::http().unwrap();
    let credential =
        ClientSecretCredential::new(http.clone(), &base, TENANT, "client", "secret", &base)
            .unwrap();
    Client::new(http, base, SUBSCRIPTION, credential).with_poll_interval(Duration::from_millis(1))
}

pub fn shared_client(server: &MockServer) -> SharedClient {
    SharedClient::new(client(server))
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {"code": "NotFound", "message": "The resource was not found."}
    }))
}
