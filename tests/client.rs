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

mod common;

use serde_json::{json, Value};
use terraform_provider_azurerm::client::{
    error_code, is_not_found, OperationError, Precondition,
};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{client, not_found, server};

const PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com";
const API_VERSION: &str = "2018-05-01";

#[tokio::test]
async fn put_waits_for_async_operation() {
    let server = server().await;
    let operation = format!("{}/operations/op1", server.uri());
    Mock::given(method("PUT"))
        .and(path(PATH))
        .and(query_param("api-version", API_VERSION))
        .and(bearer_token("token"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation.as_str())
                .set_body_json(json!({"properties": {"provisioningState": "Updating"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PATH,
            "properties": {"provisioningState": "Succeeded", "maxNumberOfRecordSets": 10000},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let zone: Value = assert_ok!(
        client
            .put(PATH, API_VERSION, &json!({"location": "global"}), Precondition::None)
            .await
    );
    assert_eq!(zone["properties"]["maxNumberOfRecordSets"], 10000);
}

#[tokio::test]
async fn failed_operation_keeps_its_code() {
    let server = server().await;
    let operation = format!("{}/operations/op2", server.uri());
    Mock::given(method("PUT"))
        .and(path(PATH))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "Conflict", "message": "Another operation is in progress."},
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = assert_err!(
        client
            .put::<_, Value>(PATH, API_VERSION, &json!({}), Precondition::None)
            .await
    );
    assert_eq!(error_code(&err), Some("Conflict"));
    let operation = err.downcast_ref::<OperationError>().unwrap();
    assert_eq!(operation.status, "Failed");
}

#[tokio::test]
async fn put_polls_provisioning_state() {
    let server = server().await;
    Mock::given(method("PUT"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Creating"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Creating"},
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Succeeded"},
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let zone: Value = assert_ok!(client.put(PATH, API_VERSION, &json!({}), Precondition::None).await);
    assert_eq!(zone["properties"]["provisioningState"], "Succeeded");
}

#[tokio::test]
async fn put_without_provisioning_state_returns_the_body() {
    let server = server().await;
    Mock::given(method("PUT"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PATH,
            "properties": null,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let zone: Value = assert_ok!(client.put(PATH, API_VERSION, &json!({}), Precondition::None).await);
    assert_eq!(zone["id"], PATH);

    // A provisioning state of an unexpected shape does not block the write either
    let server = common::server().await;
    Mock::given(method("PUT"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PATH,
            "properties": {"provisioningState": {"code": "Succeeded"}},
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server);
    let zone: Value = assert_ok!(client.put(PATH, API_VERSION, &json!({}), Precondition::None).await);
    assert_eq!(zone["properties"]["provisioningState"]["code"], "Succeeded");
}

#[tokio::test]
async fn delete_follows_location() {
    let server = server().await;
    let location = format!("{}/locations/op3", server.uri());
    Mock::given(method("DELETE"))
        .and(path(PATH))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/op3"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/op3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_ok!(client.delete(PATH, API_VERSION).await);
}

#[tokio::test]
async fn list_follows_next_link() {
    let server = server().await;
    let collection = "/subscriptions/00000000-0000-0000-0000-000000000000/providers/Microsoft.Network/dnszones";
    Mock::given(method("GET"))
        .and(path(collection))
        .and(query_param("api-version", API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "a.com"}],
            "nextLink": format!("{}/next?page=2", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "b.com"}],
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let zones: Vec<Value> = assert_ok!(client.list(collection, API_VERSION).await);
    let names: Vec<&str> = zones.iter().filter_map(|zone| zone["name"].as_str()).collect();
    assert_eq!(names, ["a.com", "b.com"]);
}

#[tokio::test]
async fn error_bodies_are_classified() {
    let server = server().await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let client = client(&server);
    let err = assert_err!(client.get::<Value>(PATH, API_VERSION).await);
    assert!(is_not_found(&err));
    assert_eq!(error_code(&err), Some("NotFound"));
}

#[tokio::test]
async fn token_is_cached() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/token", common::TENANT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "cached",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PATH))
        .and(bearer_token("cached"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_ok!(client.get::<Value>(PATH, API_VERSION).await);
    assert_ok!(client.get::<Value>(PATH, API_VERSION).await);
}
