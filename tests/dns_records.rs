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

use std::collections::BTreeSet;

use serde_json::json;
use terraform_provider_azurerm::dns::records::{AddressRecords, Mx, A};
use terraform_provider_azurerm::dns::{DnsRecordSetResource, RecordSetState};
use terraform_provider_azurerm::ids::{RecordSetId, RecordType};
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{not_found, server, shared_client, SUBSCRIPTION};

fn record_set_id() -> RecordSetId {
    RecordSetId {
        subscription_id: SUBSCRIPTION.to_owned(),
        resource_group_name: "rg".to_owned(),
        dns_zone_name: "example.com".to_owned(),
        record_type: RecordType::A,
        name: "www".to_owned(),
    }
}

fn planned() -> RecordSetState<'static, A> {
    RecordSetState {
        id: Value::Unknown,
        name: "www".into(),
        resource_group_name: "rg".into(),
        zone_name: "example.com".into(),
        ttl: Value::Value(300),
        fqdn: Value::Unknown,
        records: AddressRecords {
            records: Value::Value(BTreeSet::from([
                "10.0.0.2".into(),
                "10.0.0.1".into(),
            ])),
        },
        ..Default::default()
    }
}

fn addresses<'a>(state: &'a RecordSetState<'a, A>) -> Vec<&'a str> {
    state
        .records
        .records
        .iter()
        .flatten()
        .map(|address| address.as_str())
        .collect()
}

#[tokio::test]
async fn a_record_lifecycle() {
    let server = server().await;
    let id = record_set_id().to_string();
    let remote = json!({
        "id": id,
        "name": "www",
        "properties": {
            "TTL": 300,
            "fqdn": "www.example.com.",
            "ARecords": [{"ipv4Address": "10.0.0.2"}, {"ipv4Address": "10.0.0.1"}],
        },
    });

    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .and(header("If-None-Match", "*"))
        .and(body_partial_json(json!({
            "properties": {
                "TTL": 300,
                "ARecords": [{"ipv4Address": "10.0.0.1"}, {"ipv4Address": "10.0.0.2"}],
            },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(&remote))
        .expect(1)
        .mount(&server)
        .await;
    // Read back after the create, then by the refresh
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();

    let (created, _) = resource
        .create(
            &mut diags,
            planned(),
            planned(),
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap_or_else(|| panic!("create failed: {diags:?}"));
    assert_eq!(created.id.as_str(), id);
    assert_eq!(created.fqdn.as_str(), "www.example.com.");
    assert_eq!(created.ttl, Value::Value(300));
    assert_eq!(addresses(&created), ["10.0.0.1", "10.0.0.2"]);
    assert!(created.tags.is_null());

    let (read, _) = resource
        .read(&mut diags, created.clone(), Default::default(), Default::default())
        .await
        .unwrap_or_else(|| panic!("read failed: {diags:?}"));
    assert_eq!(read.ttl, Value::Value(300));
    assert_eq!(addresses(&read), ["10.0.0.1", "10.0.0.2"]);

    assert!(resource
        .destroy(&mut diags, read, Default::default(), Default::default())
        .await
        .is_some());

    let gone = resource
        .read(&mut diags, created, Default::default(), Default::default())
        .await;
    assert!(gone.is_none());
    assert!(diags.errors.is_empty(), "{diags:?}");
}

#[tokio::test]
async fn existing_record_set_must_be_imported() {
    let server = server().await;
    let id = record_set_id().to_string();
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": {"code": "PreconditionFailed", "message": "The record set already exists."}
        })))
        .mount(&server)
        .await;

    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let created = resource
        .create(
            &mut diags,
            planned(),
            planned(),
            Default::default(),
            Default::default(),
        )
        .await;

    assert!(created.is_none());
    assert_eq!(diags.errors.len(), 1);
    assert!(diags.errors[0].detail.contains(
        "already exists - to be managed via Terraform this resource needs to be imported into the State"
    ));
    assert!(diags.errors[0].detail.contains("azurerm_dns_a_record"));
}

#[tokio::test]
async fn deleting_a_missing_record_set_succeeds() {
    let server = server().await;
    let id = record_set_id().to_string();
    Mock::given(method("DELETE"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;

    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let state = RecordSetState {
        id: id.clone().into(),
        ..planned()
    };
    assert!(resource
        .destroy(&mut diags, state, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty());
}

#[tokio::test]
async fn mx_record_name_defaults_to_apex() {
    let server = server().await;
    let resource = DnsRecordSetResource::<Mx>::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let proposed = RecordSetState::<Mx> {
        resource_group_name: "rg".into(),
        zone_name: "example.com".into(),
        ttl: Value::Value(3600),
        ..Default::default()
    };

    let (planned, _) = resource
        .plan_create(&mut diags, proposed.clone(), proposed, Default::default())
        .await
        .unwrap();
    assert_eq!(planned.name.as_str(), "@");
    assert!(planned.id.is_unknown());
}

#[tokio::test]
async fn import_rejects_other_record_types() {
    let server = server().await;
    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();

    let mut aaaa = record_set_id();
    aaaa.record_type = RecordType::Aaaa;
    assert!(resource.import(&mut diags, aaaa.to_string()).await.is_none());
    assert_eq!(diags.errors.len(), 1);

    let mut diags = Diagnostics::default();
    let (imported, _) = resource
        .import(&mut diags, record_set_id().to_string())
        .await
        .unwrap();
    assert_eq!(imported.name.as_str(), "www");
    assert_eq!(imported.zone_name.as_str(), "example.com");
}

#[tokio::test]
async fn legacy_id_is_rewritten_on_read() {
    let server = server().await;
    let id = record_set_id().to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": "www",
            "properties": {
                "TTL": 300,
                "fqdn": "www.example.com.",
                "ARecords": [{"ipv4Address": "10.0.0.1"}],
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let legacy = format!(
        "/subscriptions/{SUBSCRIPTION}/resourcegroups/rg/providers/Microsoft.Network/dnszones/example.com/a/www"
    );
    let state = RecordSetState {
        id: legacy.into(),
        ..planned()
    };

    let (read, _) = resource
        .read(&mut diags, state, Default::default(), Default::default())
        .await
        .unwrap_or_else(|| panic!("read failed: {diags:?}"));
    assert_eq!(read.id.as_str(), id);
    assert_eq!(addresses(&read), ["10.0.0.1"]);
    assert!(diags.errors.is_empty(), "{diags:?}");
}

#[tokio::test]
async fn failed_refresh_keeps_the_record_set() {
    let server = server().await;
    let id = record_set_id().to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": "InternalServerError", "message": "Try again later."}
        })))
        .mount(&server)
        .await;

    let resource = DnsRecordSetResource::<A>::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let state = RecordSetState {
        id: id.clone().into(),
        ..planned()
    };

    let (kept, _) = resource
        .read(&mut diags, state, Default::default(), Default::default())
        .await
        .expect("the record set must stay in the state");
    assert_eq!(kept.id.as_str(), id);
    assert_eq!(kept.ttl, Value::Value(300));
    assert_eq!(diags.errors.len(), 1);
}
