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

use serde_json::{json, Value as Json};
use terraform_provider_azurerm::ids::{ManagedInstanceId, SqlDatabaseId, SqlServerId};
use terraform_provider_azurerm::mssql::{
    FailoverGroupResource, FailoverGroupState, FirewallRuleResource, FirewallRuleState,
    ManagedInstanceResource, ManagedInstanceState, PartnerServerState, ReadWriteEndpointPolicyState,
    SqlServerResource, SqlServerState,
};
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{not_found, server, shared_client, SUBSCRIPTION};

fn planned() -> SqlServerState<'static> {
    SqlServerState {
        id: Value::Unknown,
        name: "taken".into(),
        resource_group_name: "rg".into(),
        location: "westeurope".into(),
        version: "12.0".into(),
        administrator_login: "admin".into(),
        administrator_login_password: "P@ssw0rd!".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn server_names_are_global() {
    let server = server().await;
    let id = SqlServerId::new(SUBSCRIPTION, "rg", "taken").to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": "ServerNameAlreadyExists",
                "message": "The name 'taken' already exists. Choose a different name.",
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = SqlServerResource::new(shared_client(&server));
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
        "the name \"taken\" used for the SQL Server needs to be globally unique and isn't available"
    ));
}

#[tokio::test]
async fn existing_server_must_be_imported() {
    let server = server().await;
    let id = SqlServerId::new(SUBSCRIPTION, "rg", "taken").to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resource = SqlServerResource::new(shared_client(&server));
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
    assert!(diags.errors[0].detail.contains("azurerm_mssql_server"));
}

#[tokio::test]
async fn vanished_server_is_removed_from_state() {
    let server = server().await;
    let id = SqlServerId::new(SUBSCRIPTION, "rg", "taken").to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let resource = SqlServerResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let state = SqlServerState {
        id: id.into(),
        ..planned()
    };
    let read = resource
        .read(&mut diags, state, Default::default(), Default::default())
        .await;
    assert!(read.is_none());
    assert!(diags.errors.is_empty());
}

fn remote_server(id: &str, state: &str) -> Json {
    json!({
        "id": id,
        "location": "westeurope",
        "properties": {
            "version": "12.0",
            "administratorLogin": "admin",
            "fullyQualifiedDomainName": "sql-primary.database.windows.net",
            "minimalTlsVersion": "1.2",
            "publicNetworkAccess": "Enabled",
            "restrictOutboundNetworkAccess": "Disabled",
            "state": state,
        },
    })
}

#[tokio::test]
async fn server_is_created_once_ready() {
    let server = server().await;
    let id = SqlServerId::new(SUBSCRIPTION, "rg", "sql-primary").to_string();
    let policy = format!("{id}/connectionPolicies/default");

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .and(body_partial_json(json!({
            "location": "westeurope",
            "properties": {
                "administratorLogin": "admin",
                "minimalTlsVersion": "1.2",
                "publicNetworkAccess": "Enabled",
                "restrictOutboundNetworkAccess": "Disabled",
            },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(remote_server(&id, "Creating")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_server(&id, "Creating")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    // Twice `Ready` in a row, then the final read
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_server(&id, "Ready")))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(policy.as_str()))
        .and(body_partial_json(json!({"properties": {"connectionType": "Default"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"properties": {"connectionType": "Default"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(policy.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"properties": {"connectionType": "Default"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resource = SqlServerResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let proposed = SqlServerState {
        name: "sql-primary".into(),
        ..planned()
    };
    let (planned, _) = resource
        .plan_create(&mut diags, proposed.clone(), proposed, Default::default())
        .await
        .unwrap();
    let (created, _) = resource
        .create(
            &mut diags,
            planned.clone(),
            planned,
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap_or_else(|| panic!("create failed: {diags:?}"));

    assert!(diags.errors.is_empty(), "{diags:?}");
    assert_eq!(created.id.as_str(), id);
    assert_eq!(
        created.fully_qualified_domain_name.as_str(),
        "sql-primary.database.windows.net"
    );
    assert_eq!(created.connection_policy.as_str(), "Default");
    assert_eq!(created.minimum_tls_version.as_str(), "1.2");
    assert_eq!(created.public_network_access_enabled, Value::Value(true));
    assert_eq!(created.administrator_login_password.as_str(), "P@ssw0rd!");
}

#[tokio::test]
async fn firewall_rule_lifecycle() {
    let server = server().await;
    let server_id = SqlServerId::new(SUBSCRIPTION, "rg", "sql-primary");
    let id = server_id.firewall_rule("office").to_string();
    let remote = json!({
        "id": id,
        "properties": {"startIpAddress": "10.0.0.1", "endIpAddress": "10.0.0.255"},
    });

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .and(body_partial_json(json!({
            "properties": {"startIpAddress": "10.0.0.1", "endIpAddress": "10.0.0.255"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resource = FirewallRuleResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let planned = FirewallRuleState {
        id: Value::Unknown,
        name: "office".into(),
        server_id: server_id.to_string().into(),
        start_ip_address: "10.0.0.1".into(),
        end_ip_address: "10.0.0.255".into(),
        ..Default::default()
    };

    let (created, _) = resource
        .create(
            &mut diags,
            planned.clone(),
            planned,
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap_or_else(|| panic!("create failed: {diags:?}"));
    assert_eq!(created.id.as_str(), id);
    assert_eq!(created.end_ip_address.as_str(), "10.0.0.255");

    let (read, _) = resource
        .read(&mut diags, created, Default::default(), Default::default())
        .await
        .unwrap_or_else(|| panic!("read failed: {diags:?}"));
    assert_eq!(read.server_id.as_str(), server_id.to_string());
    assert_eq!(read.start_ip_address.as_str(), "10.0.0.1");

    assert!(resource
        .destroy(&mut diags, read, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty(), "{diags:?}");
}

#[tokio::test]
async fn failover_group_lifecycle() {
    let server = server().await;
    let primary = SqlServerId::new(SUBSCRIPTION, "rg", "sql-primary");
    let secondary = SqlServerId::new(SUBSCRIPTION, "rg-dr", "sql-secondary").to_string();
    let database = SqlDatabaseId::new(SUBSCRIPTION, "rg", "sql-primary", "orders").to_string();
    let id = primary.failover_group("orders-fog").to_string();
    let operation = format!("{}/operations/fog", server.uri());
    let deletion = format!("{}/operations/fog-delete", server.uri());
    let remote = json!({
        "id": id,
        "properties": {
            "readWriteEndpoint": {
                "failoverPolicy": "Automatic",
                "failoverWithDataLossGracePeriodMinutes": 60,
            },
            "readOnlyEndpoint": {"failoverPolicy": "Disabled"},
            "replicationRole": "Primary",
            "partnerServers": [
                {"id": secondary, "location": "northeurope", "replicationRole": "Secondary"},
            ],
            "databases": [database],
        },
    });

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .and(body_partial_json(json!({
            "properties": {
                "readWriteEndpoint": {
                    "failoverPolicy": "Automatic",
                    "failoverWithDataLossGracePeriodMinutes": 60,
                },
                "readOnlyEndpoint": {"failoverPolicy": "Disabled"},
                "partnerServers": [{"id": secondary}],
                "databases": [database],
            },
        })))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/fog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;
    // Fetched after the operation, then by the refresh
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", deletion.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/fog-delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resource = FailoverGroupResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let planned = FailoverGroupState {
        id: Value::Unknown,
        name: "orders-fog".into(),
        server_id: primary.to_string().into(),
        partner_server: Value::Value(vec![PartnerServerState {
            id: secondary.clone().into(),
            location: Value::Unknown,
            role: Value::Unknown,
        }]),
        databases: Value::Value(BTreeSet::from([database.clone().into()])),
        readonly_endpoint_failover_policy_enabled: Value::Value(false),
        read_write_endpoint_failover_policy: Value::Value(ReadWriteEndpointPolicyState {
            mode: "Automatic".into(),
            grace_minutes: Value::Value(60),
        }),
        ..Default::default()
    };

    let (created, _) = resource
        .create(
            &mut diags,
            planned.clone(),
            planned,
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap_or_else(|| panic!("create failed: {diags:?}"));
    assert_eq!(created.id.as_str(), id);
    let partners: Vec<_> = created.partner_server.iter().flatten().collect();
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].location.as_str(), "northeurope");
    assert_eq!(partners[0].role.as_str(), "Secondary");

    let (read, _) = resource
        .read(&mut diags, created, Default::default(), Default::default())
        .await
        .unwrap_or_else(|| panic!("read failed: {diags:?}"));
    let databases: Vec<&str> = read
        .databases
        .iter()
        .flatten()
        .map(|database| database.as_str())
        .collect();
    assert_eq!(databases, [database.as_str()]);
    assert_eq!(
        read.read_write_endpoint_failover_policy,
        Value::Value(ReadWriteEndpointPolicyState {
            mode: "Automatic".into(),
            grace_minutes: Value::Value(60),
        })
    );
    assert_eq!(read.readonly_endpoint_failover_policy_enabled, Value::Value(false));

    assert!(resource
        .destroy(&mut diags, read, Default::default(), Default::default())
        .await
        .is_some());
    assert!(diags.errors.is_empty(), "{diags:?}");
}

fn planned_managed_instance() -> ManagedInstanceState<'static> {
    ManagedInstanceState {
        id: Value::Unknown,
        name: "mi-primary".into(),
        resource_group_name: "rg".into(),
        location: "westeurope".into(),
        sku_name: "GP_Gen5".into(),
        license_type: "BasePrice".into(),
        vcores: Value::Value(4),
        storage_size_in_gb: Value::Value(32),
        storage_account_type: "ZRS".into(),
        subnet_id: format!(
            "/subscriptions/{SUBSCRIPTION}/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/sql"
        )
        .into(),
        administrator_login: "missadministrator".into(),
        administrator_login_password: "NCC-1701-D-enterprise".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn managed_instance_is_created_after_the_operation() {
    let server = server().await;
    let id = ManagedInstanceId::new(SUBSCRIPTION, "rg", "mi-primary").to_string();
    let operation = format!("{}/operations/mi", server.uri());
    let remote = json!({
        "id": id,
        "location": "westeurope",
        "sku": {"name": "GP_Gen5", "tier": "GeneralPurpose", "family": "Gen5"},
        "properties": {
            "administratorLogin": "missadministrator",
            "licenseType": "BasePrice",
            "subnetId": planned_managed_instance().subnet_id.as_str(),
            "vCores": 4,
            "storageSizeInGB": 32,
            "requestedBackupStorageRedundancy": "Zone",
            "collation": "SQL_Latin1_General_CP1_CI_AS",
            "timezoneId": "UTC",
            "minimalTlsVersion": "1.2",
            "publicDataEndpointEnabled": false,
            "proxyOverride": "Default",
            "zoneRedundant": false,
            "fullyQualifiedDomainName": "mi-primary.0123456789ab.database.windows.net",
            "provisioningState": "Succeeded",
            "state": "Ready",
        },
    });

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(not_found())
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .and(body_partial_json(json!({
            "location": "westeurope",
            "sku": {"name": "GP_Gen5", "tier": "GeneralPurpose", "family": "Gen5"},
            "properties": {
                "licenseType": "BasePrice",
                "vCores": 4,
                "storageSizeInGB": 32,
                "requestedBackupStorageRedundancy": "Zone",
                "collation": "SQL_Latin1_General_CP1_CI_AS",
                "timezoneId": "UTC",
            },
        })))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/mi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;
    // Fetched after the operation, by the wait for `Ready`, then by the final read
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote))
        .expect(3)
        .mount(&server)
        .await;

    let resource = ManagedInstanceResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let proposed = planned_managed_instance();
    let (planned, _) = resource
        .plan_create(&mut diags, proposed.clone(), proposed, Default::default())
        .await
        .unwrap();
    assert!(planned.fqdn.is_unknown());
    let (created, _) = resource
        .create(
            &mut diags,
            planned.clone(),
            planned,
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap_or_else(|| panic!("create failed: {diags:?}"));

    assert!(diags.errors.is_empty(), "{diags:?}");
    assert_eq!(created.id.as_str(), id);
    assert_eq!(created.fqdn.as_str(), "mi-primary.0123456789ab.database.windows.net");
    assert_eq!(created.storage_account_type.as_str(), "ZRS");
    assert_eq!(created.sku_name.as_str(), "GP_Gen5");
    assert_eq!(created.vcores, Value::Value(4));
    assert_eq!(created.administrator_login_password.as_str(), "NCC-1701-D-enterprise");
}

#[tokio::test]
async fn existing_managed_instance_must_be_imported() {
    let server = server().await;
    let id = ManagedInstanceId::new(SUBSCRIPTION, "rg", "mi-primary").to_string();
    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resource = ManagedInstanceResource::new(shared_client(&server));
    let mut diags = Diagnostics::default();
    let created = resource
        .create(
            &mut diags,
            planned_managed_instance(),
            planned_managed_instance(),
            Default::default(),
            Default::default(),
        )
        .await;

    assert!(created.is_none());
    assert!(diags.errors[0].detail.contains("azurerm_mssql_managed_instance"));
}

#[tokio::test]
async fn managed_instance_sizes_are_validated() {
    let resource = ManagedInstanceResource::default();
    let mut diags = Diagnostics::default();
    let config = ManagedInstanceState {
        vcores: Value::Value(6),
        storage_size_in_gb: Value::Value(40),
        ..planned_managed_instance()
    };
    assert!(resource.validate(&mut diags, config).await.is_none());
    assert_eq!(diags.errors.len(), 2, "{diags:?}");
}
