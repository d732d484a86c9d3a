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

//! SQL logical servers, their firewall rules and failover groups, and SQL managed instances

mod failover_group;
mod firewall_rule;
mod managed_instance;
mod models;
mod server;
mod server_data_source;

use std::fmt::Display;

use anyhow::Context;

use crate::client::{is_not_found, Client};
use crate::timeouts::Defaults;
use crate::utils::AlreadyExistsError;

pub use failover_group::{
    FailoverGroupResource, FailoverGroupState, PartnerServerState, ReadWriteEndpointPolicyState,
};
pub use firewall_rule::{FirewallRuleResource, FirewallRuleState};
pub use managed_instance::{ManagedInstanceResource, ManagedInstanceState};
pub use models::{
    ConnectionPolicy, FailoverGroup, FirewallRule, ManagedInstance, ManagedInstanceProperties,
    Server, ServerProperties, Sku,
};
pub use server::{SqlServerResource, SqlServerState};
pub use server_data_source::{SqlServerDataSource, SqlServerDataSourceState};

pub const API_VERSION: &str = "2021-11-01";

pub(crate) const SERVER_TIMEOUTS: Defaults = Defaults::minutes(60, 5, 60, 60);
pub(crate) const FIREWALL_RULE_TIMEOUTS: Defaults = Defaults::minutes(30, 5, 30, 30);
pub(crate) const FAILOVER_GROUP_TIMEOUTS: Defaults = Defaults::minutes(30, 5, 30, 30);
/// Provisioning a managed instance can take hours
pub(crate) const MANAGED_INSTANCE_TIMEOUTS: Defaults = Defaults::minutes(24 * 60, 5, 24 * 60, 24 * 60);

/// Fail with [`AlreadyExistsError`] when the object at `id` exists
async fn ensure_absent(
    client: &Client,
    resource_type: &str,
    id: impl Display,
) -> anyhow::Result<()> {
    match client
        .get::<serde_json::Value>(&id.to_string(), API_VERSION)
        .await
    {
        Ok(_) => Err(AlreadyExistsError::new(resource_type, id).into()),
        Err(err) if is_not_found(&err) => Ok(()),
        Err(err) => Err(err).with_context(|| format!("checking for presence of existing {id}")),
    }
}
