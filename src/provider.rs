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

use std::collections::HashMap;

use async_trait::async_trait;
use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{map, Diagnostics, DynamicDataSource, DynamicResource, Provider};

use crate::client::{Client, ClientSecretCredential, SharedClient};
use crate::config::ProviderConfig;
use crate::dns::records::{RecordKind, Txt, A, Aaaa, Cname, Mx, Ns, Ptr};
use crate::dns::{DnsRecordSetResource, DnsZoneDataSource, DnsZoneResource};
use crate::mssql::{
    FailoverGroupResource, FirewallRuleResource, ManagedInstanceResource, SqlServerDataSource,
    SqlServerResource,
};
use crate::private_dns::{PrivateDnsZoneResource, VirtualNetworkLinkResource};
use crate::utils::report;

/// Lookup of the `ARM_*` fallbacks
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Clone)]
pub struct AzureProvider {
    client: SharedClient,
    env: EnvLookup,
}

impl Default for AzureProvider {
    fn default() -> Self {
        Self::with_env(process_env)
    }
}

impl AzureProvider {
    /// Provider reading its fallbacks through `env` instead of the process environment
    pub fn with_env(env: EnvLookup) -> Self {
        Self {
            client: SharedClient::default(),
            env,
        }
    }

    /// Handle shared with every resource and data source
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    fn record_set<K: RecordKind>(&self) -> (String, Box<dyn DynamicResource>) {
        (
            K::RESOURCE_NAME.to_owned(),
            Box::new(DnsRecordSetResource::<K>::new(self.client.clone())),
        )
    }
}

#[async_trait]
impl Provider for AzureProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProviderConfig::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.validate(diags);
        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = config.resolve(diags, self.env)?;
        tracing::info!(
            terraform_version = %terraform_version,
            environment = %settings.environment,
            subscription_id = %settings.subscription_id,
            "configuring the provider"
        );

        let client = Client::http().and_then(|http| {
            let credential = ClientSecretCredential::new(
                http.clone(),
                &settings.authority,
                &settings.tenant_id,
                settings.client_id.clone(),
                settings.client_secret.clone(),
                &settings.resource_manager,
            )?;
            Ok(Client::new(
                http,
                settings.resource_manager.clone(),
                settings.subscription_id.clone(),
                credential,
            ))
        });
        match client {
            Ok(client) => {
                self.client.set(client);
                Some(())
            }
            Err(err) => {
                report(diags, err.context("configuring the azurerm provider"));
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        let mut resources: HashMap<String, Box<dyn DynamicResource>> = map! {
            "dns_zone" => DnsZoneResource::new(self.client.clone()),
            "private_dns_zone" => PrivateDnsZoneResource::new(self.client.clone()),
            "private_dns_zone_virtual_network_link" => VirtualNetworkLinkResource::new(self.client.clone()),
            "mssql_server" => SqlServerResource::new(self.client.clone()),
            "mssql_firewall_rule" => FirewallRuleResource::new(self.client.clone()),
            "mssql_failover_group" => FailoverGroupResource::new(self.client.clone()),
            "mssql_managed_instance" => ManagedInstanceResource::new(self.client.clone()),
        };
        resources.extend([
            self.record_set::<A>(),
            self.record_set::<Aaaa>(),
            self.record_set::<Cname>(),
            self.record_set::<Mx>(),
            self.record_set::<Ns>(),
            self.record_set::<Ptr>(),
            self.record_set::<Txt>(),
        ]);
        Some(resources)
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(map! {
            "dns_zone" => DnsZoneDataSource::new(self.client.clone()),
            "mssql_server" => SqlServerDataSource::new(self.client.clone()),
        })
    }
}
