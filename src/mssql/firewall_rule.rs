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

use std::borrow::Cow;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{FirewallRule, FirewallRuleProperties};
use super::{ensure_absent, API_VERSION, FIREWALL_RULE_TIMEOUTS};
use crate::client::{is_not_found, Client, Precondition, SharedClient};
use crate::ids::{FirewallRuleId, SqlServerId};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report};
use crate::validate;

#[derive(Debug, Default, Clone)]
pub struct FirewallRuleResource {
    client: SharedClient,
}

impl FirewallRuleResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirewallRuleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub server_id: ValueString<'a>,
    pub start_ip_address: ValueString<'a>,
    pub end_ip_address: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

impl<'a> FirewallRuleState<'a> {
    fn expand(&self) -> FirewallRule {
        FirewallRule {
            properties: Some(FirewallRuleProperties {
                start_ip_address: self.start_ip_address.as_deref_option().map(str::to_owned),
                end_ip_address: self.end_ip_address.as_deref_option().map(str::to_owned),
            }),
            ..Default::default()
        }
    }

    fn refreshed(&self, id: &FirewallRuleId, rule: FirewallRule) -> Self {
        let properties = rule.properties.unwrap_or_default();
        let owned = |value: String| Value::Value(Cow::Owned(value));
        let server_id = id.server().to_string();
        let server_id = match self.server_id.as_deref_option() {
            Some(prior) if prior.eq_ignore_ascii_case(&server_id) => prior.to_owned(),
            _ => server_id,
        };
        Self {
            id: owned(id.to_string()),
            name: owned(id.firewall_rule_name.clone()),
            server_id: owned(server_id),
            start_ip_address: owned(properties.start_ip_address.unwrap_or_default()),
            end_ip_address: owned(properties.end_ip_address.unwrap_or_default()),
            timeouts: self.timeouts.clone(),
        }
    }
}

async fn write_rule(
    client: &Client,
    id: &FirewallRuleId,
    state: &FirewallRuleState<'_>,
) -> Result<FirewallRule> {
    client
        .put(&id.to_string(), API_VERSION, &state.expand(), Precondition::None)
        .await
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<FirewallRuleId> {
    match FirewallRuleId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for FirewallRuleResource {
    type State<'a> = FirewallRuleState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let string = |description: &str, constraint| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => string("Resource ID of the firewall rule", AttributeConstraint::Computed),
                    "name" => string("Name of the firewall rule", AttributeConstraint::Required),
                    "server_id" => string("Resource ID of the SQL server", AttributeConstraint::Required),
                    "start_ip_address" => string("First IPv4 address of the allowed range", AttributeConstraint::Required),
                    "end_ip_address" => string("Last IPv4 address of the allowed range", AttributeConstraint::Required),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(Operation::ALL, &FIREWALL_RULE_TIMEOUTS),
                },
                description: Description::plain("Allows a range of IPv4 addresses to reach a SQL server"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(diags, &config.name, AttributePath::new("name"), validate::child_name);
        validate::string(diags, &config.server_id, AttributePath::new("server_id"), |id| {
            SqlServerId::parse_insensitively(id)
                .map(drop)
                .map_err(|err| err.to_string())
        });
        validate::string(
            diags,
            &config.start_ip_address,
            AttributePath::new("start_ip_address"),
            validate::ipv4,
        );
        validate::string(
            diags,
            &config.end_ip_address,
            AttributePath::new("end_ip_address"),
            validate::ipv4,
        );
        config.timeouts.validate(diags, Operation::ALL);

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (Some(client), Some(id)) = (self.client.get(diags), parse_id(diags, &state.id)) else {
            return Some((state, private_state));
        };

        let timeout = state.timeouts.duration(Operation::Read, &FIREWALL_RULE_TIMEOUTS);
        match timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<FirewallRule>(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(rule) => Some((state.refreshed(&id, rule), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "firewall rule was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving firewall rule {id}")));
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "name", &prior_state.name, &state.name);
        replace_if_changed(&mut replace, "server_id", &prior_state.server_id, &state.server_id);
        if !replace.is_empty() {
            state.id = Value::Unknown;
        }
        Some((state, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags)?;
        let server = match SqlServerId::parse_insensitively(planned_state.server_id.as_str()) {
            Ok(server) => server,
            Err(err) => {
                diags.error("Invalid `server_id`", err.to_string(), AttributePath::new("server_id"));
                return None;
            }
        };
        let id = server.firewall_rule(planned_state.name.as_str());

        let timeout = planned_state.timeouts.duration(Operation::Create, &FIREWALL_RULE_TIMEOUTS);
        let created = timeouts::run(Operation::Create, timeout, &id, async {
            ensure_absent(&client, "mssql_firewall_rule", &id).await?;
            write_rule(&client, &id, &planned_state).await
        })
        .await;

        match created {
            Ok(rule) => Some((planned_state.refreshed(&id, rule), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating firewall rule {id}")));
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags)?;
        let id = parse_id(diags, &prior_state.id)?;

        let timeout = planned_state.timeouts.duration(Operation::Update, &FIREWALL_RULE_TIMEOUTS);
        match timeouts::run(
            Operation::Update,
            timeout,
            &id,
            write_rule(&client, &id, &planned_state),
        )
        .await
        {
            Ok(rule) => Some((planned_state.refreshed(&id, rule), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating firewall rule {id}")));
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.client.get(diags)?;
        let id = parse_id(diags, &prior_state.id)?;

        let timeout = prior_state.timeouts.duration(Operation::Delete, &FIREWALL_RULE_TIMEOUTS);
        match timeouts::run(
            Operation::Delete,
            timeout,
            &id,
            client.delete(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(()) => Some(()),
            Err(err) if is_not_found(&err) => Some(()),
            Err(err) => {
                report(diags, err.context(format!("deleting firewall rule {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match FirewallRuleId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            FirewallRuleState {
                id: Value::Value(Cow::Owned(id.to_string())),
                name: Value::Value(Cow::Owned(id.firewall_rule_name.clone())),
                server_id: Value::Value(Cow::Owned(id.server().to_string())),
                ..Default::default()
            },
            Default::default(),
        ))
    }
}
