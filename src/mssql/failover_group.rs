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
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{
    self, Value, ValueBool, ValueEmpty, ValueList, ValueNumber, ValueSet, ValueString,
};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{
    enabled, is_enabled, FailoverGroup, FailoverGroupProperties, PartnerInfo, ReadOnlyEndpoint,
    ReadWriteEndpoint,
};
use super::{ensure_absent, API_VERSION, FAILOVER_GROUP_TIMEOUTS};
use crate::client::{is_not_found, Client, Precondition, SharedClient};
use crate::ids::{FailoverGroupId, SqlDatabaseId, SqlServerId};
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report};
use crate::validate;

const AUTOMATIC: &str = "Automatic";
const MANUAL: &str = "Manual";

#[derive(Debug, Default, Clone)]
pub struct FailoverGroupResource {
    client: SharedClient,
}

impl FailoverGroupResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartnerServerState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub location: ValueString<'a>,
    pub role: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReadWriteEndpointPolicyState<'a> {
    #[serde(borrow = "'a")]
    pub mode: ValueString<'a>,
    pub grace_minutes: ValueNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FailoverGroupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub server_id: ValueString<'a>,
    pub partner_server: ValueList<PartnerServerState<'a>>,
    pub databases: ValueSet<ValueString<'a>>,
    pub readonly_endpoint_failover_policy_enabled: ValueBool,
    pub read_write_endpoint_failover_policy: Value<ReadWriteEndpointPolicyState<'a>>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn owned<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

/// `remote`, or the equivalent `prior` value differing only by casing
fn keep_spelling<'a>(remote: String, prior: impl IntoIterator<Item = &'a str>) -> String {
    prior
        .into_iter()
        .find(|prior| prior.eq_ignore_ascii_case(&remote))
        .map_or(remote, str::to_owned)
}

impl<'a> FailoverGroupState<'a> {
    fn expand(&self) -> FailoverGroup {
        let policy = self.read_write_endpoint_failover_policy.as_ref_option();
        FailoverGroup {
            tags: Some(tags::expand(&self.tags)),
            properties: Some(FailoverGroupProperties {
                read_write_endpoint: Some(ReadWriteEndpoint {
                    failover_policy: policy
                        .and_then(|policy| policy.mode.as_deref_option())
                        .map(str::to_owned),
                    failover_with_data_loss_grace_period_minutes: policy
                        .and_then(|policy| policy.grace_minutes.as_ref_option())
                        .copied(),
                }),
                read_only_endpoint: Some(ReadOnlyEndpoint {
                    failover_policy: Some(enabled(
                        self.readonly_endpoint_failover_policy_enabled.unwrap_or(false),
                    )),
                }),
                partner_servers: Some(
                    self.partner_server
                        .iter()
                        .flatten()
                        .map(|partner| PartnerInfo {
                            id: partner.id.as_deref_option().map(str::to_owned),
                            ..Default::default()
                        })
                        .collect(),
                ),
                databases: Some(
                    self.databases
                        .iter()
                        .flatten()
                        .filter_map(|database| database.as_deref_option())
                        .map(str::to_owned)
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn refreshed(&self, id: &FailoverGroupId, group: FailoverGroup) -> Self {
        let properties = group.properties.unwrap_or_default();
        let read_write = properties.read_write_endpoint.unwrap_or_default();

        let prior_partners: Vec<&str> = self
            .partner_server
            .iter()
            .flatten()
            .filter_map(|partner| partner.id.as_deref_option())
            .collect();
        let partner_server = properties
            .partner_servers
            .unwrap_or_default()
            .into_iter()
            .map(|partner| PartnerServerState {
                id: owned(keep_spelling(
                    partner.id.unwrap_or_default(),
                    prior_partners.iter().copied(),
                )),
                location: owned(partner.location.unwrap_or_default()),
                role: owned(partner.replication_role.unwrap_or_default()),
            })
            .collect();

        let prior_databases: Vec<&str> = self
            .databases
            .iter()
            .flatten()
            .filter_map(|database| database.as_deref_option())
            .collect();
        let databases = properties.databases.unwrap_or_default();
        let databases = if databases.is_empty() && self.databases.is_null() {
            Value::Null
        } else {
            Value::Value(
                databases
                    .into_iter()
                    .map(|database| owned(keep_spelling(database, prior_databases.iter().copied())))
                    .collect(),
            )
        };

        let server_id = keep_spelling(id.server().to_string(), self.server_id.as_deref_option());

        Self {
            id: owned(id.to_string()),
            name: owned(&id.failover_group_name),
            server_id: owned(server_id),
            partner_server: Value::Value(partner_server),
            databases,
            readonly_endpoint_failover_policy_enabled: Value::Value(is_enabled(
                properties
                    .read_only_endpoint
                    .and_then(|endpoint| endpoint.failover_policy)
                    .as_deref(),
            )),
            read_write_endpoint_failover_policy: Value::Value(ReadWriteEndpointPolicyState {
                mode: owned(read_write.failover_policy.unwrap_or_default()),
                grace_minutes: read_write
                    .failover_with_data_loss_grace_period_minutes
                    .into(),
            }),
            tags: tags::flatten(group.tags, &self.tags),
            timeouts: self.timeouts.clone(),
        }
    }

    /// Mark the values only known once the group exists
    fn plan_computed(&mut self, prior: Option<&Self>) {
        if self.readonly_endpoint_failover_policy_enabled.is_null() {
            self.readonly_endpoint_failover_policy_enabled = Value::Value(false);
        }
        match prior {
            Some(prior) => self.id = prior.id.clone(),
            None => self.id = Value::Unknown,
        }
        for partner in self.partner_server.iter_mut().flatten() {
            if partner.location.is_null() {
                partner.location = Value::Unknown;
            }
            if partner.role.is_null() {
                partner.role = Value::Unknown;
            }
        }
    }
}

async fn write_group(
    client: &Client,
    id: &FailoverGroupId,
    state: &FailoverGroupState<'_>,
) -> Result<FailoverGroup> {
    client
        .put(&id.to_string(), API_VERSION, &state.expand(), Precondition::None)
        .await
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<FailoverGroupId> {
    match FailoverGroupId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for FailoverGroupResource {
    type State<'a> = FailoverGroupState<'a>;
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
                    "id" => string("Resource ID of the failover group", AttributeConstraint::Computed),
                    "name" => string("Name of the failover group", AttributeConstraint::Required),
                    "server_id" => string("Resource ID of the primary SQL server", AttributeConstraint::Required),
                    "databases" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Resource IDs of the databases replicated by the group"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "readonly_endpoint_failover_policy_enabled" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Fail over the read-only endpoint too (default: false)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "partner_server" => NestedBlock::List(Block {
                        attributes: map! {
                            "id" => string("Resource ID of the secondary SQL server", AttributeConstraint::Required),
                            "location" => string("Location of the secondary SQL server", AttributeConstraint::Computed),
                            "role" => string("Replication role of the secondary SQL server", AttributeConstraint::Computed),
                        },
                        description: Description::plain("Secondary servers of the group"),
                        ..Default::default()
                    }),
                    "read_write_endpoint_failover_policy" => NestedBlock::Single(Block {
                        attributes: map! {
                            "mode" => string("Failover policy of the read-write endpoint: `Automatic` or `Manual`", AttributeConstraint::Required),
                            "grace_minutes" => Attribute {
                                attr_type: AttributeType::Number,
                                description: Description::plain("Grace period before an automatic failover with data loss, required when `mode` is `Automatic`"),
                                constraint: AttributeConstraint::Optional,
                                ..Default::default()
                            },
                        },
                        description: Description::plain("Failover policy of the read-write endpoint"),
                        ..Default::default()
                    }),
                    "timeouts" => timeouts::schema(Operation::ALL, &FAILOVER_GROUP_TIMEOUTS),
                },
                description: Description::plain("Manages a failover group of SQL databases"),
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

        if let Value::Value(partners) = &config.partner_server {
            if partners.is_empty() {
                diags.error_short(
                    "At least one `partner_server` block is required",
                    AttributePath::new("partner_server"),
                );
            }
            for (i, partner) in partners.iter().enumerate() {
                validate::string(
                    diags,
                    &partner.id,
                    AttributePath::new("partner_server").index(i as i64).attribute("id"),
                    |id| {
                        SqlServerId::parse_insensitively(id)
                            .map(drop)
                            .map_err(|err| err.to_string())
                    },
                );
            }
        }
        for database in config.databases.iter().flatten() {
            validate::string(diags, database, AttributePath::new("databases"), |id| {
                SqlDatabaseId::parse_insensitively(id)
                    .map(drop)
                    .map_err(|err| err.to_string())
            });
        }

        if let Value::Value(policy) = &config.read_write_endpoint_failover_policy {
            let path = AttributePath::new("read_write_endpoint_failover_policy");
            validate::string(diags, &policy.mode, path.clone().attribute("mode"), |mode| {
                validate::one_of(mode, &[AUTOMATIC, MANUAL])
            });
            match (policy.mode.as_deref_option(), &policy.grace_minutes) {
                (Some(AUTOMATIC), Value::Null) => diags.error(
                    "Missing `grace_minutes`",
                    "`grace_minutes` is required when `mode` is `Automatic`",
                    path.attribute("grace_minutes"),
                ),
                (Some(MANUAL), Value::Value(_)) => diags.error(
                    "Unexpected `grace_minutes`",
                    "`grace_minutes` can only be set when `mode` is `Automatic`",
                    path.attribute("grace_minutes"),
                ),
                (_, grace_minutes) => validate::number(
                    diags,
                    grace_minutes,
                    path.attribute("grace_minutes"),
                    |minutes| validate::range(minutes, 60, i64::from(i32::MAX)),
                ),
            }
        }
        tags::validate(diags, &config.tags);
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

        let timeout = state.timeouts.duration(Operation::Read, &FAILOVER_GROUP_TIMEOUTS);
        match timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<FailoverGroup>(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(group) => Some((state.refreshed(&id, group), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "failover group was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving failover group {id}")));
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
        state.plan_computed(None);
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
        state.plan_computed(replace.is_empty().then_some(&prior_state));
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
        let id = server.failover_group(planned_state.name.as_str());

        let timeout = planned_state.timeouts.duration(Operation::Create, &FAILOVER_GROUP_TIMEOUTS);
        let created = timeouts::run(Operation::Create, timeout, &id, async {
            ensure_absent(&client, "mssql_failover_group", &id).await?;
            write_group(&client, &id, &planned_state).await
        })
        .await;

        match created {
            Ok(group) => Some((planned_state.refreshed(&id, group), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating failover group {id}")));
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

        let timeout = planned_state.timeouts.duration(Operation::Update, &FAILOVER_GROUP_TIMEOUTS);
        match timeouts::run(
            Operation::Update,
            timeout,
            &id,
            write_group(&client, &id, &planned_state),
        )
        .await
        {
            Ok(group) => Some((planned_state.refreshed(&id, group), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating failover group {id}")));
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

        let timeout = prior_state.timeouts.duration(Operation::Delete, &FAILOVER_GROUP_TIMEOUTS);
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
                report(diags, err.context(format!("deleting failover group {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match FailoverGroupId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            FailoverGroupState {
                id: owned(id.to_string()),
                name: owned(&id.failover_group_name),
                server_id: owned(id.server().to_string()),
                ..Default::default()
            },
            Default::default(),
        ))
    }
}
