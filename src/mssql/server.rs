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
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{
    enabled, is_enabled, ConnectionPolicy, ConnectionPolicyProperties, Server, ServerProperties,
};
use super::{ensure_absent, API_VERSION, SERVER_TIMEOUTS};
use crate::client::{error_code, is_not_found, Client, Precondition, SharedClient};
use crate::ids::SqlServerId;
use crate::poll::StateChange;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{keep_location_spelling, normalize_location, replace_if_changed, report};
use crate::validate;

const DEFAULT_MINIMUM_TLS_VERSION: &str = "1.2";
const DEFAULT_CONNECTION_POLICY: &str = "Default";

/// ARM error codes reported when the server name is taken
const NAME_CONFLICT_CODES: &[&str] = &[
    "NameAlreadyExists",
    "ServerNameAlreadyExists",
    "ServerNameAlreadyExistsInSubscription",
];

/// Server names are global to Azure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the name {name:?} used for the SQL Server needs to be globally unique and isn't available")]
pub struct NameNotAvailableError {
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct SqlServerResource {
    client: SharedClient,
}

impl SqlServerResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SqlServerState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub version: ValueString<'a>,
    pub administrator_login: ValueString<'a>,
    pub administrator_login_password: ValueString<'a>,
    pub minimum_tls_version: ValueString<'a>,
    pub public_network_access_enabled: ValueBool,
    pub outbound_network_restriction_enabled: ValueBool,
    pub connection_policy: ValueString<'a>,
    pub fully_qualified_domain_name: ValueString<'a>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn owned<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

fn optional(value: &ValueString) -> Option<String> {
    value.as_deref_option().map(str::to_owned)
}

impl<'a> SqlServerState<'a> {
    fn server_id(&self, subscription_id: &str) -> SqlServerId {
        SqlServerId::new(
            subscription_id,
            self.resource_group_name.as_str(),
            self.name.as_str(),
        )
    }

    /// Fill the attributes that have a default value
    fn with_defaults(mut self) -> Self {
        if self.minimum_tls_version.is_null() {
            self.minimum_tls_version = Value::Value(Cow::Borrowed(DEFAULT_MINIMUM_TLS_VERSION));
        }
        if self.public_network_access_enabled.is_null() {
            self.public_network_access_enabled = Value::Value(true);
        }
        if self.outbound_network_restriction_enabled.is_null() {
            self.outbound_network_restriction_enabled = Value::Value(false);
        }
        if self.connection_policy.is_null() {
            self.connection_policy = Value::Value(Cow::Borrowed(DEFAULT_CONNECTION_POLICY));
        }
        self
    }

    fn expand(&self) -> Server {
        Server {
            location: optional(&self.location),
            tags: Some(tags::expand(&self.tags)),
            properties: Some(ServerProperties {
                version: optional(&self.version),
                administrator_login: optional(&self.administrator_login),
                administrator_login_password: optional(&self.administrator_login_password),
                minimal_tls_version: optional(&self.minimum_tls_version),
                public_network_access: Some(enabled(
                    self.public_network_access_enabled.unwrap_or(true),
                )),
                restrict_outbound_network_access: Some(enabled(
                    self.outbound_network_restriction_enabled.unwrap_or(false),
                )),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn refreshed(&self, id: &SqlServerId, server: Server, policy: ConnectionPolicy) -> Self {
        let properties = server.properties.unwrap_or_default();
        let location = server.location.unwrap_or_default();
        Self {
            id: owned(id.to_string()),
            name: owned(&id.server_name),
            resource_group_name: owned(&id.resource_group_name),
            location: owned(keep_location_spelling(&location, self.location.as_str())),
            version: owned(properties.version.unwrap_or_default()),
            administrator_login: owned(properties.administrator_login.unwrap_or_default()),
            administrator_login_password: self.administrator_login_password.clone(),
            minimum_tls_version: owned(properties.minimal_tls_version.unwrap_or_default()),
            public_network_access_enabled: Value::Value(is_enabled(
                properties.public_network_access.as_deref(),
            )),
            outbound_network_restriction_enabled: Value::Value(is_enabled(
                properties.restrict_outbound_network_access.as_deref(),
            )),
            connection_policy: owned(
                policy
                    .properties
                    .and_then(|properties| properties.connection_type)
                    .unwrap_or_default(),
            ),
            fully_qualified_domain_name: owned(
                properties.fully_qualified_domain_name.unwrap_or_default(),
            ),
            tags: tags::flatten(server.tags, &self.tags),
            timeouts: self.timeouts.clone(),
        }
    }
}

fn connection_policy_path(id: &SqlServerId) -> String {
    format!("{id}/connectionPolicies/default")
}

/// Wait until the server reports `Ready` twice in a row
async fn wait_ready(client: &Client, id: &SqlServerId, timeout: Duration) -> Result<()> {
    let path = &id.to_string();
    StateChange::new(&["Creating", "Updating", "Unknown"], &["Ready"], timeout)
        .with_poll_interval(client.poll_interval())
        .with_continuous_target_occurrence(2)
        .wait(move || async move {
            match client.get::<Server>(path, API_VERSION).await {
                Ok(server) => Ok(Some(
                    server
                        .properties
                        .and_then(|properties| properties.state)
                        .unwrap_or_else(|| "Unknown".to_owned()),
                )),
                Err(err) if is_not_found(&err) => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
        .with_context(|| format!("waiting for {id} to become ready"))?;
    Ok(())
}

/// Fetch the server together with its connection policy
async fn read_server(client: &Client, id: &SqlServerId) -> Result<(Server, ConnectionPolicy)> {
    let path = id.to_string();
    let policy_path = connection_policy_path(id);
    futures::try_join!(client.get(&path, API_VERSION), async {
        client
            .get(&policy_path, API_VERSION)
            .await
            .with_context(|| format!("retrieving the connection policy of {id}"))
    })
}

async fn write_server(
    client: &Client,
    id: &SqlServerId,
    state: &SqlServerState<'_>,
    timeout: Duration,
) -> Result<(Server, ConnectionPolicy)> {
    client
        .put::<_, Server>(&id.to_string(), API_VERSION, &state.expand(), Precondition::None)
        .await
        .map_err(|err| {
            if error_code(&err).is_some_and(|code| NAME_CONFLICT_CODES.contains(&code)) {
                err.context(NameNotAvailableError {
                    name: id.server_name.clone(),
                })
            } else {
                err
            }
        })?;
    wait_ready(client, id, timeout).await?;

    let policy = ConnectionPolicy {
        properties: Some(ConnectionPolicyProperties {
            connection_type: optional(&state.connection_policy),
        }),
    };
    client
        .put::<_, ConnectionPolicy>(
            &connection_policy_path(id),
            API_VERSION,
            &policy,
            Precondition::None,
        )
        .await
        .with_context(|| format!("updating the connection policy of {id}"))?;

    read_server(client, id).await
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<SqlServerId> {
    match SqlServerId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for SqlServerResource {
    type State<'a> = SqlServerState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let string = |description: &str, constraint| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        let flag = |description: &str| Attribute {
            attr_type: AttributeType::Bool,
            description: Description::plain(description),
            constraint: AttributeConstraint::OptionalComputed,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => string("Resource ID of the SQL server", AttributeConstraint::Computed),
                    "name" => string("Name of the SQL server, unique across Azure", AttributeConstraint::Required),
                    "resource_group_name" => string("Resource group of the SQL server", AttributeConstraint::Required),
                    "location" => string("Azure location of the SQL server", AttributeConstraint::Required),
                    "version" => string("Version of the server: `2.0` or `12.0`", AttributeConstraint::Required),
                    "administrator_login" => string("Login of the administrator", AttributeConstraint::Required),
                    "administrator_login_password" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Password of the administrator"),
                        constraint: AttributeConstraint::Required,
                        sensitive: true,
                        ..Default::default()
                    },
                    "minimum_tls_version" => string("Minimum TLS version of the connections: `1.0`, `1.1`, `1.2` or `Disabled` (default: `1.2`)", AttributeConstraint::OptionalComputed),
                    "public_network_access_enabled" => flag("Allow access from public networks (default: true)"),
                    "outbound_network_restriction_enabled" => flag("Restrict the outbound network access (default: false)"),
                    "connection_policy" => string("Connection policy: `Default`, `Proxy` or `Redirect` (default: `Default`)", AttributeConstraint::OptionalComputed),
                    "fully_qualified_domain_name" => string("Domain name of the server", AttributeConstraint::Computed),
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(Operation::ALL, &SERVER_TIMEOUTS),
                },
                description: Description::plain("Manages a Microsoft SQL logical server"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(diags, &config.name, AttributePath::new("name"), validate::sql_server_name);
        validate::string(
            diags,
            &config.resource_group_name,
            AttributePath::new("resource_group_name"),
            validate::resource_group_name,
        );
        validate::string(diags, &config.location, AttributePath::new("location"), |location| {
            validate::length(location, 1, 64)
        });
        validate::string(diags, &config.version, AttributePath::new("version"), |version| {
            validate::one_of(version, &["2.0", "12.0"])
        });
        validate::string(
            diags,
            &config.administrator_login,
            AttributePath::new("administrator_login"),
            |login| validate::length(login, 1, 128),
        );
        validate::string(
            diags,
            &config.administrator_login_password,
            AttributePath::new("administrator_login_password"),
            |password| validate::length(password, 8, 128),
        );
        validate::string(
            diags,
            &config.minimum_tls_version,
            AttributePath::new("minimum_tls_version"),
            |version| validate::one_of(version, &["1.0", "1.1", "1.2", "Disabled"]),
        );
        validate::string(
            diags,
            &config.connection_policy,
            AttributePath::new("connection_policy"),
            |policy| validate::one_of(policy, &["Default", "Proxy", "Redirect"]),
        );
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

        let timeout = state.timeouts.duration(Operation::Read, &SERVER_TIMEOUTS);
        match timeouts::run(Operation::Read, timeout, &id, read_server(&client, &id)).await {
            Ok((server, policy)) => Some((state.refreshed(&id, server, policy), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "SQL server was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving SQL server {id}")));
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
        let mut state = proposed_state.with_defaults();
        state.id = Value::Unknown;
        state.fully_qualified_domain_name = Value::Unknown;
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
        let mut state = proposed_state.with_defaults();

        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "name", &prior_state.name, &state.name);
        replace_if_changed(
            &mut replace,
            "resource_group_name",
            &prior_state.resource_group_name,
            &state.resource_group_name,
        );
        replace_if_changed(
            &mut replace,
            "administrator_login",
            &prior_state.administrator_login,
            &state.administrator_login,
        );
        match (prior_state.location.as_deref_option(), state.location.as_deref_option()) {
            (Some(prior), Some(proposed)) => {
                if normalize_location(prior) == normalize_location(proposed) {
                    state.location = prior_state.location.clone();
                } else {
                    replace.push(AttributePath::new("location"));
                }
            }
            _ => replace_if_changed(&mut replace, "location", &prior_state.location, &state.location),
        }

        if !replace.is_empty() {
            state.id = Value::Unknown;
            state.fully_qualified_domain_name = Value::Unknown;
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
        let id = planned_state.server_id(client.subscription_id());

        let timeout = planned_state.timeouts.duration(Operation::Create, &SERVER_TIMEOUTS);
        let created = timeouts::run(Operation::Create, timeout, &id, async {
            ensure_absent(&client, "mssql_server", &id).await?;
            write_server(&client, &id, &planned_state, timeout).await
        })
        .await;

        match created {
            Ok((server, policy)) => Some((
                planned_state.refreshed(&id, server, policy),
                planned_private_state,
            )),
            Err(err) => {
                report(diags, err.context(format!("creating SQL server {id}")));
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

        let timeout = planned_state.timeouts.duration(Operation::Update, &SERVER_TIMEOUTS);
        match timeouts::run(
            Operation::Update,
            timeout,
            &id,
            write_server(&client, &id, &planned_state, timeout),
        )
        .await
        {
            Ok((server, policy)) => Some((
                planned_state.refreshed(&id, server, policy),
                planned_private_state,
            )),
            Err(err) => {
                report(diags, err.context(format!("updating SQL server {id}")));
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

        let timeout = prior_state.timeouts.duration(Operation::Delete, &SERVER_TIMEOUTS);
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
                report(diags, err.context(format!("deleting SQL server {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match SqlServerId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            SqlServerState {
                id: owned(id.to_string()),
                name: owned(id.server_name),
                resource_group_name: owned(id.resource_group_name),
                ..Default::default()
            },
            Default::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_planned() {
        let state = SqlServerState::default().with_defaults();
        assert_eq!(state.minimum_tls_version.as_str(), "1.2");
        assert_eq!(state.public_network_access_enabled, Value::Value(true));
        assert_eq!(state.outbound_network_restriction_enabled, Value::Value(false));
        assert_eq!(state.connection_policy.as_str(), "Default");

        let configured = SqlServerState {
            minimum_tls_version: "1.0".into(),
            public_network_access_enabled: Value::Value(false),
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(configured.minimum_tls_version.as_str(), "1.0");
        assert_eq!(configured.public_network_access_enabled, Value::Value(false));
    }

    #[test]
    fn flags_are_sent_as_enabled_disabled() {
        let server = SqlServerState::default().with_defaults().expand();
        let properties = server.properties.unwrap();
        assert_eq!(properties.public_network_access.as_deref(), Some("Enabled"));
        assert_eq!(properties.restrict_outbound_network_access.as_deref(), Some("Disabled"));
        assert_eq!(properties.minimal_tls_version.as_deref(), Some("1.2"));
    }

    #[test]
    fn password_and_location_spelling_survive_refresh() {
        let id = SqlServerId::new("00000000-0000-0000-0000-000000000000", "rg", "sql-1");
        let prior = SqlServerState {
            location: "West Europe".into(),
            administrator_login_password: "s3cr3t-P4ssword".into(),
            ..Default::default()
        };
        let server = Server {
            location: Some("westeurope".to_owned()),
            properties: Some(ServerProperties {
                version: Some("12.0".to_owned()),
                public_network_access: Some("Disabled".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let state = prior.refreshed(&id, server, ConnectionPolicy::default());
        assert_eq!(state.location.as_str(), "West Europe");
        assert_eq!(state.administrator_login_password.as_str(), "s3cr3t-P4ssword");
        assert_eq!(state.public_network_access_enabled, Value::Value(false));
        assert_eq!(state.connection_policy.as_str(), "");
        assert!(state.tags.is_null());
    }

    #[test]
    fn name_conflict_message() {
        let err = NameNotAvailableError {
            name: "sql-1".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "the name \"sql-1\" used for the SQL Server needs to be globally unique and isn't available"
        );
    }
}
