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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};

use super::models::Server;
use super::{API_VERSION, SERVER_TIMEOUTS};
use crate::client::{is_not_found, SharedClient};
use crate::ids::SqlServerId;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, ReadTimeouts, WithTimeouts};
use crate::utils::report;
use crate::validate;

/// Look up an existing SQL server
#[derive(Debug, Default, Clone)]
pub struct SqlServerDataSource {
    client: SharedClient,
}

impl SqlServerDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SqlServerDataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub version: ValueString<'a>,
    pub administrator_login: ValueString<'a>,
    pub fully_qualified_domain_name: ValueString<'a>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<ReadTimeouts<'a>>,
}

impl<'a> SqlServerDataSourceState<'a> {
    fn found(self, id: &SqlServerId, server: Server) -> Self {
        let owned = |value: String| Value::Value(Cow::Owned(value));
        let properties = server.properties.unwrap_or_default();
        Self {
            id: owned(id.to_string()),
            location: server.location.map(Cow::Owned).into(),
            version: properties.version.map(Cow::Owned).into(),
            administrator_login: properties.administrator_login.map(Cow::Owned).into(),
            fully_qualified_domain_name: properties
                .fully_qualified_domain_name
                .map(Cow::Owned)
                .into(),
            tags: tags::flatten(server.tags, &Value::Value(Default::default())),
            ..self
        }
    }
}

#[async_trait]
impl DataSource for SqlServerDataSource {
    type State<'a> = SqlServerDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let computed = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Computed,
            ..Default::default()
        };
        let required = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed("Resource ID of the SQL server"),
                    "name" => required("Name of the SQL server"),
                    "resource_group_name" => required("Resource group of the SQL server"),
                    "location" => computed("Location of the SQL server"),
                    "version" => computed("Version of the SQL server"),
                    "administrator_login" => computed("Administrator login of the SQL server"),
                    "fully_qualified_domain_name" => computed("Fully qualified domain name of the SQL server"),
                    "tags" => tags::computed_attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(&[Operation::Read], &SERVER_TIMEOUTS),
                },
                description: Description::plain("Gets information about an existing SQL server"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(
            diags,
            &config.name,
            AttributePath::new("name"),
            validate::sql_server_name,
        );
        validate::string(
            diags,
            &config.resource_group_name,
            AttributePath::new("resource_group_name"),
            validate::resource_group_name,
        );
        config.timeouts.validate(diags, &[Operation::Read]);

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.client.get(diags)?;
        let id = SqlServerId::new(
            client.subscription_id(),
            config.resource_group_name.as_str(),
            config.name.as_str(),
        );

        let timeout = config.timeouts.duration(Operation::Read, &SERVER_TIMEOUTS);
        match timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<Server>(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(server) => Some(config.found(&id, server)),
            Err(err) if is_not_found(&err) => {
                diags.root_error(
                    format!("SQL server {:?} was not found", id.server_name),
                    format!("{err:#}"),
                );
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving SQL server {id}")));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::mssql::ServerProperties;

    #[test]
    fn found_fills_computed_values() {
        let config = SqlServerDataSourceState {
            name: "sql".into(),
            resource_group_name: "rg".into(),
            ..Default::default()
        };
        let id = SqlServerId::new("00000000-0000-0000-0000-000000000000", "rg", "sql");
        let server = Server {
            location: Some("westeurope".to_owned()),
            tags: Some(BTreeMap::from([("env".to_owned(), "test".to_owned())])),
            properties: Some(ServerProperties {
                version: Some("12.0".to_owned()),
                fully_qualified_domain_name: Some("sql.database.windows.net".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let state = config.found(&id, server);
        assert_eq!(state.id.as_str(), id.to_string());
        assert_eq!(state.name.as_str(), "sql");
        assert_eq!(state.version.as_str(), "12.0");
        assert!(state.administrator_login.is_null());
        assert_eq!(state.fully_qualified_domain_name.as_str(), "sql.database.windows.net");
        assert_eq!(state.tags.unwrap().len(), 1);
    }
}
