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

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};

use super::models::Zone;
use super::{API_VERSION, TIMEOUTS};
use crate::client::{is_not_found, Client, SharedClient};
use crate::ids::DnsZoneId;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, ReadTimeouts, WithTimeouts};
use crate::utils::report;
use crate::validate;

/// Look up an existing public DNS zone
#[derive(Debug, Default, Clone)]
pub struct DnsZoneDataSource {
    client: SharedClient,
}

impl DnsZoneDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsZoneDataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub number_of_record_sets: ValueNumber,
    pub max_number_of_record_sets: ValueNumber,
    pub name_servers: ValueSet<ValueString<'a>>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<ReadTimeouts<'a>>,
}

/// Find the zone named `name`, in `resource_group` or anywhere in the subscription
async fn find_zone(
    client: &Client,
    name: &str,
    resource_group: Option<&str>,
) -> Result<(DnsZoneId, Zone)> {
    if let Some(resource_group) = resource_group {
        let id = DnsZoneId::new(client.subscription_id(), resource_group, name);
        let zone = client.get(&id.to_string(), API_VERSION).await?;
        return Ok((id, zone));
    }

    let path = format!(
        "/subscriptions/{}/providers/Microsoft.Network/dnszones",
        client.subscription_id()
    );
    let zones: Vec<Zone> = client
        .list(&path, API_VERSION)
        .await
        .with_context(|| format!("listing DNS zones of subscription {}", client.subscription_id()))?;

    let mut matching = zones
        .into_iter()
        .filter(|zone| {
            zone.name
                .as_deref()
                .is_some_and(|zone_name| zone_name.eq_ignore_ascii_case(name))
        });
    match (matching.next(), matching.next()) {
        (Some(zone), None) => {
            let raw_id = zone.id.as_deref().unwrap_or_default();
            let id = DnsZoneId::parse_insensitively(raw_id)?;
            Ok((id, zone))
        }
        (None, _) => Err(anyhow!("no DNS zone named {name:?} was found")),
        (Some(_), Some(_)) => Err(anyhow!(
            "more than one DNS zone named {name:?} was found, please specify `resource_group_name`"
        )),
    }
}

#[async_trait]
impl DataSource for DnsZoneDataSource {
    type State<'a> = DnsZoneDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource ID of the DNS zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the DNS zone"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "resource_group_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource group of the DNS zone, searched in the whole subscription when not set"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "number_of_record_sets" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Current number of record sets in the zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "max_number_of_record_sets" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Maximum number of record sets in the zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name_servers" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Name servers of the zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "tags" => tags::computed_attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(&[Operation::Read], &TIMEOUTS),
                },
                description: Description::plain("Gets information about an existing public DNS zone"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(
            diags,
            &config.name,
            AttributePath::new("name"),
            validate::dns_zone_name,
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
        let name = config.name.as_str();
        let resource_group = config.resource_group_name.as_deref_option();

        let timeout = config.timeouts.duration(Operation::Read, &TIMEOUTS);
        let found = timeouts::run(
            Operation::Read,
            timeout,
            format!("DNS zone {name:?}"),
            find_zone(&client, name, resource_group),
        )
        .await;

        let (id, zone) = match found {
            Ok(found) => found,
            Err(err) if is_not_found(&err) => {
                diags.root_error(
                    format!("DNS zone {name:?} was not found"),
                    format!("{err:#}"),
                );
                return None;
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving DNS zone {name:?}")));
                return None;
            }
        };

        let properties = zone.properties.unwrap_or_default();
        let owned = |value: String| Value::Value(Cow::Owned(value));
        Some(DnsZoneDataSourceState {
            id: owned(id.to_string()),
            name: owned(id.dns_zone_name),
            resource_group_name: owned(id.resource_group_name),
            number_of_record_sets: Value::Value(properties.number_of_record_sets.unwrap_or_default()),
            max_number_of_record_sets: Value::Value(
                properties.max_number_of_record_sets.unwrap_or_default(),
            ),
            name_servers: Value::Value(
                properties
                    .name_servers
                    .unwrap_or_default()
                    .into_iter()
                    .map(owned)
                    .collect(),
            ),
            tags: tags::flatten(zone.tags, &Value::Value(Default::default())),
            timeouts: config.timeouts.clone(),
        })
    }
}
