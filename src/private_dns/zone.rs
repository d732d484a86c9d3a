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
use tf_provider::value::{self, Value, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::PrivateZone;
use super::{API_VERSION, TIMEOUTS};
use crate::client::{is_not_found, is_precondition_failed, Client, Precondition, SharedClient};
use crate::ids::PrivateDnsZoneId;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report, AlreadyExistsError};
use crate::validate;

#[derive(Debug, Default, Clone)]
pub struct PrivateDnsZoneResource {
    client: SharedClient,
}

impl PrivateDnsZoneResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrivateDnsZoneState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub number_of_record_sets: ValueNumber,
    pub max_number_of_record_sets: ValueNumber,
    pub max_number_of_virtual_network_links: ValueNumber,
    pub max_number_of_virtual_network_links_with_registration: ValueNumber,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

impl<'a> PrivateDnsZoneState<'a> {
    fn unknown_computed(&mut self) {
        self.id = Value::Unknown;
        self.number_of_record_sets = Value::Unknown;
        self.max_number_of_record_sets = Value::Unknown;
        self.max_number_of_virtual_network_links = Value::Unknown;
        self.max_number_of_virtual_network_links_with_registration = Value::Unknown;
    }

    fn refreshed(&self, id: &PrivateDnsZoneId, zone: PrivateZone) -> Self {
        let properties = zone.properties.unwrap_or_default();
        let number = |value: Option<i64>| Value::Value(value.unwrap_or_default());
        Self {
            id: Value::Value(Cow::Owned(id.to_string())),
            name: Value::Value(Cow::Owned(id.private_dns_zone_name.clone())),
            resource_group_name: Value::Value(Cow::Owned(id.resource_group_name.clone())),
            number_of_record_sets: number(properties.number_of_record_sets),
            max_number_of_record_sets: number(properties.max_number_of_record_sets),
            max_number_of_virtual_network_links: number(
                properties.max_number_of_virtual_network_links,
            ),
            max_number_of_virtual_network_links_with_registration: number(
                properties.max_number_of_virtual_network_links_with_registration,
            ),
            tags: tags::flatten(zone.tags, &self.tags),
            timeouts: self.timeouts.clone(),
        }
    }
}

async fn write_zone(
    client: &Client,
    id: &PrivateDnsZoneId,
    state: &PrivateDnsZoneState<'_>,
    precondition: Precondition,
) -> anyhow::Result<PrivateZone> {
    let path = id.to_string();
    let body = PrivateZone {
        location: Some("global".to_owned()),
        tags: Some(tags::expand(&state.tags)),
        ..Default::default()
    };
    client
        .put::<_, PrivateZone>(&path, API_VERSION, &body, precondition)
        .await
        .map_err(|err| {
            if precondition == Precondition::IfNoneMatch && is_precondition_failed(&err) {
                AlreadyExistsError::new("private_dns_zone", id).into()
            } else {
                err
            }
        })?;
    client.get(&path, API_VERSION).await
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<PrivateDnsZoneId> {
    match PrivateDnsZoneId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for PrivateDnsZoneResource {
    type State<'a> = PrivateDnsZoneState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let computed_number = |description: &str| Attribute {
            attr_type: AttributeType::Number,
            description: Description::plain(description),
            constraint: AttributeConstraint::Computed,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource ID of the private DNS zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the private DNS zone"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "resource_group_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource group of the private DNS zone"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "number_of_record_sets" => computed_number("Current number of record sets in the zone"),
                    "max_number_of_record_sets" => computed_number("Maximum number of record sets in the zone"),
                    "max_number_of_virtual_network_links" => computed_number("Maximum number of virtual networks that can be linked to the zone"),
                    "max_number_of_virtual_network_links_with_registration" => computed_number("Maximum number of virtual networks that can be linked to the zone with registration enabled"),
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(Operation::ALL, &TIMEOUTS),
                },
                description: Description::plain("Manages a private DNS zone"),
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

        let timeout = state.timeouts.duration(Operation::Read, &TIMEOUTS);
        match timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<PrivateZone>(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(zone) => Some((state.refreshed(&id, zone), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "private DNS zone was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving private DNS zone {id}")));
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
        state.unknown_computed();
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
        replace_if_changed(
            &mut replace,
            "resource_group_name",
            &prior_state.resource_group_name,
            &state.resource_group_name,
        );
        if !replace.is_empty() {
            state.unknown_computed();
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
        let id = PrivateDnsZoneId::new(
            client.subscription_id(),
            planned_state.resource_group_name.as_str(),
            planned_state.name.as_str(),
        );

        let timeout = planned_state.timeouts.duration(Operation::Create, &TIMEOUTS);
        match timeouts::run(
            Operation::Create,
            timeout,
            &id,
            write_zone(&client, &id, &planned_state, Precondition::IfNoneMatch),
        )
        .await
        {
            Ok(zone) => Some((planned_state.refreshed(&id, zone), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating private DNS zone {id}")));
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

        let timeout = planned_state.timeouts.duration(Operation::Update, &TIMEOUTS);
        match timeouts::run(
            Operation::Update,
            timeout,
            &id,
            write_zone(&client, &id, &planned_state, Precondition::None),
        )
        .await
        {
            Ok(zone) => Some((planned_state.refreshed(&id, zone), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating private DNS zone {id}")));
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

        let timeout = prior_state.timeouts.duration(Operation::Delete, &TIMEOUTS);
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
                report(diags, err.context(format!("deleting private DNS zone {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match PrivateDnsZoneId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            PrivateDnsZoneState {
                id: Value::Value(Cow::Owned(id.to_string())),
                name: Value::Value(Cow::Owned(id.private_dns_zone_name)),
                resource_group_name: Value::Value(Cow::Owned(id.resource_group_name)),
                ..Default::default()
            },
            Default::default(),
        ))
    }
}
