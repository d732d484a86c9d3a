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

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{SubResource, VirtualNetworkLink, VirtualNetworkLinkProperties};
use super::{API_VERSION, TIMEOUTS};
use crate::client::{is_not_found, is_precondition_failed, Client, Precondition, SharedClient};
use crate::ids::{PrivateDnsZoneId, VirtualNetworkId, VirtualNetworkLinkId};
use crate::poll::{StateChange, NOT_FOUND};
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report, AlreadyExistsError};
use crate::validate;

/// Consecutive "not found" answers required before a deleted link is considered gone
const DELETED_OCCURRENCES: usize = 10;

#[derive(Debug, Default, Clone)]
pub struct VirtualNetworkLinkResource {
    client: SharedClient,
}

impl VirtualNetworkLinkResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VirtualNetworkLinkState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub private_dns_zone_name: ValueString<'a>,
    pub virtual_network_id: ValueString<'a>,
    pub registration_enabled: ValueBool,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn owned<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

impl<'a> VirtualNetworkLinkState<'a> {
    fn link_id(&self, subscription_id: &str) -> VirtualNetworkLinkId {
        PrivateDnsZoneId::new(
            subscription_id,
            self.resource_group_name.as_str(),
            self.private_dns_zone_name.as_str(),
        )
        .virtual_network_link(self.name.as_str())
    }

    fn expand(&self) -> VirtualNetworkLink {
        VirtualNetworkLink {
            location: Some("global".to_owned()),
            tags: Some(tags::expand(&self.tags)),
            properties: Some(VirtualNetworkLinkProperties {
                virtual_network: Some(SubResource {
                    id: self.virtual_network_id.as_deref_option().map(str::to_owned),
                }),
                registration_enabled: Some(self.registration_enabled.unwrap_or(false)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn refreshed(&self, id: &VirtualNetworkLinkId, link: VirtualNetworkLink) -> Self {
        let properties = link.properties.unwrap_or_default();
        let remote_network = properties
            .virtual_network
            .and_then(|network| network.id)
            .unwrap_or_default();
        let virtual_network_id = match self.virtual_network_id.as_deref_option() {
            Some(prior) if prior.eq_ignore_ascii_case(&remote_network) => owned(prior),
            _ => owned(remote_network),
        };
        Self {
            id: owned(id.to_string()),
            name: owned(&id.virtual_network_link_name),
            resource_group_name: owned(&id.resource_group_name),
            private_dns_zone_name: owned(&id.private_dns_zone_name),
            virtual_network_id,
            registration_enabled: Value::Value(properties.registration_enabled.unwrap_or_default()),
            tags: tags::flatten(link.tags, &self.tags),
            timeouts: self.timeouts.clone(),
        }
    }
}

async fn write_link(
    client: &Client,
    id: &VirtualNetworkLinkId,
    state: &VirtualNetworkLinkState<'_>,
    precondition: Precondition,
) -> anyhow::Result<VirtualNetworkLink> {
    let path = id.to_string();
    client
        .put::<_, VirtualNetworkLink>(&path, API_VERSION, &state.expand(), precondition)
        .await
        .map_err(|err| {
            if precondition == Precondition::IfNoneMatch && is_precondition_failed(&err) {
                AlreadyExistsError::new("private_dns_zone_virtual_network_link", id).into()
            } else {
                err
            }
        })?;
    client.get(&path, API_VERSION).await
}

/// Delete the link, then wait until it is consistently reported missing
async fn delete_link(
    client: &Client,
    id: &VirtualNetworkLinkId,
    timeout: std::time::Duration,
) -> anyhow::Result<()> {
    let path = id.to_string();
    match client.delete(&path, API_VERSION).await {
        Err(err) if is_not_found(&err) => return Ok(()),
        result => result?,
    }

    tracing::debug!(zone = %id.private_dns_zone(), link = %id.virtual_network_link_name, "waiting for the link to disappear");
    let path = &path;
    StateChange::new(&["Pending"], &[NOT_FOUND], timeout)
        .with_poll_interval(client.poll_interval())
        .with_continuous_target_occurrence(DELETED_OCCURRENCES)
        .wait(move || async move {
            match client.get::<VirtualNetworkLink>(path, API_VERSION).await {
                Ok(_) => Ok(Some("Pending".to_owned())),
                Err(err) if is_not_found(&err) => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
        .with_context(|| format!("waiting for the deletion of {id}"))?;
    Ok(())
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<VirtualNetworkLinkId> {
    match VirtualNetworkLinkId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for VirtualNetworkLinkResource {
    type State<'a> = VirtualNetworkLinkState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let required = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource ID of the link"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => required("Name of the link"),
                    "resource_group_name" => required("Resource group of the private DNS zone"),
                    "private_dns_zone_name" => required("Name of the private DNS zone to link"),
                    "virtual_network_id" => required("Resource ID of the virtual network to link"),
                    "registration_enabled" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Register the virtual machines of the network in the zone (default: false)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(Operation::ALL, &TIMEOUTS),
                },
                description: Description::plain("Links a private DNS zone to a virtual network"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(diags, &config.name, AttributePath::new("name"), validate::child_name);
        validate::string(
            diags,
            &config.resource_group_name,
            AttributePath::new("resource_group_name"),
            validate::resource_group_name,
        );
        validate::string(
            diags,
            &config.private_dns_zone_name,
            AttributePath::new("private_dns_zone_name"),
            validate::dns_zone_name,
        );
        validate::string(
            diags,
            &config.virtual_network_id,
            AttributePath::new("virtual_network_id"),
            |id| VirtualNetworkId::parse_insensitively(id).map(drop).map_err(|err| err.to_string()),
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
            client.get::<VirtualNetworkLink>(&id.to_string(), API_VERSION),
        )
        .await
        {
            Ok(link) => Some((state.refreshed(&id, link), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "virtual network link was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving virtual network link {id}")));
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
        if state.registration_enabled.is_null() {
            state.registration_enabled = Value::Value(false);
        }
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
        if state.registration_enabled.is_null() {
            state.registration_enabled = Value::Value(false);
        }

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
            "private_dns_zone_name",
            &prior_state.private_dns_zone_name,
            &state.private_dns_zone_name,
        );
        let same_network = match (
            prior_state.virtual_network_id.as_deref_option(),
            state.virtual_network_id.as_deref_option(),
        ) {
            (Some(prior), Some(proposed)) => prior.eq_ignore_ascii_case(proposed),
            _ => prior_state.virtual_network_id == state.virtual_network_id,
        };
        if !same_network {
            replace.push(AttributePath::new("virtual_network_id"));
        }

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
        let id = planned_state.link_id(client.subscription_id());

        let timeout = planned_state.timeouts.duration(Operation::Create, &TIMEOUTS);
        match timeouts::run(
            Operation::Create,
            timeout,
            &id,
            write_link(&client, &id, &planned_state, Precondition::IfNoneMatch),
        )
        .await
        {
            Ok(link) => Some((planned_state.refreshed(&id, link), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating virtual network link {id}")));
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
            write_link(&client, &id, &planned_state, Precondition::None),
        )
        .await
        {
            Ok(link) => Some((planned_state.refreshed(&id, link), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating virtual network link {id}")));
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
            delete_link(&client, &id, timeout),
        )
        .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(diags, err.context(format!("deleting virtual network link {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match VirtualNetworkLinkId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            VirtualNetworkLinkState {
                id: owned(id.to_string()),
                name: owned(id.virtual_network_link_name),
                resource_group_name: owned(id.resource_group_name),
                private_dns_zone_name: owned(id.private_dns_zone_name),
                ..Default::default()
            },
            Default::default(),
        ))
    }
}
