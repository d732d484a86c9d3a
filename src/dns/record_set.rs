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
use std::marker::PhantomData;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{RecordSet, RecordSetProperties};
use super::records::RecordKind;
use super::{API_VERSION, TIMEOUTS};
use crate::client::{is_not_found, is_precondition_failed, Client, Precondition, SharedClient};
use crate::ids::RecordSetId;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report, AlreadyExistsError};
use crate::validate;

/// Record set of type `K` inside a public DNS zone
#[derive(Debug, Default, Clone)]
pub struct DnsRecordSetResource<K: RecordKind> {
    client: SharedClient,
    kind: PhantomData<K>,
}

impl<K: RecordKind> DnsRecordSetResource<K> {
    pub fn new(client: SharedClient) -> Self {
        Self {
            client,
            kind: PhantomData,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct RecordSetState<'a, K: RecordKind> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub zone_name: ValueString<'a>,
    pub ttl: ValueNumber,
    pub fqdn: ValueString<'a>,
    pub tags: Tags<'a>,
    #[serde(flatten)]
    pub records: K::Records,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn owned<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

impl<'a, K: RecordKind> RecordSetState<'a, K> {
    /// Identifier of the record set described by the configuration
    fn record_set_id(&self, subscription_id: &str) -> RecordSetId {
        RecordSetId {
            subscription_id: subscription_id.to_owned(),
            resource_group_name: self.resource_group_name.as_str().to_owned(),
            dns_zone_name: self.zone_name.as_str().to_owned(),
            record_type: K::RECORD_TYPE,
            name: self.name.as_str().to_owned(),
        }
    }

    fn properties(&self) -> RecordSetProperties {
        let mut properties = RecordSetProperties {
            ttl: self.ttl.as_ref_option().copied(),
            metadata: Some(tags::expand(&self.tags)),
            ..Default::default()
        };
        K::expand(&self.records, &mut properties);
        properties
    }

    /// State of the remote `record_set`, keeping the configured spelling from `self`
    fn refreshed(&self, id: &RecordSetId, record_set: RecordSet) -> Self {
        let properties = record_set.properties.unwrap_or_default();
        Self {
            id: owned(id.to_string()),
            name: owned(&id.name),
            resource_group_name: owned(&id.resource_group_name),
            zone_name: owned(&id.dns_zone_name),
            ttl: Value::Value(properties.ttl.unwrap_or_default()),
            fqdn: owned(properties.fqdn.clone().unwrap_or_default()),
            tags: tags::flatten(properties.metadata.clone(), &self.tags),
            records: K::flatten(&properties, &self.records),
            timeouts: self.timeouts.clone(),
        }
    }
}

impl<K: RecordKind> DnsRecordSetResource<K> {
    async fn write(
        client: &Client,
        id: &RecordSetId,
        state: &RecordSetState<'_, K>,
        precondition: Precondition,
    ) -> anyhow::Result<RecordSet> {
        let path = id.to_string();
        let body = RecordSet {
            properties: Some(state.properties()),
            ..Default::default()
        };
        client
            .put::<_, RecordSet>(&path, API_VERSION, &body, precondition)
            .await
            .map_err(|err| {
                if precondition == Precondition::IfNoneMatch && is_precondition_failed(&err) {
                    AlreadyExistsError::new(K::RESOURCE_NAME, id).into()
                } else {
                    err
                }
            })?;
        client
            .get(&path, API_VERSION)
            .await
            .with_context(|| format!("retrieving {} {id}", K::LABEL))
    }
}

/// Parse a stored id, accepting the legacy casings of older states
fn parse_id<K: RecordKind>(diags: &mut Diagnostics, id: &ValueString) -> Option<RecordSetId> {
    match RecordSetId::parse_insensitively(id.as_str(), K::RECORD_TYPE) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl<K: RecordKind> Resource for DnsRecordSetResource<K> {
    type State<'a> = RecordSetState<'a, K>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let mut attributes = map! {
            "id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(format!("Resource ID of the {}", K::LABEL)),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
            "name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(match K::DEFAULT_NAME {
                    Some(name) => format!("Name of the record set, relative to the zone (default: {name:?})"),
                    None => "Name of the record set, relative to the zone".to_owned(),
                }),
                constraint: if K::DEFAULT_NAME.is_some() {
                    AttributeConstraint::OptionalComputed
                } else {
                    AttributeConstraint::Required
                },
                ..Default::default()
            },
            "resource_group_name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Resource group of the DNS zone"),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "zone_name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Name of the DNS zone holding the record set"),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "ttl" => Attribute {
                attr_type: AttributeType::Number,
                description: Description::plain("Time To Live of the record set, in seconds"),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "fqdn" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Fully qualified domain name of the record set"),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
            "tags" => tags::attribute(),
        };
        attributes.extend(K::attributes());

        let mut blocks = K::blocks();
        blocks.insert(
            "timeouts".to_owned(),
            timeouts::schema(Operation::ALL, &TIMEOUTS),
        );

        Some(Schema {
            version: 1,
            block: Block {
                attributes,
                blocks,
                description: Description::plain(format!("Manages a {} within Azure DNS", K::LABEL)),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate::string(
            diags,
            &config.name,
            AttributePath::new("name"),
            validate::record_set_name,
        );
        validate::string(
            diags,
            &config.resource_group_name,
            AttributePath::new("resource_group_name"),
            validate::resource_group_name,
        );
        validate::string(
            diags,
            &config.zone_name,
            AttributePath::new("zone_name"),
            validate::dns_zone_name,
        );
        validate::number(diags, &config.ttl, AttributePath::new("ttl"), |ttl| {
            validate::range(ttl, 1, 2_147_483_647)
        });
        tags::validate(diags, &config.tags);
        K::validate(diags, &config.records);
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
        let (Some(client), Some(id)) = (self.client.get(diags), parse_id::<K>(diags, &state.id))
        else {
            return Some((state, private_state));
        };

        let timeout = state.timeouts.duration(Operation::Read, &TIMEOUTS);
        let record_set = timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<RecordSet>(&id.to_string(), API_VERSION),
        )
        .await;

        match record_set {
            Ok(record_set) => Some((state.refreshed(&id, record_set), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "{} was not found, removing from state", K::LABEL);
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving {} {id}", K::LABEL)));
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
        if let (Value::Null, Some(name)) = (&state.name, K::DEFAULT_NAME) {
            state.name = Value::Value(Cow::Borrowed(name));
        }
        state.id = Value::Unknown;
        state.fqdn = Value::Unknown;
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
        if let (Value::Null, Some(name)) = (&state.name, K::DEFAULT_NAME) {
            state.name = Value::Value(Cow::Borrowed(name));
        }

        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "name", &prior_state.name, &state.name);
        replace_if_changed(
            &mut replace,
            "resource_group_name",
            &prior_state.resource_group_name,
            &state.resource_group_name,
        );
        replace_if_changed(&mut replace, "zone_name", &prior_state.zone_name, &state.zone_name);

        if replace.is_empty() {
            state.id = prior_state.id;
            state.fqdn = prior_state.fqdn;
        } else {
            state.id = Value::Unknown;
            state.fqdn = Value::Unknown;
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
        let id = planned_state.record_set_id(client.subscription_id());

        let timeout = planned_state.timeouts.duration(Operation::Create, &TIMEOUTS);
        let record_set = timeouts::run(
            Operation::Create,
            timeout,
            &id,
            Self::write(&client, &id, &planned_state, Precondition::IfNoneMatch),
        )
        .await;

        match record_set {
            Ok(record_set) => Some((planned_state.refreshed(&id, record_set), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating {} {id}", K::LABEL)));
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
        let id = parse_id::<K>(diags, &prior_state.id)?;

        let timeout = planned_state.timeouts.duration(Operation::Update, &TIMEOUTS);
        let record_set = timeouts::run(
            Operation::Update,
            timeout,
            &id,
            Self::write(&client, &id, &planned_state, Precondition::None),
        )
        .await;

        match record_set {
            Ok(record_set) => Some((planned_state.refreshed(&id, record_set), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating {} {id}", K::LABEL)));
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
        let id = parse_id::<K>(diags, &prior_state.id)?;

        let timeout = prior_state.timeouts.duration(Operation::Delete, &TIMEOUTS);
        let deleted = timeouts::run(
            Operation::Delete,
            timeout,
            &id,
            client.delete(&id.to_string(), API_VERSION),
        )
        .await;

        match deleted {
            Ok(()) => Some(()),
            Err(err) if is_not_found(&err) => Some(()),
            Err(err) => {
                report(diags, err.context(format!("deleting {} {id}", K::LABEL)));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match RecordSetId::parse(&id, K::RECORD_TYPE) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };

        let state = RecordSetState {
            id: owned(id.to_string()),
            name: owned(id.name),
            resource_group_name: owned(id.resource_group_name),
            zone_name: owned(id.dns_zone_name),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
