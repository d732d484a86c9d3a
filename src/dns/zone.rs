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

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{RecordSet, RecordSetProperties, SoaRecord, Zone};
use super::{API_VERSION, TIMEOUTS};
use crate::client::{is_not_found, is_precondition_failed, Client, Precondition, SharedClient};
use crate::ids::{DnsZoneId, RecordType};
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{replace_if_changed, report, AlreadyExistsError, WithNormalize};
use crate::validate;

/// Name of the SOA record set of every zone
const SOA_NAME: &str = "@";

const DEFAULT_SOA_TTL: i64 = 3600;
const DEFAULT_EXPIRE_TIME: i64 = 2_419_200;
const DEFAULT_MINIMUM_TTL: i64 = 300;
const DEFAULT_REFRESH_TIME: i64 = 3600;
const DEFAULT_RETRY_TIME: i64 = 300;
const DEFAULT_SERIAL_NUMBER: i64 = 1;

#[derive(Debug, Default, Clone)]
pub struct DnsZoneResource {
    client: SharedClient,
}

impl DnsZoneResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SoaRecordState<'a> {
    #[serde(borrow = "'a")]
    pub email: ValueString<'a>,
    pub host_name: ValueString<'a>,
    pub expire_time: ValueNumber,
    pub minimum_ttl: ValueNumber,
    pub refresh_time: ValueNumber,
    pub retry_time: ValueNumber,
    pub serial_number: ValueNumber,
    pub ttl: ValueNumber,
    pub tags: Tags<'a>,
    pub fqdn: ValueString<'a>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsZoneState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub number_of_record_sets: ValueNumber,
    pub max_number_of_record_sets: ValueNumber,
    pub name_servers: ValueSet<ValueString<'a>>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub soa_record: Value<SoaRecordState<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn owned<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

fn or_default(value: &mut ValueNumber, default: i64) {
    if value.is_null() {
        *value = Value::Value(default);
    }
}

impl WithNormalize for SoaRecordState<'_> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        or_default(&mut self.ttl, DEFAULT_SOA_TTL);
        or_default(&mut self.expire_time, DEFAULT_EXPIRE_TIME);
        or_default(&mut self.minimum_ttl, DEFAULT_MINIMUM_TTL);
        or_default(&mut self.refresh_time, DEFAULT_REFRESH_TIME);
        or_default(&mut self.retry_time, DEFAULT_RETRY_TIME);
        or_default(&mut self.serial_number, DEFAULT_SERIAL_NUMBER);
    }
}

impl<'a> SoaRecordState<'a> {
    /// SOA record set to send, `host` being the one already assigned by Azure
    fn expand(&self, host: Option<String>) -> RecordSet {
        RecordSet {
            properties: Some(RecordSetProperties {
                ttl: self.ttl.as_ref_option().copied(),
                metadata: Some(tags::expand(&self.tags)),
                soa_record: Some(SoaRecord {
                    host,
                    email: self.email.as_deref_option().map(str::to_owned),
                    serial_number: self.serial_number.as_ref_option().copied(),
                    refresh_time: self.refresh_time.as_ref_option().copied(),
                    retry_time: self.retry_time.as_ref_option().copied(),
                    expire_time: self.expire_time.as_ref_option().copied(),
                    minimum_ttl: self.minimum_ttl.as_ref_option().copied(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn flatten(record_set: RecordSet, prior: &Self) -> Self {
        let properties = record_set.properties.unwrap_or_default();
        let soa = properties.soa_record.unwrap_or_default();
        Self {
            email: owned(soa.email.unwrap_or_default()),
            host_name: owned(soa.host.unwrap_or_default()),
            expire_time: Value::Value(soa.expire_time.unwrap_or_default()),
            minimum_ttl: Value::Value(soa.minimum_ttl.unwrap_or_default()),
            refresh_time: Value::Value(soa.refresh_time.unwrap_or_default()),
            retry_time: Value::Value(soa.retry_time.unwrap_or_default()),
            serial_number: Value::Value(soa.serial_number.unwrap_or_default()),
            ttl: Value::Value(properties.ttl.unwrap_or_default()),
            tags: tags::flatten(properties.metadata, &prior.tags),
            fqdn: owned(properties.fqdn.unwrap_or_default()),
        }
    }
}

impl<'a> DnsZoneState<'a> {
    fn zone_id(&self, subscription_id: &str) -> DnsZoneId {
        DnsZoneId::new(
            subscription_id,
            self.resource_group_name.as_str(),
            self.name.as_str(),
        )
    }

    fn refreshed(&self, id: &DnsZoneId, zone: Zone) -> Self {
        let properties = zone.properties.unwrap_or_default();
        Self {
            id: owned(id.to_string()),
            name: owned(&id.dns_zone_name),
            resource_group_name: owned(&id.resource_group_name),
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
            tags: tags::flatten(zone.tags, &self.tags),
            soa_record: self.soa_record.clone(),
            timeouts: self.timeouts.clone(),
        }
    }
}

/// Create or replace the zone, then its SOA record when it is managed
async fn write_zone(
    client: &Client,
    id: &DnsZoneId,
    state: &DnsZoneState<'_>,
    precondition: Precondition,
) -> Result<()> {
    let path = id.to_string();
    let body = Zone {
        location: Some("global".to_owned()),
        tags: Some(tags::expand(&state.tags)),
        ..Default::default()
    };
    client
        .put::<_, Zone>(&path, API_VERSION, &body, precondition)
        .await
        .map_err(|err| {
            if precondition == Precondition::IfNoneMatch && is_precondition_failed(&err) {
                AlreadyExistsError::new("dns_zone", id).into()
            } else {
                err
            }
        })?;

    if let Value::Value(soa) = &state.soa_record {
        let soa_path = id.record_set(RecordType::Soa, SOA_NAME).to_string();
        let existing: RecordSet = client
            .get(&soa_path, API_VERSION)
            .await
            .with_context(|| format!("retrieving the SOA record of {id}"))?;
        let host = existing
            .properties
            .and_then(|properties| properties.soa_record)
            .and_then(|soa| soa.host);
        client
            .put::<_, RecordSet>(&soa_path, API_VERSION, &soa.expand(host), Precondition::None)
            .await
            .with_context(|| format!("updating the SOA record of {id}"))?;
    }
    Ok(())
}

/// Fetch the zone and, when it is managed, its SOA record
async fn read_zone<'a>(
    client: &Client,
    diags: &mut Diagnostics,
    id: &DnsZoneId,
    prior: &DnsZoneState<'a>,
) -> Result<DnsZoneState<'a>> {
    let zone: Zone = client.get(&id.to_string(), API_VERSION).await?;
    let mut state = prior.refreshed(id, zone);

    if let Value::Value(prior_soa) = &prior.soa_record {
        let soa_path = id.record_set(RecordType::Soa, SOA_NAME).to_string();
        match client.get::<RecordSet>(&soa_path, API_VERSION).await {
            Ok(record_set) => {
                state.soa_record = Value::Value(SoaRecordState::flatten(record_set, prior_soa));
            }
            Err(err) => diags.root_warning(
                format!("Could not retrieve the SOA record of {id}"),
                format!("{err:#}"),
            ),
        }
    }
    Ok(state)
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<DnsZoneId> {
    match DnsZoneId::parse_insensitively(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

fn plan_soa(state: &mut DnsZoneState, prior: Option<&SoaRecordState>, diags: &mut Diagnostics) {
    if let Value::Value(soa) = &mut state.soa_record {
        soa.normalize(diags);
        match prior {
            Some(prior) => {
                soa.host_name = prior.host_name.clone().extend();
                soa.fqdn = prior.fqdn.clone().extend();
            }
            None => {
                soa.host_name = Value::Unknown;
                soa.fqdn = Value::Unknown;
            }
        }
    }
}

#[async_trait]
impl Resource for DnsZoneResource {
    type State<'a> = DnsZoneState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let number = |description: &str, constraint| Attribute {
            attr_type: AttributeType::Number,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource ID of the DNS zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the DNS zone, eg: `example.com`"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "resource_group_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Resource group of the DNS zone"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "number_of_record_sets" => number("Current number of record sets in the zone", AttributeConstraint::Computed),
                    "max_number_of_record_sets" => number("Maximum number of record sets in the zone", AttributeConstraint::Computed),
                    "name_servers" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Name servers of the zone"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "soa_record" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "email" => Attribute {
                                attr_type: AttributeType::String,
                                description: Description::plain("Email contact of the zone"),
                                constraint: AttributeConstraint::Required,
                                ..Default::default()
                            },
                            "host_name" => Attribute {
                                attr_type: AttributeType::String,
                                description: Description::plain("Domain name of the authoritative name server, assigned by Azure"),
                                constraint: AttributeConstraint::Computed,
                                ..Default::default()
                            },
                            "expire_time" => number("Expire time of the zone, in seconds (default: 2419200)", AttributeConstraint::OptionalComputed),
                            "minimum_ttl" => number("Minimum TTL of the zone, in seconds (default: 300)", AttributeConstraint::OptionalComputed),
                            "refresh_time" => number("Refresh time of the zone, in seconds (default: 3600)", AttributeConstraint::OptionalComputed),
                            "retry_time" => number("Retry time of the zone, in seconds (default: 300)", AttributeConstraint::OptionalComputed),
                            "serial_number" => number("Serial number of the zone (default: 1)", AttributeConstraint::OptionalComputed),
                            "ttl" => number("Time To Live of the SOA record, in seconds (default: 3600)", AttributeConstraint::OptionalComputed),
                            "tags" => tags::attribute(),
                            "fqdn" => Attribute {
                                attr_type: AttributeType::String,
                                description: Description::plain("Fully qualified domain name of the SOA record"),
                                constraint: AttributeConstraint::Computed,
                                ..Default::default()
                            },
                        },
                        description: Description::plain("Start Of Authority record of the zone"),
                        ..Default::default()
                    }),
                    "timeouts" => timeouts::schema(Operation::ALL, &TIMEOUTS),
                },
                description: Description::plain("Manages a public DNS zone"),
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

        if let Value::Value(soa) = &config.soa_record {
            let path = |name: &'static str| AttributePath::new("soa_record").index(0).attribute(name);
            validate::string(diags, &soa.email, path("email"), |email| {
                validate::length(email, 1, 253)
            });
            for (name, value) in [
                ("expire_time", &soa.expire_time),
                ("minimum_ttl", &soa.minimum_ttl),
                ("refresh_time", &soa.refresh_time),
                ("retry_time", &soa.retry_time),
                ("serial_number", &soa.serial_number),
                ("ttl", &soa.ttl),
            ] {
                validate::number(diags, value, path(name), |value| {
                    validate::range(value, 0, 2_147_483_647)
                });
            }
        }
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
        let mut warnings = Diagnostics::default();
        let zone = timeouts::run(
            Operation::Read,
            timeout,
            &id,
            read_zone(&client, &mut warnings, &id, &state),
        )
        .await;
        diags.add_diagnostics(warnings);

        match zone {
            Ok(zone) => Some((zone, private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "DNS zone was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving DNS zone {id}")));
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.number_of_record_sets = Value::Unknown;
        state.max_number_of_record_sets = Value::Unknown;
        state.name_servers = Value::Unknown;
        plan_soa(&mut state, None, diags);
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
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

        if replace.is_empty() {
            plan_soa(&mut state, prior_state.soa_record.as_ref_option(), diags);
        } else {
            state.id = Value::Unknown;
            state.number_of_record_sets = Value::Unknown;
            state.max_number_of_record_sets = Value::Unknown;
            state.name_servers = Value::Unknown;
            plan_soa(&mut state, None, diags);
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
        let id = planned_state.zone_id(client.subscription_id());

        let timeout = planned_state.timeouts.duration(Operation::Create, &TIMEOUTS);
        let mut warnings = Diagnostics::default();
        let zone = timeouts::run(Operation::Create, timeout, &id, async {
            write_zone(&client, &id, &planned_state, Precondition::IfNoneMatch).await?;
            read_zone(&client, &mut warnings, &id, &planned_state).await
        })
        .await;
        diags.add_diagnostics(warnings);

        match zone {
            Ok(zone) => Some((zone, planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating DNS zone {id}")));
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
        let mut warnings = Diagnostics::default();
        let zone = timeouts::run(Operation::Update, timeout, &id, async {
            write_zone(&client, &id, &planned_state, Precondition::None).await?;
            read_zone(&client, &mut warnings, &id, &planned_state).await
        })
        .await;
        diags.add_diagnostics(warnings);

        match zone {
            Ok(zone) => Some((zone, planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating DNS zone {id}")));
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
                report(diags, err.context(format!("deleting DNS zone {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match DnsZoneId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        let state = DnsZoneState {
            id: owned(id.to_string()),
            name: owned(id.dns_zone_name),
            resource_group_name: owned(id.resource_group_name),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soa_defaults_fill_only_unset_values() {
        let mut soa = SoaRecordState {
            email: "hostmaster.example.com".into(),
            ttl: Value::Value(60),
            ..Default::default()
        };
        soa.normalize(&mut Diagnostics::default());

        assert_eq!(soa.ttl, Value::Value(60));
        assert_eq!(soa.expire_time, Value::Value(2_419_200));
        assert_eq!(soa.minimum_ttl, Value::Value(300));
        assert_eq!(soa.refresh_time, Value::Value(3600));
        assert_eq!(soa.retry_time, Value::Value(300));
        assert_eq!(soa.serial_number, Value::Value(1));
    }

    #[test]
    fn soa_keeps_null_tags() {
        let soa = SoaRecordState::flatten(
            RecordSet {
                properties: Some(RecordSetProperties {
                    ttl: Some(3600),
                    soa_record: Some(SoaRecord {
                        host: Some("ns1-01.azure-dns.com.".to_owned()),
                        email: Some("azuredns-hostmaster.microsoft.com".to_owned()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            &Default::default(),
        );
        assert!(soa.tags.is_null());
        assert_eq!(soa.host_name.as_str(), "ns1-01.azure-dns.com.");
        assert_eq!(soa.serial_number, Value::Value(0));
    }

    #[test]
    fn zone_flatten_of_empty_answer() {
        let id = DnsZoneId::new("00000000-0000-0000-0000-000000000000", "rg", "example.com");
        let state = DnsZoneState::default().refreshed(&id, Zone::default());
        assert_eq!(state.id.as_str(), id.to_string());
        assert_eq!(state.number_of_record_sets, Value::Value(0));
        assert_eq!(state.name_servers, Value::Value(Default::default()));
        assert!(state.tags.is_null());
    }
}
