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
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueBool, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use super::models::{ManagedInstance, ManagedInstanceProperties, Sku};
use super::{ensure_absent, API_VERSION, MANAGED_INSTANCE_TIMEOUTS};
use crate::client::{is_not_found, Client, Precondition, SharedClient};
use crate::ids::{ManagedInstanceId, SubnetId};
use crate::poll::StateChange;
use crate::tags::{self, Tags};
use crate::timeouts::{self, Operation, Timeouts, WithTimeouts};
use crate::utils::{keep_location_spelling, normalize_location, replace_if_changed, report};
use crate::validate;

const DEFAULT_COLLATION: &str = "SQL_Latin1_General_CP1_CI_AS";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_MINIMUM_TLS_VERSION: &str = "1.2";
const DEFAULT_PROXY_OVERRIDE: &str = "Default";
const DEFAULT_STORAGE_ACCOUNT_TYPE: &str = "GRS";

const SKU_NAMES: &[&str] = &[
    "GP_Gen4", "GP_Gen5", "GP_Gen8IM", "GP_Gen8IH", "BC_Gen4", "BC_Gen5", "BC_Gen8IM", "BC_Gen8IH",
];
const VCORES: &[i64] = &[4, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 128];

/// Storage account types of the configuration and their backup redundancy in the API
const STORAGE_ACCOUNT_TYPES: &[(&str, &str)] = &[
    ("GRS", "Geo"),
    ("LRS", "Local"),
    ("ZRS", "Zone"),
    ("GZRS", "GeoZone"),
];

#[derive(Debug, Default, Clone)]
pub struct ManagedInstanceResource {
    client: SharedClient,
}

impl ManagedInstanceResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManagedInstanceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub sku_name: ValueString<'a>,
    pub license_type: ValueString<'a>,
    pub vcores: ValueNumber,
    pub storage_size_in_gb: ValueNumber,
    pub storage_account_type: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub administrator_login: ValueString<'a>,
    pub administrator_login_password: ValueString<'a>,
    pub collation: ValueString<'a>,
    pub timezone_id: ValueString<'a>,
    pub minimum_tls_version: ValueString<'a>,
    pub public_data_endpoint_enabled: ValueBool,
    pub proxy_override: ValueString<'a>,
    pub zone_redundant_enabled: ValueBool,
    pub fqdn: ValueString<'a>,
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

fn borrowed_default<'a>(value: &mut ValueString<'a>, default: &'static str) {
    if value.is_null() {
        *value = Value::Value(Cow::Borrowed(default));
    }
}

/// `GP_Gen5` is sent as the `GeneralPurpose` tier of the `Gen5` family
fn expand_sku(name: &str) -> Sku {
    let (tier, family) = match name.split_once('_') {
        Some(("GP", family)) => (Some("GeneralPurpose"), Some(family)),
        Some(("BC", family)) => (Some("BusinessCritical"), Some(family)),
        Some((_, family)) => (None, Some(family)),
        None => (None, None),
    };
    Sku {
        name: Some(name.to_owned()),
        tier: tier.map(str::to_owned),
        family: family.map(str::to_owned),
    }
}

fn backup_redundancy(storage_account_type: &str) -> Option<&'static str> {
    STORAGE_ACCOUNT_TYPES
        .iter()
        .find(|(account_type, _)| account_type.eq_ignore_ascii_case(storage_account_type))
        .map(|(_, redundancy)| *redundancy)
}

fn storage_account_type(backup_redundancy: &str) -> Option<&'static str> {
    STORAGE_ACCOUNT_TYPES
        .iter()
        .find(|(_, redundancy)| redundancy.eq_ignore_ascii_case(backup_redundancy))
        .map(|(account_type, _)| *account_type)
}

impl<'a> ManagedInstanceState<'a> {
    fn managed_instance_id(&self, subscription_id: &str) -> ManagedInstanceId {
        ManagedInstanceId::new(
            subscription_id,
            self.resource_group_name.as_str(),
            self.name.as_str(),
        )
    }

    /// Fill the attributes that have a default value
    fn with_defaults(mut self) -> Self {
        borrowed_default(&mut self.collation, DEFAULT_COLLATION);
        borrowed_default(&mut self.timezone_id, DEFAULT_TIMEZONE);
        borrowed_default(&mut self.minimum_tls_version, DEFAULT_MINIMUM_TLS_VERSION);
        borrowed_default(&mut self.proxy_override, DEFAULT_PROXY_OVERRIDE);
        borrowed_default(&mut self.storage_account_type, DEFAULT_STORAGE_ACCOUNT_TYPE);
        if self.public_data_endpoint_enabled.is_null() {
            self.public_data_endpoint_enabled = Value::Value(false);
        }
        if self.zone_redundant_enabled.is_null() {
            self.zone_redundant_enabled = Value::Value(false);
        }
        self
    }

    fn expand(&self) -> ManagedInstance {
        ManagedInstance {
            location: optional(&self.location),
            tags: Some(tags::expand(&self.tags)),
            sku: self.sku_name.as_deref_option().map(expand_sku),
            properties: Some(ManagedInstanceProperties {
                administrator_login: optional(&self.administrator_login),
                administrator_login_password: optional(&self.administrator_login_password),
                license_type: optional(&self.license_type),
                subnet_id: optional(&self.subnet_id),
                v_cores: self.vcores.as_ref_option().copied(),
                storage_size_in_gb: self.storage_size_in_gb.as_ref_option().copied(),
                requested_backup_storage_redundancy: self
                    .storage_account_type
                    .as_deref_option()
                    .and_then(backup_redundancy)
                    .map(str::to_owned),
                collation: optional(&self.collation),
                timezone_id: optional(&self.timezone_id),
                minimal_tls_version: optional(&self.minimum_tls_version),
                public_data_endpoint_enabled: self.public_data_endpoint_enabled.as_ref_option().copied(),
                proxy_override: optional(&self.proxy_override),
                zone_redundant: self.zone_redundant_enabled.as_ref_option().copied(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn refreshed(&self, id: &ManagedInstanceId, instance: ManagedInstance) -> Self {
        let properties = instance.properties.unwrap_or_default();
        let location = instance.location.unwrap_or_default();
        let sku_name = instance.sku.and_then(|sku| sku.name).unwrap_or_default();
        let storage_account_type = properties
            .requested_backup_storage_redundancy
            .as_deref()
            .and_then(storage_account_type)
            .unwrap_or_default();
        // The API lowercases parts of the subnet id
        let subnet_id = match (properties.subnet_id, self.subnet_id.as_deref_option()) {
            (Some(remote), Some(prior)) if remote.eq_ignore_ascii_case(prior) => prior.to_owned(),
            (remote, _) => remote.unwrap_or_default(),
        };
        Self {
            id: owned(id.to_string()),
            name: owned(&id.managed_instance_name),
            resource_group_name: owned(&id.resource_group_name),
            location: owned(keep_location_spelling(&location, self.location.as_str())),
            sku_name: owned(sku_name),
            license_type: owned(properties.license_type.unwrap_or_default()),
            vcores: properties.v_cores.into(),
            storage_size_in_gb: properties.storage_size_in_gb.into(),
            storage_account_type: owned(storage_account_type),
            subnet_id: owned(subnet_id),
            administrator_login: owned(properties.administrator_login.unwrap_or_default()),
            administrator_login_password: self.administrator_login_password.clone(),
            collation: owned(properties.collation.unwrap_or_default()),
            timezone_id: owned(properties.timezone_id.unwrap_or_default()),
            minimum_tls_version: owned(properties.minimal_tls_version.unwrap_or_default()),
            public_data_endpoint_enabled: Value::Value(
                properties.public_data_endpoint_enabled.unwrap_or(false),
            ),
            proxy_override: owned(properties.proxy_override.unwrap_or_default()),
            zone_redundant_enabled: Value::Value(properties.zone_redundant.unwrap_or(false)),
            fqdn: owned(properties.fully_qualified_domain_name.unwrap_or_default()),
            tags: tags::flatten(instance.tags, &self.tags),
            timeouts: self.timeouts.clone(),
        }
    }
}

/// Wait until the managed instance reports `Ready`
async fn wait_ready(client: &Client, id: &ManagedInstanceId, timeout: Duration) -> Result<()> {
    let path = &id.to_string();
    StateChange::new(&["Creating", "Updating", "Provisioning", "Unknown"], &["Ready"], timeout)
        .with_poll_interval(client.poll_interval())
        .wait(move || async move {
            match client.get::<ManagedInstance>(path, API_VERSION).await {
                Ok(instance) => Ok(Some(
                    instance
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

async fn write_managed_instance(
    client: &Client,
    id: &ManagedInstanceId,
    state: &ManagedInstanceState<'_>,
    timeout: Duration,
) -> Result<ManagedInstance> {
    let path = id.to_string();
    client
        .put::<_, ManagedInstance>(&path, API_VERSION, &state.expand(), Precondition::None)
        .await?;
    wait_ready(client, id, timeout).await?;
    client.get(&path, API_VERSION).await
}

fn parse_id(diags: &mut Diagnostics, id: &ValueString) -> Option<ManagedInstanceId> {
    match ManagedInstanceId::parse(id.as_str()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid `id`", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

fn storage_size(size: i64) -> Result<(), String> {
    validate::range(size, 32, 16384)?;
    if size % 32 != 0 {
        return Err(format!("expected a multiple of 32, got {size}"));
    }
    Ok(())
}

#[async_trait]
impl Resource for ManagedInstanceResource {
    type State<'a> = ManagedInstanceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let attribute = |attr_type, description: &str, constraint| Attribute {
            attr_type,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        let string = |description: &str, constraint| attribute(AttributeType::String, description, constraint);
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => string("Resource ID of the managed instance", AttributeConstraint::Computed),
                    "name" => string("Name of the managed instance, unique across Azure", AttributeConstraint::Required),
                    "resource_group_name" => string("Resource group of the managed instance", AttributeConstraint::Required),
                    "location" => string("Azure location of the managed instance", AttributeConstraint::Required),
                    "sku_name" => string("SKU of the managed instance, eg: `GP_Gen5` or `BC_Gen5`", AttributeConstraint::Required),
                    "license_type" => string("License of the managed instance: `BasePrice` or `LicenseIncluded`", AttributeConstraint::Required),
                    "vcores" => attribute(AttributeType::Number, "Number of virtual cores", AttributeConstraint::Required),
                    "storage_size_in_gb" => attribute(AttributeType::Number, "Maximum storage size in GB, a multiple of 32", AttributeConstraint::Required),
                    "storage_account_type" => string("Storage of the backups: `GRS`, `LRS`, `ZRS` or `GZRS` (default: `GRS`)", AttributeConstraint::OptionalComputed),
                    "subnet_id" => string("Subnet the managed instance is deployed into", AttributeConstraint::Required),
                    "administrator_login" => string("Login of the administrator", AttributeConstraint::Required),
                    "administrator_login_password" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Password of the administrator"),
                        constraint: AttributeConstraint::Required,
                        sensitive: true,
                        ..Default::default()
                    },
                    "collation" => string("Collation of the managed instance (default: `SQL_Latin1_General_CP1_CI_AS`)", AttributeConstraint::OptionalComputed),
                    "timezone_id" => string("Time zone of the managed instance (default: `UTC`)", AttributeConstraint::OptionalComputed),
                    "minimum_tls_version" => string("Minimum TLS version of the connections: `1.0`, `1.1` or `1.2` (default: `1.2`)", AttributeConstraint::OptionalComputed),
                    "public_data_endpoint_enabled" => attribute(AttributeType::Bool, "Expose a public data endpoint (default: false)", AttributeConstraint::OptionalComputed),
                    "proxy_override" => string("Connection type: `Default`, `Proxy` or `Redirect` (default: `Default`)", AttributeConstraint::OptionalComputed),
                    "zone_redundant_enabled" => attribute(AttributeType::Bool, "Spread the managed instance across availability zones (default: false)", AttributeConstraint::OptionalComputed),
                    "fqdn" => string("Domain name of the managed instance", AttributeConstraint::Computed),
                    "tags" => tags::attribute(),
                },
                blocks: map! {
                    "timeouts" => timeouts::schema(Operation::ALL, &MANAGED_INSTANCE_TIMEOUTS),
                },
                description: Description::plain("Manages a Microsoft SQL managed instance"),
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
        validate::string(diags, &config.sku_name, AttributePath::new("sku_name"), |sku| {
            validate::one_of(sku, SKU_NAMES)
        });
        validate::string(
            diags,
            &config.license_type,
            AttributePath::new("license_type"),
            |license| validate::one_of(license, &["BasePrice", "LicenseIncluded"]),
        );
        validate::number(diags, &config.vcores, AttributePath::new("vcores"), |vcores| {
            if VCORES.contains(&vcores) {
                Ok(())
            } else {
                Err(format!("expected one of {VCORES:?}, got {vcores}"))
            }
        });
        validate::number(
            diags,
            &config.storage_size_in_gb,
            AttributePath::new("storage_size_in_gb"),
            storage_size,
        );
        validate::string(
            diags,
            &config.storage_account_type,
            AttributePath::new("storage_account_type"),
            |account_type| validate::one_of(account_type, &["GRS", "LRS", "ZRS", "GZRS"]),
        );
        validate::string(diags, &config.subnet_id, AttributePath::new("subnet_id"), |id| {
            SubnetId::parse_insensitively(id)
                .map(drop)
                .map_err(|err| err.to_string())
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
            |password| validate::length(password, 16, 128),
        );
        validate::string(
            diags,
            &config.minimum_tls_version,
            AttributePath::new("minimum_tls_version"),
            |version| validate::one_of(version, &["1.0", "1.1", "1.2"]),
        );
        validate::string(
            diags,
            &config.proxy_override,
            AttributePath::new("proxy_override"),
            |proxy| validate::one_of(proxy, &["Default", "Proxy", "Redirect"]),
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

        let timeout = state.timeouts.duration(Operation::Read, &MANAGED_INSTANCE_TIMEOUTS);
        let read = timeouts::run(
            Operation::Read,
            timeout,
            &id,
            client.get::<ManagedInstance>(&id.to_string(), API_VERSION),
        )
        .await;
        match read {
            Ok(instance) => Some((state.refreshed(&id, instance), private_state)),
            Err(err) if is_not_found(&err) => {
                tracing::info!(%id, "SQL managed instance was not found, removing from state");
                None
            }
            Err(err) => {
                report(diags, err.context(format!("retrieving SQL managed instance {id}")));
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
        replace_if_changed(&mut replace, "collation", &prior_state.collation, &state.collation);
        replace_if_changed(&mut replace, "timezone_id", &prior_state.timezone_id, &state.timezone_id);
        replace_if_changed(
            &mut replace,
            "storage_account_type",
            &prior_state.storage_account_type,
            &state.storage_account_type,
        );
        match (prior_state.subnet_id.as_deref_option(), state.subnet_id.as_deref_option()) {
            (Some(prior), Some(proposed)) if prior.eq_ignore_ascii_case(proposed) => {
                state.subnet_id = prior_state.subnet_id.clone();
            }
            _ => replace_if_changed(&mut replace, "subnet_id", &prior_state.subnet_id, &state.subnet_id),
        }
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
        let id = planned_state.managed_instance_id(client.subscription_id());

        let timeout = planned_state
            .timeouts
            .duration(Operation::Create, &MANAGED_INSTANCE_TIMEOUTS);
        let created = timeouts::run(Operation::Create, timeout, &id, async {
            ensure_absent(&client, "mssql_managed_instance", &id).await?;
            write_managed_instance(&client, &id, &planned_state, timeout).await
        })
        .await;

        match created {
            Ok(instance) => Some((planned_state.refreshed(&id, instance), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("creating SQL managed instance {id}")));
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

        let timeout = planned_state
            .timeouts
            .duration(Operation::Update, &MANAGED_INSTANCE_TIMEOUTS);
        match timeouts::run(
            Operation::Update,
            timeout,
            &id,
            write_managed_instance(&client, &id, &planned_state, timeout),
        )
        .await
        {
            Ok(instance) => Some((planned_state.refreshed(&id, instance), planned_private_state)),
            Err(err) => {
                report(diags, err.context(format!("updating SQL managed instance {id}")));
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

        let timeout = prior_state
            .timeouts
            .duration(Operation::Delete, &MANAGED_INSTANCE_TIMEOUTS);
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
                report(diags, err.context(format!("deleting SQL managed instance {id}")));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let id = match ManagedInstanceId::parse(&id) {
            Ok(id) => id,
            Err(err) => {
                diags.root_error("Invalid import ID", err.to_string());
                return None;
            }
        };
        Some((
            ManagedInstanceState {
                id: owned(id.to_string()),
                name: owned(id.managed_instance_name),
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
    fn sku_name_is_split_into_tier_and_family() {
        let sku = expand_sku("GP_Gen5");
        assert_eq!(sku.tier.as_deref(), Some("GeneralPurpose"));
        assert_eq!(sku.family.as_deref(), Some("Gen5"));

        let sku = expand_sku("BC_Gen8IM");
        assert_eq!(sku.tier.as_deref(), Some("BusinessCritical"));
        assert_eq!(sku.family.as_deref(), Some("Gen8IM"));
    }

    #[test]
    fn storage_account_type_maps_to_backup_redundancy() {
        let state = ManagedInstanceState {
            storage_account_type: "ZRS".into(),
            ..Default::default()
        };
        let properties = state.expand().properties.unwrap();
        assert_eq!(properties.requested_backup_storage_redundancy.as_deref(), Some("Zone"));
        assert_eq!(storage_account_type("Geo"), Some("GRS"));
        assert_eq!(storage_account_type("Unknown"), None);
    }

    #[test]
    fn defaults_are_planned() {
        let state = ManagedInstanceState::default().with_defaults();
        assert_eq!(state.collation.as_str(), DEFAULT_COLLATION);
        assert_eq!(state.timezone_id.as_str(), "UTC");
        assert_eq!(state.storage_account_type.as_str(), "GRS");
        assert_eq!(state.proxy_override.as_str(), "Default");
        assert_eq!(state.public_data_endpoint_enabled, Value::Value(false));
    }

    #[test]
    fn storage_size_is_a_multiple_of_32() {
        assert!(storage_size(32).is_ok());
        assert!(storage_size(16384).is_ok());
        assert!(storage_size(48).is_err());
        assert!(storage_size(0).is_err());
    }

    #[test]
    fn subnet_spelling_survives_refresh() {
        let id = ManagedInstanceId::new("0000", "rg", "mi-1");
        let subnet = "/subscriptions/0000/resourceGroups/RG/providers/Microsoft.Network/virtualNetworks/vnet/subnets/sql";
        let prior = ManagedInstanceState {
            subnet_id: subnet.into(),
            administrator_login_password: "a-very-long-P4ssword".into(),
            ..Default::default()
        };
        let instance = ManagedInstance {
            properties: Some(ManagedInstanceProperties {
                subnet_id: Some(subnet.to_lowercase()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let state = prior.refreshed(&id, instance);
        assert_eq!(state.subnet_id.as_str(), subnet);
        assert_eq!(state.administrator_login_password.as_str(), "a-very-long-P4ssword");
        assert_eq!(state.name.as_str(), "mi-1");
    }
}
