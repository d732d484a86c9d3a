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

//! Provider block and its `ARM_*` environment fallbacks

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};
use url::Url;

use crate::validate;

/// `provider "azurerm"` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub subscription_id: ValueString<'a>,
    pub tenant_id: ValueString<'a>,
    pub client_id: ValueString<'a>,
    pub client_secret: ValueString<'a>,
    pub environment: ValueString<'a>,
    pub resource_manager_endpoint: ValueString<'a>,
}

/// Azure cloud the provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Public,
    UsGovernment,
    China,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown environment {0:?}, expected one of `public`, `usgovernment` or `china`")]
pub struct UnknownEnvironment(pub String);

impl Environment {
    pub const NAMES: &'static [&'static str] = &["public", "usgovernment", "china"];

    pub fn resource_manager(self) -> &'static str {
        match self {
            Environment::Public => "https://management.azure.com/",
            Environment::UsGovernment => "https://management.usgovcloudapi.net/",
            Environment::China => "https://management.chinacloudapi.cn/",
        }
    }

    pub fn authority(self) -> &'static str {
        match self {
            Environment::Public => "https://login.microsoftonline.com/",
            Environment::UsGovernment => "https://login.microsoftonline.us/",
            Environment::China => "https://login.chinacloudapi.cn/",
        }
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Environment::Public),
            "usgovernment" => Ok(Environment::UsGovernment),
            "china" => Ok(Environment::China),
            _ => Err(UnknownEnvironment(s.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Public => "public",
            Environment::UsGovernment => "usgovernment",
            Environment::China => "china",
        })
    }
}

/// Configuration once the environment fallbacks are applied
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub environment: Environment,
    pub resource_manager: Url,
    pub authority: Url,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("environment", &self.environment)
            .field("resource_manager", &self.resource_manager)
            .finish_non_exhaustive()
    }
}

/// Environment variable read when `attribute` is not set in the provider block
fn env_name(attribute: &str) -> String {
    format!("ARM_{}", attribute.to_ascii_uppercase())
}

impl<'a> ProviderConfig<'a> {
    pub fn schema() -> Schema {
        let string = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Optional,
            ..Default::default()
        };
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "subscription_id" => string("Subscription managed by the provider (env: `ARM_SUBSCRIPTION_ID`)"),
                    "tenant_id" => string("Tenant of the service principal (env: `ARM_TENANT_ID`)"),
                    "client_id" => string("Client ID of the service principal (env: `ARM_CLIENT_ID`)"),
                    "client_secret" => Attribute {
                        sensitive: true,
                        ..string("Client secret of the service principal (env: `ARM_CLIENT_SECRET`)")
                    },
                    "environment" => string("Azure cloud: `public`, `usgovernment` or `china` (env: `ARM_ENVIRONMENT`, default: `public`)"),
                    "resource_manager_endpoint" => string("Override of the Resource Manager endpoint (env: `ARM_RESOURCE_MANAGER_ENDPOINT`)"),
                },
                description: Description::plain("Manages Azure resources through Azure Resource Manager"),
                ..Default::default()
            },
        }
    }

    /// Check the values known at plan time
    pub fn validate(&self, diags: &mut Diagnostics) {
        for (name, value) in [
            ("subscription_id", &self.subscription_id),
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
        ] {
            validate::string(diags, value, AttributePath::new(name), validate::uuid);
        }
        validate::string(
            diags,
            &self.environment,
            AttributePath::new("environment"),
            |environment| {
                environment
                    .parse::<Environment>()
                    .map(drop)
                    .map_err(|err| err.to_string())
            },
        );
        validate::string(
            diags,
            &self.resource_manager_endpoint,
            AttributePath::new("resource_manager_endpoint"),
            |endpoint| parse_endpoint(endpoint).map(drop),
        );
    }

    /// Apply the environment fallbacks, reading variables through `lookup`
    pub fn resolve(
        &self,
        diags: &mut Diagnostics,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Settings> {
        let get = |diags: &mut Diagnostics, name: &'static str, value: &ValueString<'a>| {
            match value {
                Value::Value(value) if !value.is_empty() => Some(value.to_string()),
                Value::Unknown => {
                    diags.error(
                        format!("Unknown `{name}`"),
                        "The provider configuration must be known before any resource is planned",
                        AttributePath::new(name),
                    );
                    None
                }
                _ => lookup(&env_name(name)).filter(|value| !value.is_empty()),
            }
        };
        let required = |diags: &mut Diagnostics, name: &'static str, value: &ValueString<'a>| {
            let reported = diags.errors.len();
            let resolved = get(diags, name, value);
            if resolved.is_none() && diags.errors.len() == reported {
                diags.error(
                    format!("Missing `{name}`"),
                    format!(
                        "`{name}` must be set in the provider block or through `{}`",
                        env_name(name)
                    ),
                    AttributePath::new(name),
                );
            }
            resolved
        };
        let uuid = |diags: &mut Diagnostics, name: &'static str, value: Option<String>| {
            let value = value?;
            match validate::uuid(&value) {
                Ok(()) => Some(value),
                Err(err) => {
                    diags.error(format!("Invalid `{name}`"), err, AttributePath::new(name));
                    None
                }
            }
        };

        let subscription_id = required(diags, "subscription_id", &self.subscription_id);
        let subscription_id = uuid(diags, "subscription_id", subscription_id);
        let tenant_id = required(diags, "tenant_id", &self.tenant_id);
        let tenant_id = uuid(diags, "tenant_id", tenant_id);
        let client_id = required(diags, "client_id", &self.client_id);
        let client_id = uuid(diags, "client_id", client_id);
        let client_secret = required(diags, "client_secret", &self.client_secret);

        let environment = match get(diags, "environment", &self.environment) {
            None => Some(Environment::default()),
            Some(environment) => match environment.parse::<Environment>() {
                Ok(environment) => Some(environment),
                Err(err) => {
                    diags.error(
                        "Invalid `environment`",
                        err.to_string(),
                        AttributePath::new("environment"),
                    );
                    None
                }
            },
        }?;
        let resource_manager = match get(
            diags,
            "resource_manager_endpoint",
            &self.resource_manager_endpoint,
        ) {
            None => parse_endpoint(environment.resource_manager()),
            Some(endpoint) => parse_endpoint(&endpoint),
        };
        let resource_manager = match resource_manager {
            Ok(url) => url,
            Err(err) => {
                diags.error(
                    "Invalid `resource_manager_endpoint`",
                    err,
                    AttributePath::new("resource_manager_endpoint"),
                );
                return None;
            }
        };
        let authority = match parse_endpoint(environment.authority()) {
            Ok(url) => url,
            Err(err) => {
                diags.root_error("Invalid authority host", err);
                return None;
            }
        };

        if !diags.errors.is_empty() {
            return None;
        }
        Some(Settings {
            subscription_id: subscription_id?,
            tenant_id: tenant_id?,
            client_id: client_id?,
            client_secret: client_secret?,
            environment,
            resource_manager,
            authority,
        })
    }
}

/// Absolute `http(s)` URL, always ending with `/` so relative paths join under it
fn parse_endpoint(endpoint: &str) -> Result<Url, String> {
    let endpoint: Cow<str> = if endpoint.ends_with('/') {
        Cow::Borrowed(endpoint)
    } else {
        Cow::Owned(format!("{endpoint}/"))
    };
    let url =
        Url::parse(&endpoint).map_err(|err| format!("{endpoint:?} is not a valid URL: {err}"))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        scheme => Err(format!("unsupported scheme {scheme:?} in {endpoint:?}")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
    const TENANT: &str = "00000000-0000-0000-0000-000000000002";
    const CLIENT: &str = "00000000-0000-0000-0000-000000000003";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn environment_falls_back_on_variables() {
        let config = ProviderConfig {
            client_secret: "secret".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let settings = config
            .resolve(
                &mut diags,
                env(&[
                    ("ARM_SUBSCRIPTION_ID", SUBSCRIPTION),
                    ("ARM_TENANT_ID", TENANT),
                    ("ARM_CLIENT_ID", CLIENT),
                    ("ARM_CLIENT_SECRET", "ignored"),
                    ("ARM_ENVIRONMENT", "China"),
                ]),
            )
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(settings.subscription_id, SUBSCRIPTION);
        assert_eq!(settings.client_secret, "secret");
        assert_eq!(settings.environment, Environment::China);
        assert_eq!(
            settings.resource_manager.as_str(),
            "https://management.chinacloudapi.cn/"
        );
        assert_eq!(settings.authority.as_str(), "https://login.chinacloudapi.cn/");
    }

    #[test]
    fn endpoint_override_gets_trailing_slash() {
        let config = ProviderConfig {
            subscription_id: SUBSCRIPTION.into(),
            tenant_id: TENANT.into(),
            client_id: CLIENT.into(),
            client_secret: "secret".into(),
            resource_manager_endpoint: "http://127.0.0.1:8080".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let settings = config.resolve(&mut diags, env(&[])).unwrap();
        assert_eq!(settings.environment, Environment::Public);
        assert_eq!(settings.resource_manager.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(settings.authority.as_str(), "https://login.microsoftonline.com/");
    }

    #[test]
    fn missing_and_invalid_values_are_reported() {
        let config = ProviderConfig {
            subscription_id: "not-a-uuid".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        assert!(config.resolve(&mut diags, env(&[])).is_none());
        assert!(!diags.errors.is_empty());
    }

    #[test]
    fn validate_rejects_unknown_environment() {
        let config = ProviderConfig {
            environment: "mars".into(),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        config.validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn debug_hides_the_secret() {
        let settings = Settings {
            subscription_id: SUBSCRIPTION.to_owned(),
            tenant_id: TENANT.to_owned(),
            client_id: CLIENT.to_owned(),
            client_secret: "hunter2".to_owned(),
            environment: Environment::Public,
            resource_manager: Url::parse("https://management.azure.com/").unwrap(),
            authority: Url::parse("https://login.microsoftonline.com/").unwrap(),
        };
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
