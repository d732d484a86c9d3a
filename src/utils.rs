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

use std::fmt::Display;

use thiserror::Error;
use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

/// A create found the object already there
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information.")]
pub struct AlreadyExistsError {
    pub id: String,
    pub resource_type: String,
}

impl AlreadyExistsError {
    pub fn new(resource_type: &str, id: impl Display) -> Self {
        Self {
            id: id.to_string(),
            resource_type: format!("azurerm_{resource_type}"),
        }
    }
}

/// Report `err` as an error diagnostic
///
/// The outermost context becomes the summary, the full chain the detail.
pub(crate) fn report(diags: &mut Diagnostics, err: anyhow::Error) {
    tracing::debug!("{err:?}");
    diags.root_error(err.to_string(), format!("{err:#}"));
}

/// Plan a replacement when an attribute that is part of the identity changes
///
/// A proposed value not known yet may still differ from the prior one, so it
/// plans a replacement too.
pub(crate) fn replace_if_changed<T: PartialEq>(
    replace: &mut Vec<AttributePath>,
    name: &'static str,
    prior: &Value<T>,
    proposed: &Value<T>,
) {
    if prior != proposed {
        replace.push(AttributePath::new(name));
    }
}

/// Canonical form of an Azure location: `"West Europe"` becomes `"westeurope"`
pub(crate) fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick `prior` when it designates the same location as `remote`, to keep the configured spelling
pub(crate) fn keep_location_spelling(remote: &str, prior: &str) -> String {
    if normalize_location(remote) == normalize_location(prior) {
        prior.to_owned()
    } else {
        remote.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_message() {
        let err = AlreadyExistsError::new("dns_zone", "/subscriptions/0000");
        assert_eq!(
            err.to_string(),
            "A resource with the ID \"/subscriptions/0000\" already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for \"azurerm_dns_zone\" for more information."
        );
    }

    #[test]
    fn locations() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(keep_location_spelling("westeurope", "West Europe"), "West Europe");
        assert_eq!(keep_location_spelling("northeurope", "West Europe"), "northeurope");
    }

    #[test]
    fn replacement_paths() {
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "name", &Value::Value(1), &Value::Value(1));
        replace_if_changed(&mut replace, "zone_name", &Value::Value(1), &Value::Value(2));
        assert_eq!(replace, vec![AttributePath::new("zone_name")]);
    }

    #[test]
    fn unknown_identity_plans_replacement() {
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "name", &Value::Value(1), &Value::Value(1));
        replace_if_changed(&mut replace, "virtual_network_id", &Value::Value(1), &Value::Unknown);
        assert_eq!(replace, vec![AttributePath::new("virtual_network_id")]);
    }
}
