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

//! Validation of configured values

use std::net::{Ipv4Addr, Ipv6Addr};

use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

/// Report `check` on `path` when `value` is known
pub fn string(
    diags: &mut Diagnostics,
    value: &ValueString,
    path: AttributePath,
    check: impl FnOnce(&str) -> Result<(), String>,
) {
    if let Value::Value(value) = value {
        if let Err(err) = check(value) {
            diags.error(format!("Invalid `{}`", display_path(&path)), err, path);
        }
    }
}

/// Report `check` on `path` when `value` is known
pub fn number(
    diags: &mut Diagnostics,
    value: &ValueNumber,
    path: AttributePath,
    check: impl FnOnce(i64) -> Result<(), String>,
) {
    if let Value::Value(value) = value {
        if let Err(err) = check(*value) {
            diags.error(format!("Invalid `{}`", display_path(&path)), err, path);
        }
    }
}

fn display_path(path: &AttributePath) -> String {
    path.steps
        .iter()
        .filter_map(|step| match step {
            tf_provider::AttributePathStep::Attribute(name) => Some(name.as_ref()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(format!(
            "expected length to be in the range ({min} - {max}), got {len}"
        ))
    }
}

pub fn range(value: i64, min: i64, max: i64) -> Result<(), String> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("expected to be in the range ({min} - {max}), got {value}"))
    }
}

pub fn one_of(value: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "expected to be one of [{}], got {value:?}",
            allowed.join(", ")
        ))
    }
}

pub fn ipv4(value: &str) -> Result<(), String> {
    value
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| format!("expected a valid IPv4 address, got {value:?}"))
}

pub fn ipv6(value: &str) -> Result<(), String> {
    value
        .parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| format!("expected a valid IPv6 address, got {value:?}"))
}

pub fn uuid(value: &str) -> Result<(), String> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|err| format!("expected a UUID, got {value:?}: {err}"))
}

/// Resource group: 1-90 characters among alphanumerics, `_`, `-`, `.`, `(` and `)`, not ending with `.`
pub fn resource_group_name(value: &str) -> Result<(), String> {
    length(value, 1, 90)?;
    if let Some(c) = value
        .chars()
        .find(|&c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')')))
    {
        return Err(format!(
            "resource group names may only contain alphanumerics, underscores, hyphens, periods and parentheses, found {c:?}"
        ));
    }
    if value.ends_with('.') {
        return Err("resource group names cannot end with a period".to_owned());
    }
    Ok(())
}

/// DNS zone: 1-253 characters, at least two non-empty labels of at most 63 characters
pub fn dns_zone_name(value: &str) -> Result<(), String> {
    length(value, 1, 253)?;
    let labels: Vec<&str> = value.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return Err(format!(
            "a DNS zone name must have at least two labels, got {value:?}"
        ));
    }
    if let Some(label) = labels
        .iter()
        .find(|label| label.is_empty() || label.len() > 63)
    {
        return Err(format!(
            "each label of a DNS zone name must have between 1 and 63 characters, got {label:?}"
        ));
    }
    Ok(())
}

/// Record set relative name; `@` designates the apex of the zone
pub fn record_set_name(value: &str) -> Result<(), String> {
    length(value, 1, 253)?;
    if value.contains('/') {
        return Err(format!("record set names cannot contain `/`, got {value:?}"));
    }
    Ok(())
}

/// SQL server: 1-63 lowercase letters, digits and hyphens, not starting or ending with a hyphen
pub fn sql_server_name(value: &str) -> Result<(), String> {
    length(value, 1, 63)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "SQL server names may only contain lowercase letters, digits and hyphens, got {value:?}"
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(format!(
            "SQL server names cannot start or end with a hyphen, got {value:?}"
        ));
    }
    Ok(())
}

/// Generic child resource name: 1-128 characters, no `/`, `\`, `%`, `?`, `#` or `&`
pub fn child_name(value: &str) -> Result<(), String> {
    length(value, 1, 128)?;
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '%' | '?' | '#' | '&'))
    {
        return Err(format!("names cannot contain {c:?}, got {value:?}"));
    }
    Ok(())
}
