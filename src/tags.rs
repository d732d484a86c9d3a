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

//! Resource tags

use std::borrow::Cow;
use std::collections::BTreeMap;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description};
use tf_provider::value::{Value, ValueMap, ValueString};
use tf_provider::{AttributePath, Diagnostics};

pub type Tags<'a> = ValueMap<'a, ValueString<'a>>;

const MAX_TAGS: usize = 50;
const MAX_KEY_LEN: usize = 512;
const MAX_VALUE_LEN: usize = 256;

pub fn attribute() -> Attribute {
    Attribute {
        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
        description: Description::plain("A mapping of tags to assign to the resource"),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    }
}

pub fn computed_attribute() -> Attribute {
    Attribute {
        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
        description: Description::plain("Tags assigned to the resource"),
        constraint: AttributeConstraint::Computed,
        ..Default::default()
    }
}

pub fn validate(diags: &mut Diagnostics, tags: &Tags) {
    let Value::Value(tags) = tags else {
        return;
    };
    if tags.len() > MAX_TAGS {
        diags.error(
            "Too many tags",
            format!("a maximum of {MAX_TAGS} tags can be applied, got {}", tags.len()),
            AttributePath::new("tags"),
        );
    }
    for (key, value) in tags {
        if key.chars().count() > MAX_KEY_LEN {
            diags.error(
                "Invalid tag name",
                format!("the name of the tag {key:?} must not exceed {MAX_KEY_LEN} characters"),
                AttributePath::new("tags"),
            );
        }
        if let Value::Value(value) = value {
            if value.chars().count() > MAX_VALUE_LEN {
                diags.error(
                    "Invalid tag value",
                    format!("the value of the tag {key:?} must not exceed {MAX_VALUE_LEN} characters"),
                    AttributePath::new("tags").key(key.to_string()),
                );
            }
        }
    }
}

/// Tags as sent to the API; unknown and null values are left out
pub fn expand(tags: &Tags) -> BTreeMap<String, String> {
    tags.iter()
        .flatten()
        .filter_map(|(key, value)| {
            value
                .as_deref_option()
                .map(|value| (key.to_string(), value.to_owned()))
        })
        .collect()
}

/// Tags as stored in the state
///
/// Empty remote tags stay null when they were null before, so an unset
/// `tags` attribute does not turn into an empty map.
pub fn flatten<'a>(remote: Option<BTreeMap<String, String>>, prior: &Tags) -> Tags<'a> {
    let remote = remote.unwrap_or_default();
    if remote.is_empty() && prior.is_null() {
        return Value::Null;
    }
    Value::Value(
        remote
            .into_iter()
            .map(|(key, value)| (Cow::Owned(key), Value::Value(Cow::Owned(value))))
            .collect(),
    )
}
