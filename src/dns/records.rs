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

//! Record types managed by [`DnsRecordSetResource`](super::DnsRecordSetResource)
//!
//! Each record type contributes its own attributes to the resource schema, and
//! converts them from and to the `properties` of the record set.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::net::Ipv6Addr;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueList, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use super::models::{
    AaaaRecord, ARecord, CnameRecord, MxRecord, NsRecord, PtrRecord, RecordSetProperties,
    TxtRecord,
};
use crate::ids::RecordType;
use crate::validate;

/// Maximum length of a single string inside a TXT record
pub const TXT_CHUNK_LEN: usize = 254;

/// Type of record held by a record set resource
pub trait RecordKind: Debug + Clone + Default + Send + Sync + 'static {
    const RECORD_TYPE: RecordType;
    /// Resource name, without the provider prefix
    const RESOURCE_NAME: &'static str;
    /// Human readable name, used in messages
    const LABEL: &'static str;
    /// Record set name used when `name` is not configured
    const DEFAULT_NAME: Option<&'static str> = None;

    /// Attributes holding the records in the state
    type Records: Debug
        + Clone
        + Default
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;

    fn attributes() -> HashMap<String, Attribute> {
        HashMap::new()
    }
    fn blocks() -> HashMap<String, NestedBlock> {
        HashMap::new()
    }
    fn validate(diags: &mut Diagnostics, records: &Self::Records);
    fn expand(records: &Self::Records, properties: &mut RecordSetProperties);
    /// Records of `properties`; `prior` gives the configured spelling of equivalent values
    fn flatten(properties: &RecordSetProperties, prior: &Self::Records) -> Self::Records;
}

fn known<'a>(values: impl IntoIterator<Item = &'a ValueString<'static>>) -> impl Iterator<Item = &'a str> {
    values.into_iter().filter_map(|value| value.as_deref_option())
}

fn owned(value: String) -> ValueString<'static> {
    Value::Value(Cow::Owned(value))
}

fn string_set(values: impl IntoIterator<Item = String>) -> ValueSet<ValueString<'static>> {
    Value::Value(values.into_iter().map(owned).collect())
}

fn string_attribute(attr_type: AttributeType, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint: AttributeConstraint::Required,
        ..Default::default()
    }
}

/// Split a TXT value into strings of at most [`TXT_CHUNK_LEN`] characters
pub fn chunk_txt(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(TXT_CHUNK_LEN)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Rebuild a TXT value from its strings
pub fn join_txt(chunks: &[String]) -> String {
    chunks.concat()
}

/// `records` attribute shared by A and AAAA records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressRecords {
    pub records: ValueSet<ValueString<'static>>,
}

#[derive(Debug, Clone, Default)]
pub struct A;

impl RecordKind for A {
    const RECORD_TYPE: RecordType = RecordType::A;
    const RESOURCE_NAME: &'static str = "dns_a_record";
    const LABEL: &'static str = "DNS A Record";
    type Records = AddressRecords;

    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "records" => string_attribute(
                AttributeType::Set(Box::new(AttributeType::String)),
                "List of IPv4 Addresses",
            ),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        for record in records.records.iter().flatten() {
            validate::string(diags, record, AttributePath::new("records"), validate::ipv4);
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.a_records = Some(
            known(records.records.iter().flatten())
                .map(|ip| ARecord {
                    ipv4_address: Some(ip.to_owned()),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        AddressRecords {
            records: string_set(
                properties
                    .a_records
                    .iter()
                    .flatten()
                    .filter_map(|record| record.ipv4_address.clone()),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aaaa;

fn same_ipv6(a: &str, b: &str) -> bool {
    match (a.parse::<Ipv6Addr>(), b.parse::<Ipv6Addr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

impl RecordKind for Aaaa {
    const RECORD_TYPE: RecordType = RecordType::Aaaa;
    const RESOURCE_NAME: &'static str = "dns_aaaa_record";
    const LABEL: &'static str = "DNS AAAA Record";
    type Records = AddressRecords;

    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "records" => string_attribute(
                AttributeType::Set(Box::new(AttributeType::String)),
                "List of IPv6 Addresses",
            ),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        for record in records.records.iter().flatten() {
            validate::string(diags, record, AttributePath::new("records"), validate::ipv6);
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.aaaa_records = Some(
            known(records.records.iter().flatten())
                .map(|ip| AaaaRecord {
                    ipv6_address: Some(ip.to_owned()),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, prior: &Self::Records) -> Self::Records {
        let prior: Vec<&str> = known(prior.records.iter().flatten()).collect();
        AddressRecords {
            records: string_set(
                properties
                    .aaaa_records
                    .iter()
                    .flatten()
                    .filter_map(|record| record.ipv6_address.clone())
                    .map(|remote| {
                        prior
                            .iter()
                            .find(|configured| same_ipv6(configured, &remote))
                            .map_or(remote, |configured| configured.to_string())
                    }),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CnameRecords {
    pub record: ValueString<'static>,
}

#[derive(Debug, Clone, Default)]
pub struct Cname;

impl RecordKind for Cname {
    const RECORD_TYPE: RecordType = RecordType::Cname;
    const RESOURCE_NAME: &'static str = "dns_cname_record";
    const LABEL: &'static str = "DNS CNAME Record";
    type Records = CnameRecords;

    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "record" => string_attribute(AttributeType::String, "The target of the CNAME"),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        validate::string(diags, &records.record, AttributePath::new("record"), |record| {
            validate::length(record, 1, 253)
        });
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.cname_record = Some(CnameRecord {
            cname: records.record.as_deref_option().map(str::to_owned),
        });
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        CnameRecords {
            record: owned(
                properties
                    .cname_record
                    .as_ref()
                    .and_then(|record| record.cname.clone())
                    .unwrap_or_default(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MxRecordState {
    pub preference: ValueNumber,
    pub exchange: ValueString<'static>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MxRecords {
    pub record: ValueSet<MxRecordState>,
}

#[derive(Debug, Clone, Default)]
pub struct Mx;

impl RecordKind for Mx {
    const RECORD_TYPE: RecordType = RecordType::Mx;
    const RESOURCE_NAME: &'static str = "dns_mx_record";
    const LABEL: &'static str = "DNS MX Record";
    const DEFAULT_NAME: Option<&'static str> = Some("@");
    type Records = MxRecords;

    fn blocks() -> HashMap<String, NestedBlock> {
        map! {
            "record" => NestedBlock::Set(Block {
                attributes: map! {
                    "preference" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Preference of the mail exchange, lower values are preferred"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "exchange" => string_attribute(AttributeType::String, "The mail server responsible for the domain"),
                },
                description: Description::plain("Mail exchange of the record set"),
                ..Default::default()
            }),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        if let Value::Value(set) = &records.record {
            if set.is_empty() {
                diags.error_short(
                    "At least one `record` block is required",
                    AttributePath::new("record"),
                );
            }
            for record in set {
                validate::number(
                    diags,
                    &record.preference,
                    AttributePath::new("record").attribute("preference"),
                    |preference| validate::range(preference, 0, 65535),
                );
                validate::string(
                    diags,
                    &record.exchange,
                    AttributePath::new("record").attribute("exchange"),
                    |exchange| validate::length(exchange, 1, 253),
                );
            }
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.mx_records = Some(
            records
                .record
                .iter()
                .flatten()
                .map(|record| MxRecord {
                    preference: record.preference.as_ref_option().copied(),
                    exchange: record.exchange.as_deref_option().map(str::to_owned),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        MxRecords {
            record: Value::Value(
                properties
                    .mx_records
                    .iter()
                    .flatten()
                    .map(|record| MxRecordState {
                        preference: Value::Value(record.preference.unwrap_or_default()),
                        exchange: owned(record.exchange.clone().unwrap_or_default()),
                    })
                    .collect(),
            ),
        }
    }
}

/// Name servers keep their configured order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NsRecords {
    pub records: ValueList<ValueString<'static>>,
}

#[derive(Debug, Clone, Default)]
pub struct Ns;

impl RecordKind for Ns {
    const RECORD_TYPE: RecordType = RecordType::Ns;
    const RESOURCE_NAME: &'static str = "dns_ns_record";
    const LABEL: &'static str = "DNS NS Record";
    type Records = NsRecords;

    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "records" => string_attribute(
                AttributeType::List(Box::new(AttributeType::String)),
                "List of name servers",
            ),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        if let Value::Value(list) = &records.records {
            for (i, record) in list.iter().enumerate() {
                validate::string(
                    diags,
                    record,
                    AttributePath::new("records").index(i as i64),
                    |record| validate::length(record, 1, 253),
                );
            }
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.ns_records = Some(
            known(records.records.iter().flatten())
                .map(|nsdname| NsRecord {
                    nsdname: Some(nsdname.to_owned()),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        NsRecords {
            records: Value::Value(
                properties
                    .ns_records
                    .iter()
                    .flatten()
                    .filter_map(|record| record.nsdname.clone())
                    .map(owned)
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PtrRecords {
    pub records: ValueSet<ValueString<'static>>,
}

#[derive(Debug, Clone, Default)]
pub struct Ptr;

impl RecordKind for Ptr {
    const RECORD_TYPE: RecordType = RecordType::Ptr;
    const RESOURCE_NAME: &'static str = "dns_ptr_record";
    const LABEL: &'static str = "DNS PTR Record";
    type Records = PtrRecords;

    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "records" => string_attribute(
                AttributeType::Set(Box::new(AttributeType::String)),
                "List of Fully Qualified Domain Names",
            ),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        for record in records.records.iter().flatten() {
            validate::string(diags, record, AttributePath::new("records"), |record| {
                validate::length(record, 1, 253)
            });
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.ptr_records = Some(
            known(records.records.iter().flatten())
                .map(|ptrdname| PtrRecord {
                    ptrdname: Some(ptrdname.to_owned()),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        PtrRecords {
            records: string_set(
                properties
                    .ptr_records
                    .iter()
                    .flatten()
                    .filter_map(|record| record.ptrdname.clone()),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxtRecordState {
    pub value: ValueString<'static>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxtRecords {
    pub record: ValueSet<TxtRecordState>,
}

#[derive(Debug, Clone, Default)]
pub struct Txt;

impl RecordKind for Txt {
    const RECORD_TYPE: RecordType = RecordType::Txt;
    const RESOURCE_NAME: &'static str = "dns_txt_record";
    const LABEL: &'static str = "DNS TXT Record";
    type Records = TxtRecords;

    fn blocks() -> HashMap<String, NestedBlock> {
        map! {
            "record" => NestedBlock::Set(Block {
                attributes: map! {
                    "value" => string_attribute(AttributeType::String, "The value of the record, split in strings of 254 characters when sent"),
                },
                description: Description::plain("Value of the record set"),
                ..Default::default()
            }),
        }
    }

    fn validate(diags: &mut Diagnostics, records: &Self::Records) {
        if let Value::Value(set) = &records.record {
            if set.is_empty() {
                diags.error_short(
                    "At least one `record` block is required",
                    AttributePath::new("record"),
                );
            }
            for record in set {
                validate::string(
                    diags,
                    &record.value,
                    AttributePath::new("record").attribute("value"),
                    |value| validate::length(value, 1, 4096),
                );
            }
        }
    }

    fn expand(records: &Self::Records, properties: &mut RecordSetProperties) {
        properties.txt_records = Some(
            records
                .record
                .iter()
                .flatten()
                .filter_map(|record| record.value.as_deref_option())
                .map(|value| TxtRecord {
                    value: Some(chunk_txt(value)),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties, _prior: &Self::Records) -> Self::Records {
        TxtRecords {
            record: Value::Value(
                properties
                    .txt_records
                    .iter()
                    .flatten()
                    .map(|record| TxtRecordState {
                        value: owned(join_txt(record.value.as_deref().unwrap_or_default())),
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(values: &[&str]) -> AddressRecords {
        AddressRecords {
            records: string_set(values.iter().map(|value| value.to_string())),
        }
    }

    fn round_trip<K: RecordKind>(records: &K::Records) -> K::Records {
        let mut properties = RecordSetProperties::default();
        K::expand(records, &mut properties);
        K::flatten(&properties, records)
    }

    #[test]
    fn txt_chunks() {
        let value = "x".repeat(600);
        let chunks = chunk_txt(&value);
        let lengths: Vec<usize> = chunks.iter().map(String::len).collect();
        assert_eq!(lengths, vec![254, 254, 92]);
        assert_eq!(join_txt(&chunks), value);

        assert_eq!(chunk_txt("v=spf1 -all"), vec!["v=spf1 -all".to_owned()]);
        assert_eq!(chunk_txt(&"y".repeat(254)).len(), 1);
        assert_eq!(chunk_txt(&"y".repeat(255)).len(), 2);
    }

    #[test]
    fn empty_properties_flatten_to_zero_values() {
        let properties = RecordSetProperties::default();

        assert_eq!(A::flatten(&properties, &Default::default()), addresses(&[]));
        assert_eq!(
            Cname::flatten(&properties, &Default::default()).record,
            Value::Value(Cow::Borrowed(""))
        );
        assert_eq!(
            Mx::flatten(&properties, &Default::default()).record,
            Value::Value(Default::default())
        );
        assert_eq!(
            Ns::flatten(&properties, &Default::default()).records,
            Value::Value(vec![])
        );
        assert_eq!(
            Txt::flatten(&properties, &Default::default()).record,
            Value::Value(Default::default())
        );
    }

    #[test]
    fn expand_sorts_addresses() {
        let mut properties = RecordSetProperties::default();
        A::expand(&addresses(&["10.0.0.2", "10.0.0.1"]), &mut properties);
        assert_eq!(
            properties.a_records,
            Some(vec![
                ARecord {
                    ipv4_address: Some("10.0.0.1".to_owned())
                },
                ARecord {
                    ipv4_address: Some("10.0.0.2".to_owned())
                },
            ])
        );
    }

    #[test]
    fn round_trips() {
        let a = addresses(&["10.0.0.1", "10.0.0.2"]);
        assert_eq!(round_trip::<A>(&a), a);

        let mx = MxRecords {
            record: Value::Value(
                [(10, "mx1.example.com"), (20, "mx2.example.com")]
                    .into_iter()
                    .map(|(preference, exchange)| MxRecordState {
                        preference: Value::Value(preference),
                        exchange: owned(exchange.to_owned()),
                    })
                    .collect(),
            ),
        };
        assert_eq!(round_trip::<Mx>(&mx), mx);

        let ns = NsRecords {
            records: Value::Value(vec![owned("ns2.example.com".into()), owned("ns1.example.com".into())]),
        };
        assert_eq!(round_trip::<Ns>(&ns), ns);

        let txt = TxtRecords {
            record: Value::Value(
                ["short", &"z".repeat(1000)]
                    .into_iter()
                    .map(|value| TxtRecordState {
                        value: owned(value.to_owned()),
                    })
                    .collect(),
            ),
        };
        assert_eq!(round_trip::<Txt>(&txt), txt);
    }

    #[test]
    fn aaaa_keeps_configured_spelling() {
        let configured = addresses(&["2001:DB8:0:0::1"]);
        let properties = RecordSetProperties {
            aaaa_records: Some(vec![AaaaRecord {
                ipv6_address: Some("2001:db8::1".to_owned()),
            }]),
            ..Default::default()
        };
        assert_eq!(Aaaa::flatten(&properties, &configured), configured);
        assert_eq!(
            Aaaa::flatten(&properties, &Default::default()),
            addresses(&["2001:db8::1"])
        );
    }

    #[test]
    fn mx_requires_a_record() {
        let mut diags = Diagnostics::default();
        Mx::validate(
            &mut diags,
            &MxRecords {
                record: Value::Value(Default::default()),
            },
        );
        assert_eq!(diags.errors.len(), 1);
    }
}
