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

//! Azure Resource Manager identifiers
//!
//! Every identifier is a path of `key/value` pairs, eg:
//! `/subscriptions/{subscription}/resourceGroups/{group}/providers/Microsoft.Network/dnsZones/{zone}`.
//! A [`Segment`] template drives both formatting and parsing, so the two
//! stay in sync for every identifier type.

use std::fmt::{self, Display, Write};
use std::str::FromStr;

use thiserror::Error;

/// Error returned when an identifier cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// A segment of the template is absent or empty
    #[error("parsing {input:?}: the segment {segment:?} was missing")]
    MissingSegment {
        input: String,
        segment: &'static str,
    },
    /// The input does not follow the template
    #[error("parsing {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

impl IdError {
    /// Name of the missing segment, if any
    pub fn missing_segment(&self) -> Option<&'static str> {
        match self {
            IdError::MissingSegment { segment, .. } => Some(*segment),
            IdError::Malformed { .. } => None,
        }
    }
}

/// One `key/value` pair of an identifier template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Literal key followed by a user value
    Key(&'static str),
    /// Literal key followed by a literal value
    Fixed {
        key: &'static str,
        value: &'static str,
    },
}

impl Segment {
    fn key(&self) -> &'static str {
        match *self {
            Segment::Key(key) | Segment::Fixed { key, .. } => key,
        }
    }
}

pub const SUBSCRIPTION: Segment = Segment::Key("subscriptions");
pub const RESOURCE_GROUP: Segment = Segment::Key("resourceGroups");
pub const NETWORK: Segment = Segment::Fixed {
    key: "providers",
    value: "Microsoft.Network",
};
pub const SQL: Segment = Segment::Fixed {
    key: "providers",
    value: "Microsoft.Sql",
};

/// Format `values` into the path described by `segments`
///
/// `values` holds one entry per [`Segment::Key`], in order.
pub fn format_segments(segments: &[Segment], values: &[&str]) -> String {
    let mut out = String::new();
    let mut values = values.iter();
    for segment in segments {
        let value = match segment {
            Segment::Key(_) => values.next().copied().unwrap_or_default(),
            Segment::Fixed { value, .. } => *value,
        };
        _ = write!(out, "/{}/{}", segment.key(), value);
    }
    out
}

/// Parse `input` against `segments`, returning one value per [`Segment::Key`]
///
/// When `insensitive` is set, literal keys and fixed values match regardless of case.
pub fn parse_segments(
    input: &str,
    segments: &[Segment],
    insensitive: bool,
) -> Result<Vec<String>, IdError> {
    let malformed = |reason: String| IdError::Malformed {
        input: input.to_owned(),
        reason,
    };
    let missing = |segment: &'static str| IdError::MissingSegment {
        input: input.to_owned(),
        segment,
    };
    let same = |a: &str, b: &str| {
        if insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };

    let Some(rest) = input.strip_prefix('/') else {
        return Err(malformed("an identifier must start with `/`".to_owned()));
    };
    if rest.is_empty() {
        return Err(malformed("the identifier is empty".to_owned()));
    }

    let mut components = rest.split('/').peekable();
    let mut values = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let key = segment.key();
        match components.peek() {
            None | Some(&"") => return Err(missing(key)),
            Some(&found) if !same(found, key) => {
                // A key that belongs further down the template means this one was skipped
                if segments[i + 1..].iter().any(|next| same(found, next.key())) {
                    return Err(missing(key));
                }
                return Err(malformed(format!("expected the segment {key:?} but found {found:?}")));
            }
            Some(_) => {
                components.next();
            }
        }

        let value = match components.next() {
            None | Some("") => return Err(missing(key)),
            Some(value) => value,
        };
        match segment {
            Segment::Key(_) => values.push(value.to_owned()),
            Segment::Fixed {
                value: expected, ..
            } => {
                if !same(value, *expected) {
                    return Err(malformed(format!(
                        "expected {key:?} to be {expected:?} but found {value:?}"
                    )));
                }
            }
        }
    }

    if let Some(extra) = components.next() {
        return Err(malformed(format!("unexpected trailing segment {extra:?}")));
    }

    Ok(values)
}

macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        $name:ident => [$($segment:expr),+ $(,)?] { $($field:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            $(pub $field: String,)+
        }

        impl $name {
            const SEGMENTS: &'static [Segment] = &[$($segment),+];

            #[allow(clippy::too_many_arguments)]
            pub fn new($($field: impl Into<String>),+) -> Self {
                Self { $($field: $field.into(),)+ }
            }

            /// Parse an identifier with the exact casing of the template
            pub fn parse(input: &str) -> Result<Self, IdError> {
                parse_segments(input, Self::SEGMENTS, false).map(Self::from_values)
            }

            /// Parse an identifier whose literal segments may use any casing
            pub fn parse_insensitively(input: &str) -> Result<Self, IdError> {
                parse_segments(input, Self::SEGMENTS, true).map(Self::from_values)
            }

            fn from_values(values: Vec<String>) -> Self {
                let mut values = values.into_iter();
                Self { $($field: values.next().unwrap_or_default(),)+ }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&format_segments(Self::SEGMENTS, &[$(self.$field.as_str()),+]))
            }
        }

        impl FromStr for $name {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

resource_id! {
    /// Public DNS zone
    DnsZoneId => [SUBSCRIPTION, RESOURCE_GROUP, NETWORK, Segment::Key("dnsZones")] {
        subscription_id, resource_group_name, dns_zone_name,
    }
}

resource_id! {
    /// Private DNS zone
    PrivateDnsZoneId => [SUBSCRIPTION, RESOURCE_GROUP, NETWORK, Segment::Key("privateDnsZones")] {
        subscription_id, resource_group_name, private_dns_zone_name,
    }
}

resource_id! {
    /// Link between a private DNS zone and a virtual network
    VirtualNetworkLinkId => [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        NETWORK,
        Segment::Key("privateDnsZones"),
        Segment::Key("virtualNetworkLinks"),
    ] {
        subscription_id, resource_group_name, private_dns_zone_name, virtual_network_link_name,
    }
}

resource_id! {
    /// Virtual network, only referenced by other resources
    VirtualNetworkId => [SUBSCRIPTION, RESOURCE_GROUP, NETWORK, Segment::Key("virtualNetworks")] {
        subscription_id, resource_group_name, virtual_network_name,
    }
}

resource_id! {
    /// Subnet of a virtual network, only referenced by other resources
    SubnetId => [SUBSCRIPTION, RESOURCE_GROUP, NETWORK, Segment::Key("virtualNetworks"), Segment::Key("subnets")] {
        subscription_id, resource_group_name, virtual_network_name, subnet_name,
    }
}

resource_id! {
    /// SQL logical server
    SqlServerId => [SUBSCRIPTION, RESOURCE_GROUP, SQL, Segment::Key("servers")] {
        subscription_id, resource_group_name, server_name,
    }
}

resource_id! {
    /// Firewall rule of a SQL server
    FirewallRuleId => [SUBSCRIPTION, RESOURCE_GROUP, SQL, Segment::Key("servers"), Segment::Key("firewallRules")] {
        subscription_id, resource_group_name, server_name, firewall_rule_name,
    }
}

resource_id! {
    /// Failover group of a SQL server
    FailoverGroupId => [SUBSCRIPTION, RESOURCE_GROUP, SQL, Segment::Key("servers"), Segment::Key("failoverGroups")] {
        subscription_id, resource_group_name, server_name, failover_group_name,
    }
}

resource_id! {
    /// SQL database, only referenced by failover groups
    SqlDatabaseId => [SUBSCRIPTION, RESOURCE_GROUP, SQL, Segment::Key("servers"), Segment::Key("databases")] {
        subscription_id, resource_group_name, server_name, database_name,
    }
}

resource_id! {
    /// SQL managed instance
    ManagedInstanceId => [SUBSCRIPTION, RESOURCE_GROUP, SQL, Segment::Key("managedInstances")] {
        subscription_id, resource_group_name, managed_instance_name,
    }
}

impl DnsZoneId {
    pub fn record_set(&self, record_type: RecordType, name: impl Into<String>) -> RecordSetId {
        RecordSetId {
            subscription_id: self.subscription_id.clone(),
            resource_group_name: self.resource_group_name.clone(),
            dns_zone_name: self.dns_zone_name.clone(),
            record_type,
            name: name.into(),
        }
    }
}

impl PrivateDnsZoneId {
    pub fn virtual_network_link(&self, name: impl Into<String>) -> VirtualNetworkLinkId {
        VirtualNetworkLinkId {
            subscription_id: self.subscription_id.clone(),
            resource_group_name: self.resource_group_name.clone(),
            private_dns_zone_name: self.private_dns_zone_name.clone(),
            virtual_network_link_name: name.into(),
        }
    }
}

impl VirtualNetworkLinkId {
    pub fn private_dns_zone(&self) -> PrivateDnsZoneId {
        PrivateDnsZoneId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.private_dns_zone_name,
        )
    }
}

impl SqlServerId {
    pub fn firewall_rule(&self, name: impl Into<String>) -> FirewallRuleId {
        FirewallRuleId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.server_name,
            name,
        )
    }

    pub fn failover_group(&self, name: impl Into<String>) -> FailoverGroupId {
        FailoverGroupId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.server_name,
            name,
        )
    }
}

impl FirewallRuleId {
    pub fn server(&self) -> SqlServerId {
        SqlServerId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.server_name,
        )
    }
}

impl FailoverGroupId {
    pub fn server(&self) -> SqlServerId {
        SqlServerId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.server_name,
        )
    }
}

/// Type of a DNS record set, as it appears in the identifier path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Soa,
    Txt,
}

impl RecordType {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Soa => "SOA",
            RecordType::Txt => "TXT",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNS record set inside a public zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordSetId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub dns_zone_name: String,
    pub record_type: RecordType,
    pub name: String,
}

impl RecordSetId {
    fn segments(record_type: RecordType) -> [Segment; 5] {
        [
            SUBSCRIPTION,
            RESOURCE_GROUP,
            NETWORK,
            Segment::Key("dnsZones"),
            Segment::Key(record_type.as_str()),
        ]
    }

    /// Parse a record set identifier of the given type
    pub fn parse(input: &str, record_type: RecordType) -> Result<Self, IdError> {
        parse_segments(input, &Self::segments(record_type), false)
            .map(|values| Self::from_values(values, record_type))
    }

    /// Parse a record set identifier whose literal segments may use any casing
    pub fn parse_insensitively(input: &str, record_type: RecordType) -> Result<Self, IdError> {
        parse_segments(input, &Self::segments(record_type), true)
            .map(|values| Self::from_values(values, record_type))
    }

    fn from_values(values: Vec<String>, record_type: RecordType) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group_name: values.next().unwrap_or_default(),
            dns_zone_name: values.next().unwrap_or_default(),
            record_type,
            name: values.next().unwrap_or_default(),
        }
    }

    pub fn zone(&self) -> DnsZoneId {
        DnsZoneId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.dns_zone_name,
        )
    }
}

impl Display for RecordSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_segments(
            &Self::segments(self.record_type),
            &[
                &self.subscription_id,
                &self.resource_group_name,
                &self.dns_zone_name,
                &self.name,
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_dns_zone() {
        let id = DnsZoneId::new("0000", "rg", "example.com");
        assert_eq!(
            id.to_string(),
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com"
        );
    }

    #[test]
    fn parse_record_set() {
        let id = RecordSetId::parse(
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/A/www",
            RecordType::A,
        )
        .unwrap();
        assert_eq!(id.name, "www");
        assert_eq!(id.zone(), DnsZoneId::new("0000", "rg", "example.com"));
    }

    #[test]
    fn wrong_record_type_is_malformed() {
        let err = RecordSetId::parse(
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/AAAA/www",
            RecordType::A,
        )
        .unwrap_err();
        assert!(matches!(err, IdError::Malformed { .. }), "{err}");
    }

    #[test]
    fn missing_resource_group() {
        let err = DnsZoneId::parse(
            "/subscriptions/0000/providers/Microsoft.Network/dnsZones/example.com",
        )
        .unwrap_err();
        assert_eq!(err.missing_segment(), Some("resourceGroups"));
    }

    #[test]
    fn missing_trailing_value() {
        let err = SqlServerId::parse("/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Sql/servers")
            .unwrap_err();
        assert_eq!(err.missing_segment(), Some("servers"));

        let err = SqlServerId::parse("/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Sql/servers/")
            .unwrap_err();
        assert_eq!(err.missing_segment(), Some("servers"));
    }

    #[test]
    fn malformed_inputs() {
        for input in [
            "",
            "/",
            "subscriptions/0000",
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Sql/servers/srv",
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/extra",
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/zones/example.com",
        ] {
            let err = DnsZoneId::parse(input).unwrap_err();
            assert!(matches!(err, IdError::Malformed { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn insensitive_parse_normalizes_casing() {
        let legacy = "/subscriptions/0000/resourcegroups/rg/providers/microsoft.network/dnszones/example.com/a/www";
        assert!(RecordSetId::parse(legacy, RecordType::A).is_err());

        let id = RecordSetId::parse_insensitively(legacy, RecordType::A).unwrap();
        assert_eq!(
            id.to_string(),
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/A/www"
        );
    }

    #[test]
    fn child_ids() {
        let server = SqlServerId::new("0000", "rg", "srv");
        let rule = server.firewall_rule("allow");
        assert_eq!(
            rule.to_string(),
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Sql/servers/srv/firewallRules/allow"
        );
        assert_eq!(rule.server(), server);
        assert_eq!(FirewallRuleId::parse(&rule.to_string()), Ok(rule));
    }

    #[test]
    fn subnet_keeps_its_network() {
        let id = SubnetId::parse_insensitively(
            "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/virtualnetworks/vnet/subnets/sql",
        )
        .unwrap();
        assert_eq!(id.virtual_network_name, "vnet");
        assert_eq!(id.subnet_name, "sql");
        assert!(ManagedInstanceId::parse(&id.to_string()).is_err());
    }
}
