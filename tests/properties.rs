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

use proptest::prelude::*;
use terraform_provider_azurerm::dns::records::{chunk_txt, join_txt, TXT_CHUNK_LEN};
use terraform_provider_azurerm::ids::{
    FailoverGroupId, RecordSetId, RecordType, VirtualNetworkLinkId,
};

fn name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,30}"
}

fn subscription() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
}

fn record_type() -> impl Strategy<Value = RecordType> {
    prop_oneof![
        Just(RecordType::A),
        Just(RecordType::Aaaa),
        Just(RecordType::Cname),
        Just(RecordType::Mx),
        Just(RecordType::Ns),
        Just(RecordType::Ptr),
        Just(RecordType::Txt),
    ]
}

proptest! {
    /// Formatting then parsing gives back the same identifier
    #[test]
    fn link_id_round_trip(
        sub in subscription(),
        rg in name(),
        zone in name(),
        link in name(),
    ) {
        let id = VirtualNetworkLinkId::new(sub, rg, zone, link);
        prop_assert_eq!(VirtualNetworkLinkId::parse(&id.to_string()), Ok(id));
    }

    #[test]
    fn failover_group_id_round_trip(
        sub in subscription(),
        rg in name(),
        server in name(),
        group in name(),
    ) {
        let id = FailoverGroupId::new(sub, rg, server, group);
        prop_assert_eq!(FailoverGroupId::parse(&id.to_string()), Ok(id));
    }

    #[test]
    fn record_set_id_round_trip(
        sub in subscription(),
        rg in name(),
        zone in name(),
        record_type in record_type(),
        record in name(),
    ) {
        let id = RecordSetId {
            subscription_id: sub,
            resource_group_name: rg,
            dns_zone_name: zone,
            record_type,
            name: record,
        };
        prop_assert_eq!(RecordSetId::parse(&id.to_string(), record_type), Ok(id.clone()));

        // Lower-cased keys are only accepted by the insensitive parse
        let lowered = id
            .to_string()
            .replacen("/resourceGroups/", "/resourcegroups/", 1);
        prop_assert!(RecordSetId::parse(&lowered, record_type).is_err());
        prop_assert_eq!(RecordSetId::parse_insensitively(&lowered, record_type), Ok(id));
    }

    /// Chunks fit in a TXT string and concatenate back to the value
    #[test]
    fn txt_chunks_round_trip(value in "\\PC{0,1200}") {
        let chunks = chunk_txt(&value);
        let length = value.chars().count();
        prop_assert_eq!(chunks.len(), length.div_ceil(TXT_CHUNK_LEN).max(1));
        for chunk in &chunks {
            prop_assert!(chunk.chars().count() <= TXT_CHUNK_LEN);
        }
        prop_assert_eq!(join_txt(&chunks), value);
    }
}
