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

//! Public DNS zones and their record sets

mod models;
pub mod records;
mod record_set;
mod zone;
mod zone_data_source;

use crate::timeouts::Defaults;

pub use models::{RecordSet, RecordSetProperties, SoaRecord, Zone, ZoneProperties};
pub use record_set::{DnsRecordSetResource, RecordSetState};
pub use zone::{DnsZoneResource, DnsZoneState, SoaRecordState};
pub use zone_data_source::{DnsZoneDataSource, DnsZoneDataSourceState};

pub const API_VERSION: &str = "2018-05-01";

pub(crate) const TIMEOUTS: Defaults = Defaults::minutes(30, 5, 30, 30);
