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

//! Private DNS zones and their links to virtual networks

mod models;
mod virtual_network_link;
mod zone;

use crate::timeouts::Defaults;

pub use models::{
    PrivateZone, PrivateZoneProperties, SubResource, VirtualNetworkLink, VirtualNetworkLinkProperties,
};
pub use virtual_network_link::{VirtualNetworkLinkResource, VirtualNetworkLinkState};
pub use zone::{PrivateDnsZoneResource, PrivateDnsZoneState};

pub const API_VERSION: &str = "2020-06-01";

pub(crate) const TIMEOUTS: Defaults = Defaults::minutes(30, 5, 30, 30);
