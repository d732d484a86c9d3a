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

//! Terraform and OpenTofu provider for Azure Resource Manager
//!
//! Every resource follows the same lifecycle: the configuration is expanded into
//! the body of an ARM request, the answer is flattened back into the state, and
//! long-running operations are awaited before the state is returned.

pub mod client;
pub mod config;
pub mod dns;
pub mod ids;
pub mod mssql;
pub mod poll;
pub mod private_dns;
pub mod provider;
pub mod tags;
pub mod timeouts;
pub mod validate;

mod utils;

pub use provider::AzureProvider;
pub use utils::AlreadyExistsError;
