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

use std::sync::{Arc, PoisonError, RwLock};

use tf_provider::Diagnostics;

use super::Client;

/// Handle to the client built when the provider is configured
///
/// Resources are instantiated before the provider configuration is known,
/// so they hold this handle and resolve the client on every call.
#[derive(Debug, Clone, Default)]
pub struct SharedClient(Arc<RwLock<Option<Arc<Client>>>>);

impl SharedClient {
    pub fn new(client: Client) -> Self {
        Self(Arc::new(RwLock::new(Some(Arc::new(client)))))
    }

    pub fn set(&self, client: Client) {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(client));
    }

    /// Get the configured client, or report that the provider is not configured
    pub fn get(&self, diags: &mut Diagnostics) -> Option<Arc<Client>> {
        let slot = self.0.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(client) => Some(client.clone()),
            None => {
                diags.root_error(
                    "Provider is not configured",
                    "The azurerm provider must be configured before resources can be managed",
                );
                None
            }
        }
    }
}
