// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
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

use crate::domain::scenario::descriptor::SecretDescriptor;
use crate::domain::scenario::runner::ManagedResource;
use crate::infrastructure::kubernetes::client::ClusterClient;
use crate::shared::error::{ConformanceError, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provisioning parameters for a custom storage class, delivered as a
/// Secret the CSI driver resolves by claim name.
pub struct TestSecret {
    client: Arc<dyn ClusterClient>,
    descriptor: SecretDescriptor,
    created: Option<Secret>,
}

impl TestSecret {
    pub fn new(client: Arc<dyn ClusterClient>, descriptor: SecretDescriptor) -> Self {
        Self {
            client,
            descriptor,
            created: None,
        }
    }

    pub fn build_manifest(descriptor: &SecretDescriptor) -> Secret {
        let mut data = BTreeMap::new();
        data.insert("iops".to_string(), descriptor.iops.clone());
        data.insert("tags".to_string(), descriptor.tags.clone());
        data.insert("encrypted".to_string(), descriptor.encrypted.to_string());
        if !descriptor.encryption_key.is_empty() {
            data.insert(
                "encryptionKey".to_string(),
                descriptor.encryption_key.clone(),
            );
        }

        Secret {
            metadata: ObjectMeta {
                name: Some(descriptor.name.clone()),
                ..Default::default()
            },
            type_: Some(descriptor.profile.clone()),
            string_data: Some(data),
            ..Default::default()
        }
    }

    pub async fn create(&mut self) -> Result<String> {
        let manifest = Self::build_manifest(&self.descriptor);
        let created = self.client.create_secret(&manifest).await?;
        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| ConformanceError::KubeApi("created Secret has no name".to_string()))?;
        self.created = Some(created);
        Ok(name)
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestSecret {
    fn describe(&self) -> String {
        format!("Secret '{}'", self.descriptor.name)
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let Some(name) = created.metadata.name {
                self.client.delete_secret(&name).await?;
            }
        }
        Ok(())
    }
}
