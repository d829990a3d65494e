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

use crate::domain::scenario::runner::ManagedResource;
use crate::infrastructure::constants::SERVICE_NAME_PREFIX;
use crate::infrastructure::kubernetes::client::ClusterClient;
use crate::shared::error::{ConformanceError, Result};
use k8s_openapi::api::core::v1::{Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The headless Service governing a test StatefulSet.
pub struct TestHeadlessService {
    client: Arc<dyn ClusterClient>,
    labels: BTreeMap<String, String>,
    created: Option<Service>,
}

impl TestHeadlessService {
    pub fn new(client: Arc<dyn ClusterClient>, labels: BTreeMap<String, String>) -> Self {
        Self {
            client,
            labels,
            created: None,
        }
    }

    pub fn build_manifest(labels: &BTreeMap<String, String>) -> Service {
        Service {
            metadata: ObjectMeta {
                generate_name: Some(SERVICE_NAME_PREFIX.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some("None".to_string()),
                type_: Some("ClusterIP".to_string()),
                selector: Some(labels.clone()),
                publish_not_ready_addresses: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.created
            .as_ref()
            .and_then(|svc| svc.metadata.name.as_deref())
    }

    pub async fn create(&mut self) -> Result<String> {
        let manifest = Self::build_manifest(&self.labels);
        let created = self.client.create_service(&manifest).await?;
        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| ConformanceError::KubeApi("created Service has no name".to_string()))?;
        self.created = Some(created);
        Ok(name)
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestHeadlessService {
    fn describe(&self) -> String {
        format!("Service '{}'", self.name().unwrap_or(SERVICE_NAME_PREFIX))
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let Some(name) = created.metadata.name {
                self.client.delete_service(&name).await?;
            }
        }
        Ok(())
    }
}
