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

use crate::domain::scenario::descriptor::VolumeDescriptor;
use crate::domain::scenario::runner::ManagedResource;
use crate::infrastructure::constants::*;
use crate::infrastructure::kubernetes::client::ClusterClient;
use crate::shared::error::{ConformanceError, Result};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A claim provisioned for one scenario. `create` blocks until the claim is
/// bound; `cleanup` deletes it and waits for the deletion to settle.
pub struct TestPvc {
    client: Arc<dyn ClusterClient>,
    descriptor: VolumeDescriptor,
    labels: BTreeMap<String, String>,
    created: Option<PersistentVolumeClaim>,
}

impl TestPvc {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        descriptor: VolumeDescriptor,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            descriptor,
            labels,
            created: None,
        }
    }

    pub fn build_manifest(
        descriptor: &VolumeDescriptor,
        labels: &BTreeMap<String, String>,
    ) -> PersistentVolumeClaim {
        let mut metadata = ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        };
        if descriptor.generates_name() {
            metadata.generate_name = Some(descriptor.name_prefix.clone());
        } else {
            metadata.name = Some(descriptor.name_prefix.clone());
        }

        PersistentVolumeClaim {
            metadata,
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![DEFAULT_ACCESS_MODE.to_string()]),
                storage_class_name: Some(descriptor.storage_class.clone()),
                resources: Some(k8s_openapi::api::core::v1::VolumeResourceRequirements {
                    requests: Some({
                        let mut reqs = BTreeMap::new();
                        reqs.insert(
                            "storage".to_string(),
                            Quantity(descriptor.claim_size.clone()),
                        );
                        reqs
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            status: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.created
            .as_ref()
            .and_then(|pvc| pvc.metadata.name.as_deref())
    }

    /// Submits the claim and blocks until the cluster reports it bound,
    /// then pushes the descriptor's reclaim policy and mount options down
    /// to the bound PV (a claim carries neither). Returns the claim name.
    pub async fn create(&mut self) -> Result<String> {
        let manifest = Self::build_manifest(&self.descriptor, &self.labels);
        let created = self.client.create_pvc(&manifest).await?;
        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| ConformanceError::KubeApi("created PVC has no name".to_string()))?;
        self.created = Some(created);

        self.wait_until_bound(&name).await?;
        self.apply_volume_settings(&name).await?;
        Ok(name)
    }

    async fn wait_until_bound(&self, name: &str) -> Result<()> {
        let mut waited = 0;
        while waited < PVC_BOUND_TIMEOUT_SECS {
            let pvc = self.client.get_pvc(name).await?;
            if let Some(phase) = pvc.status.as_ref().and_then(|s| s.phase.as_deref()) {
                if phase == "Bound" {
                    tracing::debug!(pvc = name, "claim bound");
                    return Ok(());
                }
            }
            sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
            waited += CHECK_INTERVAL_SECS;
        }

        Err(ConformanceError::provision_timeout(
            "PersistentVolumeClaim",
            name,
            "Bound",
            PVC_BOUND_TIMEOUT_SECS,
        ))
    }

    async fn apply_volume_settings(&self, name: &str) -> Result<()> {
        let pvc = self.client.get_pvc(name).await?;
        let pv_name = match pvc.spec.as_ref().and_then(|s| s.volume_name.clone()) {
            Some(pv_name) => pv_name,
            None => return Ok(()),
        };

        let pv = self.client.get_pv(&pv_name).await?;
        let current_policy = pv
            .spec
            .as_ref()
            .and_then(|s| s.persistent_volume_reclaim_policy.as_deref())
            .unwrap_or_default();

        let wanted = self.descriptor.reclaim_policy.as_str();
        if current_policy != wanted || !self.descriptor.mount_options.is_empty() {
            self.client
                .patch_pv_volume_settings(&pv_name, wanted, &self.descriptor.mount_options)
                .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestPvc {
    fn describe(&self) -> String {
        format!(
            "PersistentVolumeClaim '{}'",
            self.name().unwrap_or(&self.descriptor.name_prefix)
        )
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let (Some(name), Some(uid)) = (created.metadata.name, created.metadata.uid) {
                self.client.delete_pvc(&name).await?;
                self.client.await_pvc_deletion(&name, &uid).await?;
            }
        }
        Ok(())
    }
}
