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

use crate::domain::scenario::descriptor::PodDescriptor;
use crate::domain::scenario::runner::ManagedResource;
use crate::infrastructure::constants::*;
use crate::infrastructure::kubernetes::client::ClusterClient;
use crate::infrastructure::kubernetes::resources::pod::TestPod;
use crate::shared::error::{ConformanceError, Result};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A StatefulSet whose claims come from volume-claim templates, one per
/// descriptor volume. Pods are addressed by ordinal (`<name>-0`, ...).
pub struct TestStatefulSet {
    client: Arc<dyn ClusterClient>,
    descriptor: PodDescriptor,
    replicas: i32,
    service_name: String,
    labels: BTreeMap<String, String>,
    created: Option<StatefulSet>,
}

impl TestStatefulSet {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        descriptor: PodDescriptor,
        replicas: i32,
        service_name: String,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            descriptor,
            replicas,
            service_name,
            labels,
            created: None,
        }
    }

    pub fn build_manifest(
        descriptor: &PodDescriptor,
        replicas: i32,
        service_name: &str,
        labels: &BTreeMap<String, String>,
    ) -> StatefulSet {
        StatefulSet {
            metadata: ObjectMeta {
                generate_name: Some(STATEFULSET_NAME_PREFIX.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(replicas),
                service_name: service_name.to_string(),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels.clone()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![TestPod::build_container(descriptor)],
                        restart_policy: Some(RESTART_POLICY_ALWAYS.to_string()),
                        ..Default::default()
                    }),
                },
                volume_claim_templates: Some(Self::build_volume_claim_templates(
                    descriptor, labels,
                )),
                pod_management_policy: Some("Parallel".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_volume_claim_templates(
        descriptor: &PodDescriptor,
        labels: &BTreeMap<String, String>,
    ) -> Vec<PersistentVolumeClaim> {
        descriptor
            .volumes
            .iter()
            .enumerate()
            .map(|(i, volume)| PersistentVolumeClaim {
                metadata: ObjectMeta {
                    name: Some(volume.mount.volume_name(i)),
                    labels: Some(labels.clone()),
                    ..Default::default()
                },
                spec: Some(PersistentVolumeClaimSpec {
                    access_modes: Some(vec![DEFAULT_ACCESS_MODE.to_string()]),
                    storage_class_name: Some(volume.storage_class.clone()),
                    resources: Some(k8s_openapi::api::core::v1::VolumeResourceRequirements {
                        requests: Some({
                            let mut reqs = BTreeMap::new();
                            reqs.insert(
                                "storage".to_string(),
                                Quantity(volume.claim_size.clone()),
                            );
                            reqs
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                status: None,
            })
            .collect()
    }

    pub fn name(&self) -> Option<&str> {
        self.created
            .as_ref()
            .and_then(|ss| ss.metadata.name.as_deref())
    }

    pub fn pod_name(&self, ordinal: i32) -> Option<String> {
        self.name().map(|name| format!("{}-{}", name, ordinal))
    }

    /// Submits the StatefulSet and blocks until every replica is ready.
    /// Returns the generated StatefulSet name.
    pub async fn create(&mut self) -> Result<String> {
        let manifest =
            Self::build_manifest(&self.descriptor, self.replicas, &self.service_name, &self.labels);
        let created = self.client.create_statefulset(&manifest).await?;
        let name = created.metadata.name.clone().ok_or_else(|| {
            ConformanceError::KubeApi("created StatefulSet has no name".to_string())
        })?;
        self.created = Some(created);

        self.wait_until_ready(&name).await?;
        Ok(name)
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        let mut waited = 0;
        while waited < WORKLOAD_READY_TIMEOUT_SECS {
            let statefulset = self.client.get_statefulset(name).await?;
            let ready = statefulset
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0);
            if ready == self.replicas {
                tracing::debug!(statefulset = name, ready, "statefulset ready");
                return Ok(());
            }
            sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
            waited += CHECK_INTERVAL_SECS;
        }

        Err(ConformanceError::provision_timeout(
            "StatefulSet",
            name,
            "Ready",
            WORKLOAD_READY_TIMEOUT_SECS,
        ))
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestStatefulSet {
    fn describe(&self) -> String {
        format!("StatefulSet '{}'", self.name().unwrap_or(STATEFULSET_NAME_PREFIX))
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let (Some(name), Some(uid)) = (created.metadata.name, created.metadata.uid) {
                self.client.delete_statefulset(&name).await?;
                self.client.await_statefulset_deletion(&name, &uid).await?;
            }
            // Claims created from the templates outlive the StatefulSet;
            // they carry the scenario labels, so collect them here.
            self.client.delete_pvcs_with_labels(&self.labels).await?;
        }
        Ok(())
    }
}
