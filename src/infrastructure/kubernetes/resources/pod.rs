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
use crate::shared::error::{ConformanceError, Result};
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaimVolumeSource, Pod, PodSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A test Pod mounting previously bound claims.
pub struct TestPod {
    client: Arc<dyn ClusterClient>,
    descriptor: PodDescriptor,
    claim_names: Vec<String>,
    labels: BTreeMap<String, String>,
    created: Option<Pod>,
}

impl TestPod {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        descriptor: PodDescriptor,
        claim_names: Vec<String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            descriptor,
            claim_names,
            labels,
            created: None,
        }
    }

    /// The tester container shared by Pod, Deployment and StatefulSet
    /// manifests: a shell running the descriptor's command with one mount
    /// per volume.
    pub fn build_container(descriptor: &PodDescriptor) -> Container {
        let mounts = descriptor
            .volumes
            .iter()
            .enumerate()
            .map(|(i, volume)| VolumeMount {
                name: volume.mount.volume_name(i),
                mount_path: volume.mount.mount_path(i),
                ..Default::default()
            })
            .collect();

        Container {
            name: CONTAINER_NAME_TESTER.to_string(),
            image: Some(descriptor.image.clone()),
            command: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                descriptor.cmd.clone(),
            ]),
            volume_mounts: Some(mounts),
            ..Default::default()
        }
    }

    pub fn build_manifest(
        descriptor: &PodDescriptor,
        claim_names: &[String],
        labels: &BTreeMap<String, String>,
    ) -> Pod {
        let volumes = descriptor
            .volumes
            .iter()
            .zip(claim_names.iter())
            .enumerate()
            .map(|(i, (volume, claim_name))| Volume {
                name: volume.mount.volume_name(i),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect();

        let restart_policy = if descriptor.cmd_exits {
            RESTART_POLICY_NEVER
        } else {
            RESTART_POLICY_ALWAYS
        };

        Pod {
            metadata: ObjectMeta {
                generate_name: Some(POD_NAME_PREFIX.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Self::build_container(descriptor)],
                volumes: Some(volumes),
                restart_policy: Some(restart_policy.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.created
            .as_ref()
            .and_then(|pod| pod.metadata.name.as_deref())
    }

    /// Submits the Pod and blocks until it is Running (or Succeeded, for a
    /// command expected to exit). Returns the generated Pod name.
    pub async fn create(&mut self) -> Result<String> {
        let manifest = Self::build_manifest(&self.descriptor, &self.claim_names, &self.labels);
        let created = self.client.create_pod(&manifest).await?;
        let name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| ConformanceError::KubeApi("created Pod has no name".to_string()))?;
        self.created = Some(created);

        let settled = if self.descriptor.cmd_exits {
            &["Running", "Succeeded"][..]
        } else {
            &["Running"][..]
        };
        wait_for_pod_phase(self.client.as_ref(), &name, settled, POD_RUNNING_TIMEOUT_SECS).await?;
        Ok(name)
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestPod {
    fn describe(&self) -> String {
        format!("Pod '{}'", self.name().unwrap_or(POD_NAME_PREFIX))
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let (Some(name), Some(uid)) = (created.metadata.name, created.metadata.uid) {
                self.client.delete_pod(&name).await?;
                self.client.await_pod_deletion(&name, &uid).await?;
            }
        }
        Ok(())
    }
}

/// Polls a Pod until its phase is one of `phases`, failing after
/// `timeout_secs`.
pub async fn wait_for_pod_phase(
    client: &dyn ClusterClient,
    name: &str,
    phases: &[&str],
    timeout_secs: u64,
) -> Result<()> {
    let mut waited = 0;
    while waited < timeout_secs {
        let pod = client.get_pod(name).await?;
        if let Some(phase) = pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
            if phases.contains(&phase) {
                tracing::debug!(pod = name, phase, "pod settled");
                return Ok(());
            }
        }
        sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
        waited += CHECK_INTERVAL_SECS;
    }

    Err(ConformanceError::provision_timeout(
        "Pod",
        name,
        phases.join("|"),
        timeout_secs,
    ))
}

/// The node currently hosting a Pod, if scheduled.
pub async fn pod_node_name(client: &dyn ClusterClient, name: &str) -> Result<Option<String>> {
    let pod = client.get_pod(name).await?;
    Ok(pod.spec.and_then(|s| s.node_name))
}
