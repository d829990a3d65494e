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
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A single-replica Deployment wrapping the tester Pod, so the controller
/// replaces the Pod when a scenario deletes it.
pub struct TestDeployment {
    client: Arc<dyn ClusterClient>,
    descriptor: PodDescriptor,
    claim_names: Vec<String>,
    labels: BTreeMap<String, String>,
    created: Option<Deployment>,
}

impl TestDeployment {
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

    pub fn build_manifest(
        descriptor: &PodDescriptor,
        claim_names: &[String],
        labels: &BTreeMap<String, String>,
    ) -> Deployment {
        let pod = TestPod::build_manifest(descriptor, claim_names, labels);

        Deployment {
            metadata: ObjectMeta {
                generate_name: Some(DEPLOYMENT_NAME_PREFIX.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels.clone()),
                        ..Default::default()
                    }),
                    spec: pod.spec,
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.created
            .as_ref()
            .and_then(|d| d.metadata.name.as_deref())
    }

    /// Submits the Deployment and blocks until its single replica is
    /// ready. Returns the generated Deployment name.
    pub async fn create(&mut self) -> Result<String> {
        let manifest = Self::build_manifest(&self.descriptor, &self.claim_names, &self.labels);
        let created = self.client.create_deployment(&manifest).await?;
        let name = created.metadata.name.clone().ok_or_else(|| {
            ConformanceError::KubeApi("created Deployment has no name".to_string())
        })?;
        self.created = Some(created);

        self.wait_until_ready(&name).await?;
        Ok(name)
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        let mut waited = 0;
        while waited < WORKLOAD_READY_TIMEOUT_SECS {
            let deployment = self.client.get_deployment(name).await?;
            let wanted = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
            let ready = deployment
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0);
            if ready == wanted {
                tracing::debug!(deployment = name, ready, "deployment ready");
                return Ok(());
            }
            sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
            waited += CHECK_INTERVAL_SECS;
        }

        Err(ConformanceError::provision_timeout(
            "Deployment",
            name,
            "Ready",
            WORKLOAD_READY_TIMEOUT_SECS,
        ))
    }
}

#[async_trait::async_trait]
impl ManagedResource for TestDeployment {
    fn describe(&self) -> String {
        format!("Deployment '{}'", self.name().unwrap_or(DEPLOYMENT_NAME_PREFIX))
    }

    async fn cleanup(&mut self) -> Result<()> {
        if let Some(created) = self.created.take() {
            if let (Some(name), Some(uid)) = (created.metadata.name, created.metadata.uid) {
                self.client.delete_deployment(&name).await?;
                self.client.await_deployment_deletion(&name, &uid).await?;
            }
        }
        Ok(())
    }
}
