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

//! Node cordon/drain fault injection.

use crate::domain::scenario::runner::ManagedResource;
use crate::infrastructure::constants::*;
use crate::shared::error::{ConformanceError, Result};
use backon::{ExponentialBuilder, Retryable};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{EvictParams, ListParams};
use kube::{Api, Client};
use std::time::Duration;
use tokio::time::sleep;

/// Marks a node unschedulable and evicts its workloads, forcing the
/// orchestrator to reschedule them elsewhere. Evictions rejected by a
/// disruption budget are retried with exponential backoff up to a bounded
/// attempt count.
#[derive(Clone)]
pub struct NodeDrainer {
    client: Client,
}

impl NodeDrainer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    pub async fn cordon(&self, node_name: &str) -> Result<()> {
        self.nodes().cordon(node_name).await.map_err(|e| {
            ConformanceError::disruption(format!("cordon of node '{}' failed: {}", node_name, e))
        })?;
        tracing::info!(node = node_name, "node cordoned");
        Ok(())
    }

    pub async fn uncordon(&self, node_name: &str) -> Result<()> {
        self.nodes().uncordon(node_name).await.map_err(|e| {
            ConformanceError::disruption(format!("uncordon of node '{}' failed: {}", node_name, e))
        })?;
        tracing::info!(node = node_name, "node uncordoned");
        Ok(())
    }

    /// Cordons the node, evicts every evictable Pod on it and blocks until
    /// the node is empty.
    pub async fn drain(&self, node_name: &str) -> Result<()> {
        self.cordon(node_name).await?;

        let pods = self.evictable_pods(node_name).await?;
        tracing::info!(node = node_name, count = pods.len(), "evicting pods");
        for pod in &pods {
            self.evict_with_retry(pod).await?;
        }

        self.wait_until_drained(node_name).await
    }

    async fn evictable_pods(&self, node_name: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let lp = ListParams::default().fields(&format!("spec.nodeName={}", node_name));
        let pods = api.list(&lp).await?;
        Ok(pods.items.into_iter().filter(Self::is_evictable).collect())
    }

    fn is_evictable(pod: &Pod) -> bool {
        if pod
            .metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(MIRROR_POD_ANNOTATION))
        {
            return false;
        }
        if pod
            .metadata
            .owner_references
            .as_ref()
            .is_some_and(|refs| refs.iter().any(|r| r.kind == OWNER_KIND_DAEMONSET))
        {
            return false;
        }
        !matches!(
            pod.status.as_ref().and_then(|s| s.phase.as_deref()),
            Some("Succeeded") | Some("Failed")
        )
    }

    async fn evict_with_retry(&self, pod: &Pod) -> Result<()> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);

        let evict = || {
            let api = api.clone();
            let name = name.clone();
            async move { api.evict(&name, &EvictParams::default()).await }
        };

        evict
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(EVICTION_MIN_BACKOFF_SECS))
                    .with_max_delay(Duration::from_secs(EVICTION_MAX_BACKOFF_SECS))
                    .with_max_times(EVICTION_MAX_RETRIES),
            )
            // 429 is the disruption-budget rejection
            .when(|e| matches!(e, kube::Error::Api(ae) if ae.code == 429))
            .notify(|err, dur| {
                tracing::warn!(
                    pod = %name,
                    delay_secs = dur.as_secs(),
                    "eviction rejected, retrying: {}",
                    err
                );
            })
            .await
            .map(|_| ())
            .map_err(|e| {
                ConformanceError::disruption(format!(
                    "eviction of pod '{}/{}' did not complete: {}",
                    namespace, name, e
                ))
            })
    }

    async fn wait_until_drained(&self, node_name: &str) -> Result<()> {
        let mut waited = 0;
        while waited < DRAIN_TIMEOUT_SECS {
            let remaining = self.evictable_pods(node_name).await?;
            if remaining.is_empty() {
                tracing::info!(node = node_name, "node drained");
                return Ok(());
            }
            sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
            waited += CHECK_INTERVAL_SECS;
        }

        Err(ConformanceError::disruption(format!(
            "node '{}' still hosts evictable pods after {}s",
            node_name, DRAIN_TIMEOUT_SECS
        )))
    }
}

/// Restores a cordoned node's schedulability during scenario cleanup, so
/// the suite leaves the cluster in its original condition.
pub struct UncordonGuard {
    drainer: NodeDrainer,
    node_name: String,
    armed: bool,
}

impl UncordonGuard {
    pub fn new(client: Client, node_name: String) -> Self {
        Self {
            drainer: NodeDrainer::new(client),
            node_name,
            armed: true,
        }
    }
}

#[async_trait::async_trait]
impl ManagedResource for UncordonGuard {
    fn describe(&self) -> String {
        format!("cordon on node '{}'", self.node_name)
    }

    async fn cleanup(&mut self) -> Result<()> {
        if self.armed {
            self.armed = false;
            self.drainer.uncordon(&self.node_name).await?;
        }
        Ok(())
    }
}
