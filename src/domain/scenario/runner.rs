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

//! Scenario execution.
//!
//! Every scenario follows the same lifecycle: validate descriptors, create
//! resources (claims first, their consumers after), verify volume contents,
//! optionally disrupt (pod restart or node drain) and verify again, then
//! release everything in reverse creation order. Cleanup runs no matter
//! where the forward path stopped, and a cleanup failure never masks the
//! error that aborted the scenario.

use crate::domain::scenario::check::ExecCheck;
use crate::domain::scenario::descriptor::{quantity_gib, PodDescriptor, SecretDescriptor};
use crate::infrastructure::constants::*;
use crate::infrastructure::kubernetes::client::ClusterClient;
use crate::infrastructure::kubernetes::drain::{NodeDrainer, UncordonGuard};
use crate::infrastructure::kubernetes::resources::{
    pod_node_name, TestDeployment, TestHeadlessService, TestPod, TestPvc, TestSecret,
    TestStatefulSet,
};
use crate::shared::error::{ConformanceError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Ambient connection to the target cluster and namespace. Supplied by the
/// suite; the engine never closes it.
pub struct ScenarioContext {
    client: Arc<dyn ClusterClient>,
}

impl ScenarioContext {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn ClusterClient {
        self.client.as_ref()
    }

    pub fn client_arc(&self) -> Arc<dyn ClusterClient> {
        self.client.clone()
    }

    pub fn kube_client(&self) -> kube::Client {
        self.client.kube_client()
    }

    pub fn namespace(&self) -> &str {
        self.client.namespace()
    }
}

/// A cluster object a scenario created and must release.
#[async_trait::async_trait]
pub trait ManagedResource: Send {
    fn describe(&self) -> String;

    /// Deletes the resource and waits for the deletion to settle. Must be
    /// safe to call after a partial create and on an already-released
    /// resource.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Resources registered in creation order, released in reverse so
/// consumers go before the claims they reference.
#[derive(Default)]
pub struct CleanupStack {
    resources: Vec<Box<dyn ManagedResource>>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Box<dyn ManagedResource>) {
        self.resources.push(resource);
    }

    pub async fn release_all(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        while let Some(mut resource) = self.resources.pop() {
            if let Err(e) = resource.cleanup().await {
                tracing::warn!("failed to release {}: {}", resource.describe(), e);
                failures.push(format!("{}: {}", resource.describe(), e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ConformanceError::Cleanup(failures.join("; ")))
        }
    }
}

/// One scenario variant per test case.
pub enum Scenario {
    Deploy(DeployScenario),
    Pod(PodScenario),
    StatefulSet(StatefulSetScenario),
    Resize(ResizeScenario),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::Deploy(s) => &s.name,
            Scenario::Pod(s) => &s.name,
            Scenario::StatefulSet(s) => &s.name,
            Scenario::Resize(s) => &s.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Scenario::Deploy(_) => "deployment",
            Scenario::Pod(_) => "pod",
            Scenario::StatefulSet(_) => "statefulset",
            Scenario::Resize(_) => "resize",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Scenario::Deploy(s) => s.validate(),
            Scenario::Pod(s) => s.validate(),
            Scenario::StatefulSet(s) => s.validate(),
            Scenario::Resize(s) => s.validate(),
        }
    }

    /// Runs the scenario to completion. Descriptors are validated before
    /// any cluster mutation; created resources are always released.
    pub async fn run(&self, ctx: &ScenarioContext) -> Result<()> {
        self.validate()?;

        let mut stack = CleanupStack::new();
        let outcome = match self {
            Scenario::Deploy(s) => s.execute(ctx, &mut stack).await,
            Scenario::Pod(s) => s.execute(ctx, &mut stack).await,
            Scenario::StatefulSet(s) => s.execute(ctx, &mut stack).await,
            Scenario::Resize(s) => s.execute(ctx, &mut stack).await,
        };
        let released = stack.release_all().await;

        match (outcome, released) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(cleanup)) => Err(cleanup),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(cleanup)) => {
                tracing::warn!("cleanup after scenario failure also failed: {}", cleanup);
                Err(primary)
            }
        }
    }
}

/// Dynamic provisioning through a Deployment: write to the volume, delete
/// the Pod, and assert the replacement sees the old content plus the new
/// write (the claim was re-attached, not recreated).
pub struct DeployScenario {
    pub name: String,
    pub pod: PodDescriptor,
    pub check: ExecCheck,
}

impl DeployScenario {
    pub fn validate(&self) -> Result<()> {
        self.pod.validate()?;
        self.check.validate()?;
        if self.check.checkpoints() < 2 {
            return Err(ConformanceError::validation(
                "deployment scenario asserts before and after the pod restart; \
                 two checkpoints are required",
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ScenarioContext, stack: &mut CleanupStack) -> Result<()> {
        let labels = scenario_labels();
        let claims = create_claims(ctx, stack, &self.pod, &labels).await?;

        let mut deployment =
            TestDeployment::new(ctx.client_arc(), self.pod.clone(), claims, labels.clone());
        let created = deployment.create().await;
        stack.push(Box::new(deployment));
        created?;

        let pod_name = running_pod_with_labels(ctx, &labels, &[]).await?;
        self.check.verify(ctx, &pod_name, 0).await?;

        tracing::info!(pod = %pod_name, "deleting pod to force a controller restart");
        ctx.client().delete_pod(&pod_name).await?;
        let replacement = running_pod_with_labels(ctx, &labels, &[&pod_name]).await?;
        self.check.verify(ctx, &replacement, 1).await?;
        Ok(())
    }
}

/// Dynamic provisioning with bare Pods. When the check registers a second
/// checkpoint the Pod is restarted (deleted and re-run against the same
/// claims) before the final assertion.
pub struct PodScenario {
    pub name: String,
    pub pods: Vec<PodDescriptor>,
    pub secret: Option<SecretDescriptor>,
    pub check: ExecCheck,
}

impl PodScenario {
    pub fn validate(&self) -> Result<()> {
        if self.pods.is_empty() {
            return Err(ConformanceError::validation(
                "pod scenario needs at least one pod descriptor",
            ));
        }
        for pod in &self.pods {
            pod.validate()?;
        }
        self.check.validate()
    }

    async fn execute(&self, ctx: &ScenarioContext, stack: &mut CleanupStack) -> Result<()> {
        if let Some(descriptor) = &self.secret {
            let mut secret = TestSecret::new(ctx.client_arc(), descriptor.clone());
            let created = secret.create().await;
            stack.push(Box::new(secret));
            created?;
        }

        for descriptor in &self.pods {
            let labels = scenario_labels();
            let claims = create_claims(ctx, stack, descriptor, &labels).await?;

            let mut pod = TestPod::new(
                ctx.client_arc(),
                descriptor.clone(),
                claims.clone(),
                labels.clone(),
            );
            let created = pod.create().await;
            stack.push(Box::new(pod));
            let pod_name = created?;

            self.check.verify(ctx, &pod_name, 0).await?;

            if self.check.checkpoints() > 1 {
                let replacement =
                    restart_pod(ctx, stack, descriptor, &claims, &labels, &pod_name).await?;
                self.check.verify(ctx, &replacement, 1).await?;
            }
        }
        Ok(())
    }
}

/// Dynamic provisioning through a StatefulSet behind a headless Service,
/// with an optional node drain forcing pod 0 onto another node.
pub struct StatefulSetScenario {
    pub name: String,
    pub pod: PodDescriptor,
    pub check: ExecCheck,
    pub replicas: i32,
    pub drain_node: bool,
}

impl StatefulSetScenario {
    pub fn validate(&self) -> Result<()> {
        self.pod.validate()?;
        self.check.validate()?;
        if self.replicas < 1 {
            return Err(ConformanceError::validation(
                "statefulset scenario needs at least one replica",
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ScenarioContext, stack: &mut CleanupStack) -> Result<()> {
        let labels = scenario_labels();

        let mut service = TestHeadlessService::new(ctx.client_arc(), labels.clone());
        let created = service.create().await;
        stack.push(Box::new(service));
        let service_name = created?;

        let mut statefulset = TestStatefulSet::new(
            ctx.client_arc(),
            self.pod.clone(),
            self.replicas,
            service_name,
            labels.clone(),
        );
        let created = statefulset.create().await;
        stack.push(Box::new(statefulset));
        let statefulset_name = created?;

        let pod_name = format!("{}-0", statefulset_name);
        self.check.verify(ctx, &pod_name, 0).await?;

        if self.drain_node {
            let node = pod_node_name(ctx.client(), &pod_name)
                .await?
                .ok_or_else(|| {
                    ConformanceError::disruption(format!("pod '{}' is not scheduled", pod_name))
                })?;

            // Registered before the drain so the node is uncordoned even
            // when the drain itself fails partway.
            stack.push(Box::new(UncordonGuard::new(ctx.kube_client(), node.clone())));
            NodeDrainer::new(ctx.kube_client()).drain(&node).await?;

            wait_for_pod_rescheduled(ctx, &pod_name, &node).await?;
            self.check
                .verify(ctx, &pod_name, self.check.last_checkpoint())
                .await?;
        }
        Ok(())
    }
}

/// Dynamic provisioning followed by an online volume expansion: write,
/// expand the claim, restart the Pod, and assert both the surviving
/// content and the observed filesystem capacity.
pub struct ResizeScenario {
    pub name: String,
    pub pods: Vec<PodDescriptor>,
    pub check: ExecCheck,
    /// Requested capacity in GiB.
    pub expand_gib: u64,
    /// Floor the observed capacity must reach.
    pub expect_min_gib: u64,
}

impl ResizeScenario {
    pub fn validate(&self) -> Result<()> {
        if self.pods.is_empty() {
            return Err(ConformanceError::validation(
                "resize scenario needs at least one pod descriptor",
            ));
        }
        for pod in &self.pods {
            pod.validate()?;
            for volume in &pod.volumes {
                let original = quantity_gib(&volume.claim_size).unwrap_or(0);
                if self.expand_gib <= original {
                    return Err(ConformanceError::validation(format!(
                        "expansion to {}Gi does not grow a {} claim",
                        self.expand_gib, volume.claim_size
                    )));
                }
            }
        }
        self.check.validate()?;
        if self.check.checkpoints() < 2 {
            return Err(ConformanceError::validation(
                "resize scenario asserts before and after the expansion; \
                 two checkpoints are required",
            ));
        }
        if self.expect_min_gib > self.expand_gib {
            return Err(ConformanceError::validation(
                "expected capacity floor exceeds the requested expansion",
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ScenarioContext, stack: &mut CleanupStack) -> Result<()> {
        for descriptor in &self.pods {
            let labels = scenario_labels();
            let claims = create_claims(ctx, stack, descriptor, &labels).await?;

            let mut pod = TestPod::new(
                ctx.client_arc(),
                descriptor.clone(),
                claims.clone(),
                labels.clone(),
            );
            let created = pod.create().await;
            stack.push(Box::new(pod));
            let pod_name = created?;

            self.check.verify(ctx, &pod_name, 0).await?;

            let capacity = format!("{}Gi", self.expand_gib);
            for claim in &claims {
                tracing::info!(claim = %claim, %capacity, "requesting volume expansion");
                ctx.client().patch_pvc_capacity(claim, &capacity).await?;
            }

            let replacement =
                restart_pod(ctx, stack, descriptor, &claims, &labels, &pod_name).await?;

            for claim in &claims {
                wait_until_resized(ctx, claim, self.expect_min_gib).await?;
            }

            self.check.verify(ctx, &replacement, 1).await?;

            let mount_path = descriptor.volumes[0].mount.mount_path(0);
            let observed = observed_fs_gib(ctx, &replacement, &mount_path).await?;
            if observed < self.expect_min_gib || observed > self.expand_gib {
                return Err(ConformanceError::AssertionMismatch {
                    checkpoint: self.check.last_checkpoint(),
                    expected: format!(
                        "filesystem capacity within [{}Gi, {}Gi]",
                        self.expect_min_gib, self.expand_gib
                    ),
                    actual: format!("{}Gi", observed),
                });
            }
        }
        Ok(())
    }
}

/// Labels stamped on every resource a scenario creates. The `app` value is
/// unique per scenario so concurrent scenarios in one namespace never
/// select each other's pods.
fn scenario_labels() -> BTreeMap<String, String> {
    let instance = format!(
        "csi-e2e-{:x}",
        chrono::Utc::now().timestamp_micros() as u64
    );
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_APP.to_string(), instance);
    labels.insert(LABEL_TYPE.to_string(), LABEL_TYPE_VALUE.to_string());
    labels
}

/// Provisions one claim per descriptor volume, registering each handle for
/// cleanup before the create result is inspected so a partial create still
/// gets released.
async fn create_claims(
    ctx: &ScenarioContext,
    stack: &mut CleanupStack,
    pod: &PodDescriptor,
    labels: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let mut claims = Vec::new();
    for volume in &pod.volumes {
        let mut pvc = TestPvc::new(ctx.client_arc(), volume.clone(), labels.clone());
        let created = pvc.create().await;
        stack.push(Box::new(pvc));
        claims.push(created?);
    }
    Ok(claims)
}

/// Deletes a Pod, waits for it to be fully gone (an RWO claim detaches
/// only then) and runs a replacement against the same claims. Returns the
/// replacement's name after verifying it is Running.
async fn restart_pod(
    ctx: &ScenarioContext,
    stack: &mut CleanupStack,
    descriptor: &PodDescriptor,
    claims: &[String],
    labels: &BTreeMap<String, String>,
    pod_name: &str,
) -> Result<String> {
    let uid = ctx
        .client()
        .get_pod(pod_name)
        .await?
        .metadata
        .uid
        .unwrap_or_default();
    tracing::info!(pod = pod_name, "restarting pod");
    ctx.client().delete_pod(pod_name).await?;
    ctx.client().await_pod_deletion(pod_name, &uid).await?;

    let mut replacement = TestPod::new(
        ctx.client_arc(),
        descriptor.clone(),
        claims.to_vec(),
        labels.clone(),
    );
    let created = replacement.create().await;
    stack.push(Box::new(replacement));
    created
}

/// First Running pod matching `labels`, skipping `exclude` and pods being
/// deleted. Used to locate controller-owned pods.
async fn running_pod_with_labels(
    ctx: &ScenarioContext,
    labels: &BTreeMap<String, String>,
    exclude: &[&str],
) -> Result<String> {
    let mut waited = 0;
    while waited < WORKLOAD_READY_TIMEOUT_SECS {
        for pod in ctx.client().list_pods_with_labels(labels).await? {
            let name = pod.metadata.name.as_deref().unwrap_or_default();
            if exclude.contains(&name) || pod.metadata.deletion_timestamp.is_some() {
                continue;
            }
            if pod.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running") {
                return Ok(name.to_string());
            }
        }
        sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
        waited += CHECK_INTERVAL_SECS;
    }

    Err(ConformanceError::provision_timeout(
        "Pod",
        format!("app={}", labels.get(LABEL_APP).cloned().unwrap_or_default()),
        "Running",
        WORKLOAD_READY_TIMEOUT_SECS,
    ))
}

/// Waits until a StatefulSet pod is Running again on a node other than the
/// one it was drained from.
async fn wait_for_pod_rescheduled(
    ctx: &ScenarioContext,
    pod_name: &str,
    old_node: &str,
) -> Result<()> {
    let mut waited = 0;
    while waited < WORKLOAD_READY_TIMEOUT_SECS {
        if let Ok(pod) = ctx.client().get_pod(pod_name).await {
            let node = pod.spec.as_ref().and_then(|s| s.node_name.as_deref());
            let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
            if pod.metadata.deletion_timestamp.is_none()
                && phase == Some("Running")
                && node.is_some_and(|n| n != old_node)
            {
                tracing::info!(pod = pod_name, node = node.unwrap_or_default(), "pod rescheduled");
                return Ok(());
            }
        }
        sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
        waited += CHECK_INTERVAL_SECS;
    }

    Err(ConformanceError::provision_timeout(
        "Pod",
        pod_name,
        "Running on another node",
        WORKLOAD_READY_TIMEOUT_SECS,
    ))
}

/// Waits for the claim to report a grown capacity and for the filesystem
/// resize condition to clear.
async fn wait_until_resized(ctx: &ScenarioContext, claim: &str, min_gib: u64) -> Result<()> {
    let mut waited = 0;
    while waited < RESIZE_TIMEOUT_SECS {
        let pvc = ctx.client().get_pvc(claim).await?;
        let capacity = pvc
            .status
            .as_ref()
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .and_then(|q| quantity_gib(&q.0))
            .unwrap_or(0);
        let resize_pending = pvc
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|conds| {
                conds
                    .iter()
                    .any(|c| c.type_ == "FileSystemResizePending" && c.status == "True")
            });
        if capacity >= min_gib && !resize_pending {
            tracing::info!(claim, capacity_gib = capacity, "volume expanded");
            return Ok(());
        }
        sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
        waited += CHECK_INTERVAL_SECS;
    }

    Err(ConformanceError::provision_timeout(
        "PersistentVolumeClaim",
        claim,
        format!(">= {}Gi", min_gib),
        RESIZE_TIMEOUT_SECS,
    ))
}

/// Observes the mounted filesystem's capacity in GiB via `df` inside the
/// pod.
async fn observed_fs_gib(ctx: &ScenarioContext, pod_name: &str, mount_path: &str) -> Result<u64> {
    let command = vec![
        "df".to_string(),
        "-Pk".to_string(),
        mount_path.to_string(),
    ];
    let output = ctx.client().exec_pod(pod_name, &command).await?;

    let pattern = Regex::new(r"(?m)^\S+\s+(\d+)\s").map_err(|e| {
        ConformanceError::KubeApi(format!("invalid df capture pattern: {}", e))
    })?;
    let kib = pattern
        .captures(&output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| {
            ConformanceError::KubeApi(format!(
                "could not parse df output for '{}': {:?}",
                mount_path, output
            ))
        })?;
    Ok(kib / (1024 * 1024))
}
