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

use crate::infrastructure::constants::*;
use crate::shared::error::ConformanceError;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service};
use kube::api::{AttachParams, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Namespaced view of the cluster API used by scenarios and resource
/// handles. The connection is supplied externally and never closed here.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    fn kube_client(&self) -> Client;

    fn namespace(&self) -> &str;

    async fn create_pvc(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ConformanceError>;

    async fn get_pvc(&self, name: &str) -> Result<PersistentVolumeClaim, ConformanceError>;

    async fn delete_pvc(&self, name: &str) -> Result<(), ConformanceError>;

    async fn delete_pvcs_with_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), ConformanceError>;

    async fn patch_pvc_capacity(&self, name: &str, capacity: &str)
        -> Result<(), ConformanceError>;

    async fn get_pv(&self, name: &str) -> Result<PersistentVolume, ConformanceError>;

    async fn patch_pv_volume_settings(
        &self,
        name: &str,
        reclaim_policy: &str,
        mount_options: &[String],
    ) -> Result<(), ConformanceError>;

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ConformanceError>;

    async fn get_pod(&self, name: &str) -> Result<Pod, ConformanceError>;

    async fn delete_pod(&self, name: &str) -> Result<(), ConformanceError>;

    async fn list_pods_with_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, ConformanceError>;

    async fn exec_pod(&self, name: &str, command: &[String]) -> Result<String, ConformanceError>;

    async fn create_deployment(
        &self,
        deployment: &Deployment,
    ) -> Result<Deployment, ConformanceError>;

    async fn get_deployment(&self, name: &str) -> Result<Deployment, ConformanceError>;

    async fn delete_deployment(&self, name: &str) -> Result<(), ConformanceError>;

    async fn create_statefulset(
        &self,
        statefulset: &StatefulSet,
    ) -> Result<StatefulSet, ConformanceError>;

    async fn get_statefulset(&self, name: &str) -> Result<StatefulSet, ConformanceError>;

    async fn delete_statefulset(&self, name: &str) -> Result<(), ConformanceError>;

    async fn create_service(&self, service: &Service) -> Result<Service, ConformanceError>;

    async fn delete_service(&self, name: &str) -> Result<(), ConformanceError>;

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, ConformanceError>;

    async fn delete_secret(&self, name: &str) -> Result<(), ConformanceError>;

    async fn await_pvc_deletion(&self, name: &str, uid: &str) -> Result<(), ConformanceError>;

    async fn await_pod_deletion(&self, name: &str, uid: &str) -> Result<(), ConformanceError>;

    async fn await_deployment_deletion(
        &self,
        name: &str,
        uid: &str,
    ) -> Result<(), ConformanceError>;

    async fn await_statefulset_deletion(
        &self,
        name: &str,
        uid: &str,
    ) -> Result<(), ConformanceError>;
}

pub struct ClusterClientImpl {
    client: Client,
    namespace: String,
}

impl ClusterClientImpl {
    pub async fn new(namespace: String) -> Result<Self, ConformanceError> {
        let client = Client::try_default().await.map_err(|e| {
            ConformanceError::KubeApi(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client, namespace })
    }

    pub async fn new_with_config(
        namespace: String,
        kubeconfig_path: Option<String>,
        context: Option<String>,
    ) -> Result<Self, ConformanceError> {
        use kube::config::{KubeConfigOptions, Kubeconfig};

        let kubeconfig = if let Some(path) = kubeconfig_path {
            Kubeconfig::read_from(path).map_err(|e| {
                ConformanceError::KubeApi(format!("Failed to load kubeconfig: {}", e))
            })?
        } else {
            Kubeconfig::read().map_err(|e| {
                ConformanceError::KubeApi(format!("Failed to load kubeconfig: {}", e))
            })?
        };

        let config_options = KubeConfigOptions {
            context,
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &config_options)
            .await
            .map_err(|e| {
                ConformanceError::KubeApi(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            ConformanceError::KubeApi(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client, namespace })
    }

    fn pvcs(&self) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn statefulsets(&self) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn secrets(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Deletes a resource, treating "already gone" as success so cleanup
    /// stays idempotent.
    async fn delete_tolerant<K>(api: &Api<K>, name: &str) -> Result<(), ConformanceError>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    {
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(ConformanceError::KubeApi(e.to_string())),
        }
    }

    async fn await_deletion<K>(
        api: Api<K>,
        resource_type: &str,
        name: &str,
        uid: &str,
    ) -> Result<(), ConformanceError>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug + Send + 'static,
    {
        let deleted = await_condition(api, name, conditions::is_deleted(uid));
        match tokio::time::timeout(Duration::from_secs(DELETION_SETTLE_TIMEOUT_SECS), deleted).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ConformanceError::KubeApi(e.to_string())),
            Err(_) => Err(ConformanceError::provision_timeout(
                resource_type,
                name,
                "deletion",
                DELETION_SETTLE_TIMEOUT_SECS,
            )),
        }
    }
}

#[async_trait::async_trait]
impl ClusterClient for ClusterClientImpl {
    fn kube_client(&self) -> Client {
        self.client.clone()
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_pvc(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ConformanceError> {
        Ok(self.pvcs().create(&PostParams::default(), pvc).await?)
    }

    async fn get_pvc(&self, name: &str) -> Result<PersistentVolumeClaim, ConformanceError> {
        Ok(self.pvcs().get(name).await?)
    }

    async fn delete_pvc(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.pvcs(), name).await
    }

    async fn delete_pvcs_with_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), ConformanceError> {
        let api = self.pvcs();
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        let lp = ListParams::default().labels(&selector);

        let pvcs = api.list(&lp).await?;
        for pvc in pvcs.items {
            if let Some(name) = pvc.metadata.name.as_ref() {
                Self::delete_tolerant(&api, name).await?;
            }
        }
        Ok(())
    }

    async fn patch_pvc_capacity(
        &self,
        name: &str,
        capacity: &str,
    ) -> Result<(), ConformanceError> {
        let patch = serde_json::json!({
            "spec": {
                "resources": {
                    "requests": {
                        "storage": capacity
                    }
                }
            }
        });
        self.pvcs()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn get_pv(&self, name: &str) -> Result<PersistentVolume, ConformanceError> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn patch_pv_volume_settings(
        &self,
        name: &str,
        reclaim_policy: &str,
        mount_options: &[String],
    ) -> Result<(), ConformanceError> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        let mut spec = serde_json::json!({
            "persistentVolumeReclaimPolicy": reclaim_policy
        });
        if !mount_options.is_empty() {
            spec["mountOptions"] = serde_json::json!(mount_options);
        }
        let patch = serde_json::json!({ "spec": spec });
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ConformanceError> {
        Ok(self.pods().create(&PostParams::default(), pod).await?)
    }

    async fn get_pod(&self, name: &str) -> Result<Pod, ConformanceError> {
        Ok(self.pods().get(name).await?)
    }

    async fn delete_pod(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.pods(), name).await
    }

    async fn list_pods_with_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, ConformanceError> {
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        let lp = ListParams::default().labels(&selector);

        let pods = self.pods().list(&lp).await?;
        Ok(pods.items)
    }

    async fn exec_pod(&self, name: &str, command: &[String]) -> Result<String, ConformanceError> {
        let ap = AttachParams::default()
            .container(CONTAINER_NAME_TESTER)
            .stderr(true);
        let mut attached = self
            .pods()
            .exec(name, command.to_vec(), &ap)
            .await
            .map_err(|e| {
                ConformanceError::KubeApi(format!("exec in pod '{}' failed: {}", name, e))
            })?;

        let mut stdout = String::new();
        if let Some(mut reader) = attached.stdout() {
            reader.read_to_string(&mut stdout).await?;
        }
        let mut stderr = String::new();
        if let Some(mut reader) = attached.stderr() {
            reader.read_to_string(&mut stderr).await?;
        }
        attached
            .join()
            .await
            .map_err(|e| ConformanceError::KubeApi(format!("exec join failed: {}", e)))?;

        if !stderr.is_empty() {
            tracing::warn!(pod = name, stderr = %stderr, "exec produced stderr output");
        }

        Ok(stdout)
    }

    async fn create_deployment(
        &self,
        deployment: &Deployment,
    ) -> Result<Deployment, ConformanceError> {
        Ok(self
            .deployments()
            .create(&PostParams::default(), deployment)
            .await?)
    }

    async fn get_deployment(&self, name: &str) -> Result<Deployment, ConformanceError> {
        Ok(self.deployments().get(name).await?)
    }

    async fn delete_deployment(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.deployments(), name).await
    }

    async fn create_statefulset(
        &self,
        statefulset: &StatefulSet,
    ) -> Result<StatefulSet, ConformanceError> {
        Ok(self
            .statefulsets()
            .create(&PostParams::default(), statefulset)
            .await?)
    }

    async fn get_statefulset(&self, name: &str) -> Result<StatefulSet, ConformanceError> {
        Ok(self.statefulsets().get(name).await?)
    }

    async fn delete_statefulset(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.statefulsets(), name).await
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ConformanceError> {
        Ok(self
            .services()
            .create(&PostParams::default(), service)
            .await?)
    }

    async fn delete_service(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.services(), name).await
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, ConformanceError> {
        Ok(self.secrets().create(&PostParams::default(), secret).await?)
    }

    async fn delete_secret(&self, name: &str) -> Result<(), ConformanceError> {
        Self::delete_tolerant(&self.secrets(), name).await
    }

    async fn await_pvc_deletion(&self, name: &str, uid: &str) -> Result<(), ConformanceError> {
        Self::await_deletion(self.pvcs(), "PersistentVolumeClaim", name, uid).await
    }

    async fn await_pod_deletion(&self, name: &str, uid: &str) -> Result<(), ConformanceError> {
        Self::await_deletion(self.pods(), "Pod", name, uid).await
    }

    async fn await_deployment_deletion(
        &self,
        name: &str,
        uid: &str,
    ) -> Result<(), ConformanceError> {
        Self::await_deletion(self.deployments(), "Deployment", name, uid).await
    }

    async fn await_statefulset_deletion(
        &self,
        name: &str,
        uid: &str,
    ) -> Result<(), ConformanceError> {
        Self::await_deletion(self.statefulsets(), "StatefulSet", name, uid).await
    }
}
