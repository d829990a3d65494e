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

use crate::domain::config::SuiteConfig;
use crate::shared::error::ConformanceError;
use kube::Client;

/// Checks the target cluster can actually host the suite before any
/// scenario mutates it.
pub struct SuiteValidator {
    client: Client,
}

impl SuiteValidator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn validate_suite(&self, config: &SuiteConfig) -> Result<(), ConformanceError> {
        self.validate_namespace(&config.namespace).await?;
        for storage_class in config.storage_classes.all() {
            self.validate_storage_class(storage_class).await?;
        }
        Ok(())
    }

    async fn validate_namespace(&self, namespace: &str) -> Result<(), ConformanceError> {
        use k8s_openapi::api::core::v1::Namespace;
        use kube::api::Api;

        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(namespace).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(ConformanceError::ValidationError(
                format!("Namespace '{}' not found", namespace),
            )),
            Err(e) => Err(ConformanceError::KubeApi(format!(
                "Failed to check namespace '{}': {}",
                namespace, e
            ))),
        }
    }

    async fn validate_storage_class(
        &self,
        storage_class_name: &str,
    ) -> Result<(), ConformanceError> {
        use k8s_openapi::api::storage::v1::StorageClass;
        use kube::api::Api;

        let api: Api<StorageClass> = Api::all(self.client.clone());

        match api.get(storage_class_name).await {
            Ok(_) => Ok(()),
            Err(kube::error::Error::Api(ae)) if ae.code == 404 => {
                let available_classes = self.list_storage_classes().await.unwrap_or_default();
                Err(ConformanceError::ValidationError(format!(
                    "\n StorageClass not found\n\
                    \n  Requested: '{}'\n\
\n Available StorageClasses:\n{}\n\
\n Point the suite configuration at one of the above or install the storage class before running.",
                    storage_class_name,
                    if available_classes.is_empty() {
                        "  (none found)".to_string()
                    } else {
                        available_classes
                            .into_iter()
                            .map(|s| format!("  - {}", s))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                )))
            }
            Err(e) => Err(ConformanceError::KubeApi(format!(
                "Failed to check StorageClass '{}': {}",
                storage_class_name, e
            ))),
        }
    }

    async fn list_storage_classes(&self) -> Result<Vec<String>, ConformanceError> {
        use k8s_openapi::api::storage::v1::StorageClass;
        use kube::api::Api;

        let api: Api<StorageClass> = Api::all(self.client.clone());

        match api.list(&Default::default()).await {
            Ok(list) => {
                let names = list
                    .items
                    .iter()
                    .filter_map(|sc| sc.metadata.name.clone())
                    .collect();
                Ok(names)
            }
            Err(e) => Err(ConformanceError::KubeApi(format!(
                "Failed to list StorageClasses: {}",
                e
            ))),
        }
    }
}
