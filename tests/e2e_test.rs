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

//! End-to-end scenarios against a live cluster running the CSI driver
//! under test. Configuration comes from the environment: the target
//! namespace is `default` unless CSI_CONFORMANCE_CONF_FILE points at a
//! suite configuration, E2E_TEST_RESULT names the result artifact and
//! E2E_SECRET_ENCRYPTION_KEY supplies key material for the custom class.

#[cfg(test)]
mod tests {
    use csi_conformance::*;
    use std::sync::Arc;

    async fn suite() -> (ScenarioContext, SuiteConfig) {
        let mut config = match std::env::var("CSI_CONFORMANCE_CONF_FILE") {
            Ok(path) => SuiteConfig::from_file(&path).expect("Failed to load suite configuration"),
            Err(_) => SuiteConfig::default(),
        };
        config.apply_env();
        config.validate().expect("Invalid suite configuration");

        let client = ClusterClientImpl::new(config.namespace.clone())
            .await
            .expect("Failed to create cluster client");
        (ScenarioContext::new(Arc::new(client)), config)
    }

    fn record_pass(config: &SuiteConfig, scenario_name: &str) {
        if let Some(path) = &config.result_file {
            let mut recorder = FileRecorder::open(path).expect("Failed to open result file");
            recorder
                .record(&format!("{}: {}: PASS\n", config.suite_tag, scenario_name))
                .expect("Failed to record result");
        }
    }

    async fn run_catalog_scenario(name: &str) {
        let (ctx, config) = suite().await;
        let scenarios = builtin_scenarios(&config);
        let scenario = scenarios
            .iter()
            .find(|s| s.name() == name)
            .expect("scenario not in catalog");

        scenario.run(&ctx).await.expect("scenario failed");
        record_pass(&config, name);
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_deployment_write_read_5iops() {
        run_catalog_scenario("5iops SC DEPLOYMENT Test").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_deployment_write_read_general_purpose() {
        run_catalog_scenario("GP SC DEPLOYMENT Test").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_pod_write_read_5iops() {
        run_catalog_scenario("5iops SC POD Test").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_pod_write_read_general_purpose() {
        run_catalog_scenario("GP SC POD Test").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_pod_write_read_custom_class_with_secret() {
        run_catalog_scenario("Custom SC POD Test").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_statefulset_write_read() {
        run_catalog_scenario("With Statefulsets").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_statefulset_node_drain() {
        run_catalog_scenario("Cordon and Drain Node").await;
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_pod_resize_volume() {
        run_catalog_scenario("5iops SC POD Test and resize volume").await;
    }

    /// Same flow as the catalog's pod scenarios, but with descriptors
    /// built by hand; exercises the library surface a driver team would
    /// use for their own cases.
    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the CSI driver under test
    async fn test_custom_descriptor_pod_scenario() {
        let (ctx, config) = suite().await;

        let scenario = PodScenario {
            name: "custom descriptor POD Test".to_string(),
            pods: vec![PodDescriptor::new(
                "echo 'hello world' >> /mnt/test-1/data && while true; do sleep 2; done",
                vec![VolumeDescriptor {
                    name_prefix: "csi-vol-custom-case-".to_string(),
                    storage_class: config.storage_classes.general_purpose.clone(),
                    fs_type: "ext4".to_string(),
                    claim_size: "10Gi".to_string(),
                    reclaim_policy: ReclaimPolicy::Delete,
                    mount_options: vec!["rw".to_string()],
                    mount: VolumeMountDescriptor::default(),
                }],
            )],
            secret: None,
            check: ExecCheck::new(
                vec!["cat".to_string(), "/mnt/test-1/data".to_string()],
                vec![
                    "hello world\n".to_string(),
                    "hello world\nhello world\n".to_string(),
                ],
            ),
        };

        Scenario::Pod(scenario)
            .run(&ctx)
            .await
            .expect("scenario failed");
        record_pass(&config, "custom descriptor POD Test");
    }
}
