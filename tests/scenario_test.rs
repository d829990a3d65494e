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

#[cfg(test)]
mod tests {
    use csi_conformance::domain::scenario::quantity_gib;
    use csi_conformance::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn sample_volume() -> VolumeDescriptor {
        VolumeDescriptor {
            name_prefix: "csi-vol-5iops-".to_string(),
            storage_class: "csi-block-5iops-tier".to_string(),
            fs_type: "ext4".to_string(),
            claim_size: "15Gi".to_string(),
            reclaim_policy: ReclaimPolicy::Delete,
            mount_options: vec!["rw".to_string()],
            mount: VolumeMountDescriptor::default(),
        }
    }

    fn sample_pod() -> PodDescriptor {
        PodDescriptor::new(
            "echo 'hello world' >> /mnt/test-1/data && while true; do sleep 2; done",
            vec![sample_volume()],
        )
    }

    fn sample_labels() -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "csi-e2e-test".to_string());
        labels.insert("type".to_string(), "csi-conformance-e2e".to_string());
        labels
    }

    #[test]
    fn test_volume_descriptor_validation() {
        assert!(sample_volume().validate().is_ok());

        let mut invalid = sample_volume();
        invalid.name_prefix = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = sample_volume();
        invalid.storage_class = String::new();
        assert!(invalid.validate().is_err());

        // Claim size must be a positive capacity
        let mut invalid = sample_volume();
        invalid.claim_size = "0Gi".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = sample_volume();
        invalid.claim_size = "fifteen".to_string();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_pod_descriptor_validation() {
        assert!(sample_pod().validate().is_ok());

        let mut invalid = sample_pod();
        invalid.cmd = "  ".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = sample_pod();
        invalid.volumes.clear();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_reclaim_policy() {
        assert_eq!(ReclaimPolicy::default(), ReclaimPolicy::Delete);
        assert_eq!("Retain".parse::<ReclaimPolicy>().unwrap(), ReclaimPolicy::Retain);
        assert!("retain".parse::<ReclaimPolicy>().is_err());
        assert_eq!(ReclaimPolicy::Delete.as_str(), "Delete");
    }

    #[test]
    fn test_quantity_gib() {
        assert_eq!(quantity_gib("15Gi"), Some(15));
        assert_eq!(quantity_gib("2Ti"), Some(2048));
        assert_eq!(quantity_gib("512Mi"), Some(0));
        assert_eq!(quantity_gib("2048Mi"), Some(2));
        assert_eq!(quantity_gib("abc"), None);
        assert_eq!(quantity_gib("15G"), None);
    }

    #[test]
    fn test_mount_naming() {
        let mount = VolumeMountDescriptor::default();
        assert_eq!(mount.volume_name(0), "test-volume-1");
        assert_eq!(mount.mount_path(0), "/mnt/test-1");
        assert_eq!(mount.mount_path(2), "/mnt/test-3");
    }

    #[test]
    fn test_volume_name_generation_mode() {
        assert!(sample_volume().generates_name());

        let mut fixed = sample_volume();
        fixed.name_prefix = "csi-vol-block-custom".to_string();
        assert!(!fixed.generates_name());
    }

    #[test]
    fn test_pvc_manifest() {
        let pvc = TestPvc::build_manifest(&sample_volume(), &sample_labels());
        assert_eq!(pvc.metadata.generate_name.as_deref(), Some("csi-vol-5iops-"));
        assert_eq!(pvc.metadata.name, None);

        let spec = pvc.spec.expect("PVC spec");
        assert_eq!(spec.storage_class_name.as_deref(), Some("csi-block-5iops-tier"));
        let requests = spec
            .resources
            .and_then(|r| r.requests)
            .expect("storage request");
        assert_eq!(requests.get("storage").unwrap().0, "15Gi");
    }

    #[test]
    fn test_pvc_manifest_fixed_name() {
        let mut volume = sample_volume();
        volume.name_prefix = "csi-vol-block-custom".to_string();

        let pvc = TestPvc::build_manifest(&volume, &sample_labels());
        assert_eq!(pvc.metadata.name.as_deref(), Some("csi-vol-block-custom"));
        assert_eq!(pvc.metadata.generate_name, None);
    }

    #[test]
    fn test_pod_manifest() {
        let pod = TestPod::build_manifest(
            &sample_pod(),
            &["csi-vol-5iops-abc12".to_string()],
            &sample_labels(),
        );

        let spec = pod.spec.expect("pod spec");
        assert_eq!(spec.restart_policy.as_deref(), Some("Always"));

        let container = &spec.containers[0];
        assert_eq!(container.name, "volume-tester");
        let command = container.command.as_ref().expect("command");
        assert_eq!(command[0], "/bin/sh");
        assert_eq!(command[1], "-c");
        assert!(command[2].contains("/mnt/test-1/data"));

        let mounts = container.volume_mounts.as_ref().expect("mounts");
        assert_eq!(mounts[0].name, "test-volume-1");
        assert_eq!(mounts[0].mount_path, "/mnt/test-1");

        let volumes = spec.volumes.expect("volumes");
        assert_eq!(
            volumes[0]
                .persistent_volume_claim
                .as_ref()
                .expect("claim source")
                .claim_name,
            "csi-vol-5iops-abc12"
        );
    }

    #[test]
    fn test_pod_manifest_exiting_command() {
        let mut descriptor = sample_pod();
        descriptor.cmd_exits = true;

        let pod = TestPod::build_manifest(
            &descriptor,
            &["csi-vol-5iops-abc12".to_string()],
            &sample_labels(),
        );
        assert_eq!(
            pod.spec.expect("pod spec").restart_policy.as_deref(),
            Some("Never")
        );
    }

    #[test]
    fn test_deployment_manifest() {
        let deployment = TestDeployment::build_manifest(
            &sample_pod(),
            &["csi-vol-5iops-abc12".to_string()],
            &sample_labels(),
        );

        let spec = deployment.spec.expect("deployment spec");
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.selector.match_labels, Some(sample_labels()));
        assert_eq!(
            spec.template
                .metadata
                .expect("template metadata")
                .labels
                .expect("template labels"),
            sample_labels()
        );
    }

    #[test]
    fn test_statefulset_manifest() {
        let statefulset =
            TestStatefulSet::build_manifest(&sample_pod(), 2, "csi-e2e-service-xyz", &sample_labels());

        let spec = statefulset.spec.expect("statefulset spec");
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.service_name, "csi-e2e-service-xyz");

        let templates = spec.volume_claim_templates.expect("claim templates");
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].metadata.name.as_deref(), Some("test-volume-1"));
        assert_eq!(
            templates[0]
                .spec
                .as_ref()
                .expect("template spec")
                .storage_class_name
                .as_deref(),
            Some("csi-block-5iops-tier")
        );
    }

    #[test]
    fn test_headless_service_manifest() {
        let service = TestHeadlessService::build_manifest(&sample_labels());
        let spec = service.spec.expect("service spec");
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.selector, Some(sample_labels()));
        assert_eq!(spec.publish_not_ready_addresses, Some(true));
    }

    #[test]
    fn test_secret_manifest() {
        let secret = TestSecret::build_manifest(&SecretDescriptor {
            name: "csi-vol-block-custom".to_string(),
            iops: "800".to_string(),
            tags: "e2e test".to_string(),
            encrypted: false,
            encryption_key: String::new(),
            profile: "block.csi.example.com".to_string(),
        });

        assert_eq!(secret.metadata.name.as_deref(), Some("csi-vol-block-custom"));
        assert_eq!(secret.type_.as_deref(), Some("block.csi.example.com"));

        let data = secret.string_data.expect("string data");
        assert_eq!(data.get("iops").map(String::as_str), Some("800"));
        assert_eq!(data.get("encrypted").map(String::as_str), Some("false"));
        // Empty key material is omitted entirely
        assert!(!data.contains_key("encryptionKey"));
    }

    #[test]
    fn test_exec_check_checkpoints() {
        let check = ExecCheck::new(
            vec!["cat".to_string(), "/mnt/test-1/data".to_string()],
            vec!["hello world\n".to_string(), "hello world\nhello world\n".to_string()],
        );
        assert!(check.validate().is_ok());
        assert_eq!(check.checkpoints(), 2);
        assert_eq!(check.last_checkpoint(), 1);

        let invalid = ExecCheck::new(vec![], vec!["hello world\n".to_string()]);
        assert!(invalid.validate().is_err());

        let invalid = ExecCheck::new(vec!["cat".to_string()], vec![]);
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_builtin_catalog() {
        let config = SuiteConfig::default();
        let scenarios = builtin_scenarios(&config);
        assert_eq!(scenarios.len(), 8);

        for scenario in &scenarios {
            assert!(
                scenario.validate().is_ok(),
                "catalog scenario '{}' failed validation",
                scenario.name()
            );
        }

        let names: Vec<&str> = scenarios.iter().map(|s| s.name()).collect();
        assert!(names.contains(&"5iops SC DEPLOYMENT Test"));
        assert!(names.contains(&"Custom SC POD Test"));
        assert!(names.contains(&"Cordon and Drain Node"));
        assert!(names.contains(&"5iops SC POD Test and resize volume"));
    }

    #[test]
    fn test_scenario_validation_rejects_single_checkpoint_deploy() {
        let scenario = DeployScenario {
            name: "single checkpoint".to_string(),
            pod: sample_pod(),
            check: ExecCheck::new(
                vec!["cat".to_string(), "/mnt/test-1/data".to_string()],
                vec!["hello world\n".to_string()],
            ),
        };
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_resize_scenario_validation() {
        let check = ExecCheck::new(
            vec!["cat".to_string(), "/mnt/test-1/data".to_string()],
            vec!["hello world\n".to_string(), "hello world\nhello world\n".to_string()],
        );

        let mut volume = sample_volume();
        volume.claim_size = "260Gi".to_string();
        let pod = PodDescriptor::new("echo hi >> /mnt/test-1/data && sleep 1000", vec![volume]);

        let scenario = ResizeScenario {
            name: "resize".to_string(),
            pods: vec![pod.clone()],
            check: check.clone(),
            expand_gib: 2000,
            expect_min_gib: 1900,
        };
        assert!(scenario.validate().is_ok());

        // Expansion must grow the claim
        let shrinking = ResizeScenario {
            name: "shrink".to_string(),
            pods: vec![pod.clone()],
            check: check.clone(),
            expand_gib: 100,
            expect_min_gib: 90,
        };
        assert!(shrinking.validate().is_err());

        // The observation floor cannot exceed the requested size
        let inverted = ResizeScenario {
            name: "inverted".to_string(),
            pods: vec![pod],
            check,
            expand_gib: 2000,
            expect_min_gib: 2100,
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_suite_config_defaults() {
        let config = SuiteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.namespace, "default");
        assert_eq!(config.suite_tag, "BLK-CSI-E2E");
        assert_eq!(config.storage_classes.five_iops, "csi-block-5iops-tier");
    }

    #[test]
    fn test_suite_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
namespace = "csi-test"
suite_tag = "VPC-BLK-CSI-TEST"

[storage_classes]
five_iops = "ibmc-vpc-block-5iops-tier"
"#
        )
        .unwrap();

        let config = SuiteConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.namespace, "csi-test");
        assert_eq!(config.suite_tag, "VPC-BLK-CSI-TEST");
        assert_eq!(config.storage_classes.five_iops, "ibmc-vpc-block-5iops-tier");
        // Unspecified values keep their defaults
        assert_eq!(config.storage_classes.custom, "csi-block-custom");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_suite_config_rejects_empty_values() {
        let mut config = SuiteConfig::default();
        config.namespace = String::new();
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.storage_classes.custom = String::new();
        assert!(config.validate().is_err());
    }
}
