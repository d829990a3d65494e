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

//! The built-in scenario catalog.
//!
//! One entry per supported storage-class/workload combination: deployments
//! and bare pods on the 5iops and general-purpose tiers, a secret-backed
//! custom tier, StatefulSets with and without a node drain, and a volume
//! expansion case.

use crate::domain::config::SuiteConfig;
use crate::domain::scenario::check::ExecCheck;
use crate::domain::scenario::descriptor::{
    PodDescriptor, ReclaimPolicy, SecretDescriptor, VolumeDescriptor, VolumeMountDescriptor,
};
use crate::domain::scenario::runner::{
    DeployScenario, PodScenario, ResizeScenario, Scenario, StatefulSetScenario,
};

const HELLO: &str = "hello world\n";
const HELLO_TWICE: &str = "hello world\nhello world\n";

/// Appends a line to the volume and keeps the container alive; re-running
/// after a restart leaves two lines.
const APPEND_CMD: &str = "echo 'hello world' >> /mnt/test-1/data && while true; do sleep 2; done";

/// Overwrites the volume's file; content is identical after a reschedule.
const WRITE_CMD: &str = "echo 'hello world' > /mnt/test-1/data && while true; do sleep 2; done";

/// Claim name shared with the provisioning secret of the custom class.
const CUSTOM_CLAIM_NAME: &str = "csi-vol-block-custom";

pub fn builtin_scenarios(config: &SuiteConfig) -> Vec<Scenario> {
    vec![
        Scenario::Deploy(DeployScenario {
            name: "5iops SC DEPLOYMENT Test".to_string(),
            pod: test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.five_iops, "csi-vol-5iops-", "15Gi"),
            ),
            check: cat_check(&[HELLO, HELLO_TWICE]),
        }),
        Scenario::Deploy(DeployScenario {
            name: "GP SC DEPLOYMENT Test".to_string(),
            pod: test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.general_purpose, "csi-vol-gp-", "35Gi"),
            ),
            check: cat_check(&[HELLO, HELLO_TWICE]),
        }),
        Scenario::Pod(PodScenario {
            name: "5iops SC POD Test".to_string(),
            pods: vec![test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.five_iops, "csi-vol-5iops-", "15Gi"),
            )],
            secret: None,
            check: cat_check(&[HELLO, HELLO_TWICE]),
        }),
        Scenario::Pod(PodScenario {
            name: "GP SC POD Test".to_string(),
            pods: vec![test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.general_purpose, "csi-vol-gp-", "35Gi"),
            )],
            secret: None,
            check: cat_check(&[HELLO, HELLO_TWICE]),
        }),
        Scenario::Pod(PodScenario {
            name: "Custom SC POD Test".to_string(),
            pods: vec![test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.custom, CUSTOM_CLAIM_NAME, "45Gi"),
            )],
            secret: Some(SecretDescriptor {
                name: CUSTOM_CLAIM_NAME.to_string(),
                iops: "800".to_string(),
                tags: "e2e test".to_string(),
                encrypted: false,
                encryption_key: config.encryption_key.clone(),
                profile: config.csi_profile.clone(),
            }),
            check: cat_check(&[HELLO, HELLO_TWICE]),
        }),
        Scenario::StatefulSet(StatefulSetScenario {
            name: "With Statefulsets".to_string(),
            pod: test_pod(
                config,
                WRITE_CMD,
                volume(&config.storage_classes.five_iops, "csi-vol-5iops-", "20Gi"),
            ),
            check: cat_check(&[HELLO]),
            replicas: 2,
            drain_node: false,
        }),
        Scenario::StatefulSet(StatefulSetScenario {
            name: "Cordon and Drain Node".to_string(),
            pod: test_pod(
                config,
                WRITE_CMD,
                volume(&config.storage_classes.five_iops, "csi-vol-5iops-", "20Gi"),
            ),
            check: cat_check(&[HELLO]),
            replicas: 1,
            drain_node: true,
        }),
        Scenario::Resize(ResizeScenario {
            name: "5iops SC POD Test and resize volume".to_string(),
            pods: vec![test_pod(
                config,
                APPEND_CMD,
                volume(&config.storage_classes.five_iops, "csi-vol-5iops-", "260Gi"),
            )],
            check: cat_check(&[HELLO, HELLO_TWICE]),
            expand_gib: 2000,
            expect_min_gib: 1900,
        }),
    ]
}

fn volume(storage_class: &str, name_prefix: &str, claim_size: &str) -> VolumeDescriptor {
    VolumeDescriptor {
        name_prefix: name_prefix.to_string(),
        storage_class: storage_class.to_string(),
        fs_type: "ext4".to_string(),
        claim_size: claim_size.to_string(),
        reclaim_policy: ReclaimPolicy::Delete,
        mount_options: vec!["rw".to_string()],
        mount: VolumeMountDescriptor::default(),
    }
}

fn test_pod(config: &SuiteConfig, cmd: &str, volume: VolumeDescriptor) -> PodDescriptor {
    let mut pod = PodDescriptor::new(cmd, vec![volume]);
    pod.image = config.test_image.clone();
    pod
}

fn cat_check(expected: &[&str]) -> ExecCheck {
    ExecCheck::new(
        vec!["cat".to_string(), "/mnt/test-1/data".to_string()],
        expected.iter().map(|s| s.to_string()).collect(),
    )
}
