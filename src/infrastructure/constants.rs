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

/// Readiness waits
pub const PVC_BOUND_TIMEOUT_SECS: u64 = 300;
pub const POD_RUNNING_TIMEOUT_SECS: u64 = 300;
pub const WORKLOAD_READY_TIMEOUT_SECS: u64 = 600;
pub const DELETION_SETTLE_TIMEOUT_SECS: u64 = 300;
pub const RESIZE_TIMEOUT_SECS: u64 = 900;
pub const CHECK_INTERVAL_SECS: u64 = 5;

/// Node drain
pub const DRAIN_TIMEOUT_SECS: u64 = 600;
pub const EVICTION_MAX_RETRIES: usize = 10;
pub const EVICTION_MIN_BACKOFF_SECS: u64 = 2;
pub const EVICTION_MAX_BACKOFF_SECS: u64 = 30;

/// Resource labels
pub const LABEL_APP: &str = "app";
pub const LABEL_TYPE: &str = "type";
pub const LABEL_TYPE_VALUE: &str = "csi-conformance-e2e";

/// Test pod
pub const CONTAINER_NAME_TESTER: &str = "volume-tester";
pub const DEFAULT_TEST_IMAGE: &str = "docker.io/library/busybox:1.36";
pub const RESTART_POLICY_ALWAYS: &str = "Always";
pub const RESTART_POLICY_NEVER: &str = "Never";

/// Volume defaults
pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";
pub const DEFAULT_VOLUME_NAME_PREFIX: &str = "test-volume-";
pub const DEFAULT_MOUNT_PATH_PREFIX: &str = "/mnt/test-";

/// Generated-name prefixes
pub const POD_NAME_PREFIX: &str = "csi-e2e-pod-";
pub const DEPLOYMENT_NAME_PREFIX: &str = "csi-e2e-deploy-";
pub const STATEFULSET_NAME_PREFIX: &str = "csi-e2e-sts-";
pub const SERVICE_NAME_PREFIX: &str = "csi-e2e-service-";

/// Suite defaults
pub const DEFAULT_SUITE_TAG: &str = "BLK-CSI-E2E";
pub const RESULT_FILE_ENV: &str = "E2E_TEST_RESULT";
pub const ENCRYPTION_KEY_ENV: &str = "E2E_SECRET_ENCRYPTION_KEY";

/// Pod eviction bookkeeping
pub const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";
pub const OWNER_KIND_DAEMONSET: &str = "DaemonSet";
