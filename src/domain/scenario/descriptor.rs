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

//! Value objects describing the resources a scenario provisions.
//!
//! Descriptors are constructed once per scenario and validated before any
//! cluster mutation happens.

use crate::infrastructure::constants::{
    DEFAULT_MOUNT_PATH_PREFIX, DEFAULT_TEST_IMAGE, DEFAULT_VOLUME_NAME_PREFIX,
};
use crate::shared::error::{ConformanceError, Result};

/// What happens to the underlying storage when its claim is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReclaimPolicy {
    #[default]
    Delete,
    Retain,
    Recycle,
}

impl ReclaimPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimPolicy::Delete => "Delete",
            ReclaimPolicy::Retain => "Retain",
            ReclaimPolicy::Recycle => "Recycle",
        }
    }
}

impl std::str::FromStr for ReclaimPolicy {
    type Err = ConformanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Delete" => Ok(ReclaimPolicy::Delete),
            "Retain" => Ok(ReclaimPolicy::Retain),
            "Recycle" => Ok(ReclaimPolicy::Recycle),
            other => Err(ConformanceError::validation(format!(
                "Invalid reclaim policy: {}",
                other
            ))),
        }
    }
}

/// Naming pattern for a volume's mount point inside the test container.
/// Volume `i` (1-based) mounts at `<mount_path_generate><i>` under the
/// volume name `<name_generate><i>`.
#[derive(Debug, Clone)]
pub struct VolumeMountDescriptor {
    pub name_generate: String,
    pub mount_path_generate: String,
}

impl Default for VolumeMountDescriptor {
    fn default() -> Self {
        Self {
            name_generate: DEFAULT_VOLUME_NAME_PREFIX.to_string(),
            mount_path_generate: DEFAULT_MOUNT_PATH_PREFIX.to_string(),
        }
    }
}

impl VolumeMountDescriptor {
    pub fn volume_name(&self, index: usize) -> String {
        format!("{}{}", self.name_generate, index + 1)
    }

    pub fn mount_path(&self, index: usize) -> String {
        format!("{}{}", self.mount_path_generate, index + 1)
    }
}

/// A desired PVC.
///
/// A `name_prefix` ending in `-` provisions the claim through
/// `metadata.generateName`, so concurrent scenarios never collide; a prefix
/// without the trailing dash is used verbatim (required where a secret must
/// share the claim's name).
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    pub name_prefix: String,
    pub storage_class: String,
    pub fs_type: String,
    pub claim_size: String,
    pub reclaim_policy: ReclaimPolicy,
    pub mount_options: Vec<String>,
    pub mount: VolumeMountDescriptor,
}

impl VolumeDescriptor {
    pub fn generates_name(&self) -> bool {
        self.name_prefix.ends_with('-')
    }

    pub fn validate(&self) -> Result<()> {
        if self.name_prefix.is_empty() {
            return Err(ConformanceError::validation(
                "volume name prefix must not be empty",
            ));
        }
        if self.storage_class.is_empty() {
            return Err(ConformanceError::validation(
                "volume storage class must not be empty",
            ));
        }
        match quantity_gib(&self.claim_size) {
            Some(gib) if gib > 0 => Ok(()),
            _ => Err(ConformanceError::validation(format!(
                "claim size '{}' is not a positive capacity",
                self.claim_size
            ))),
        }
    }
}

/// A desired test Pod: the shell command it runs and the volumes it mounts.
#[derive(Debug, Clone)]
pub struct PodDescriptor {
    pub cmd: String,
    pub cmd_exits: bool,
    pub image: String,
    pub volumes: Vec<VolumeDescriptor>,
}

impl PodDescriptor {
    pub fn new(cmd: impl Into<String>, volumes: Vec<VolumeDescriptor>) -> Self {
        Self {
            cmd: cmd.into(),
            cmd_exits: false,
            image: DEFAULT_TEST_IMAGE.to_string(),
            volumes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cmd.trim().is_empty() {
            return Err(ConformanceError::validation("pod command must not be empty"));
        }
        if self.volumes.is_empty() {
            return Err(ConformanceError::validation(
                "pod must mount at least one volume",
            ));
        }
        for volume in &self.volumes {
            volume.validate()?;
        }
        Ok(())
    }
}

/// A secret consumed by a custom storage class. The secret must carry the
/// same name as the claim that references it, in the same namespace.
#[derive(Debug, Clone)]
pub struct SecretDescriptor {
    pub name: String,
    pub iops: String,
    pub tags: String,
    pub encrypted: bool,
    pub encryption_key: String,
    pub profile: String,
}

/// Parses a Kubernetes quantity such as `15Gi`, `2Ti` or `512Mi` into whole
/// GiB. Sub-GiB remainders truncate.
pub fn quantity_gib(quantity: &str) -> Option<u64> {
    let (value, scale) = if let Some(v) = quantity.strip_suffix("Ti") {
        (v, 1024)
    } else if let Some(v) = quantity.strip_suffix("Gi") {
        (v, 1)
    } else if let Some(v) = quantity.strip_suffix("Mi") {
        return v.trim().parse::<u64>().ok().map(|n| n / 1024);
    } else {
        return None;
    };
    value.trim().parse::<u64>().ok().map(|n| n * scale)
}
