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

use crate::infrastructure::constants::{
    DEFAULT_SUITE_TAG, DEFAULT_TEST_IMAGE, ENCRYPTION_KEY_ENV, RESULT_FILE_ENV,
};
use crate::shared::error::{ConformanceError, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Suite-level configuration. Resolution order is command line > process
/// environment > TOML file > defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub namespace: String,
    pub suite_tag: String,
    pub result_file: Option<PathBuf>,
    pub storage_classes: StorageClassConfig,
    /// Key material for the custom (encrypted) storage class. May stay
    /// empty when the driver under test provisions without one.
    pub encryption_key: String,
    /// Secret type the CSI driver resolves provisioning parameters by.
    pub csi_profile: String,
    pub test_image: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            suite_tag: DEFAULT_SUITE_TAG.to_string(),
            result_file: None,
            storage_classes: StorageClassConfig::default(),
            encryption_key: String::new(),
            csi_profile: "block.csi.example.com".to_string(),
            test_image: DEFAULT_TEST_IMAGE.to_string(),
        }
    }
}

/// Storage-class identifiers exercised by the built-in catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageClassConfig {
    pub five_iops: String,
    pub general_purpose: String,
    pub custom: String,
}

impl Default for StorageClassConfig {
    fn default() -> Self {
        Self {
            five_iops: "csi-block-5iops-tier".to_string(),
            general_purpose: "csi-block-general-purpose".to_string(),
            custom: "csi-block-custom".to_string(),
        }
    }
}

impl StorageClassConfig {
    pub fn all(&self) -> [&str; 3] {
        [&self.five_iops, &self.general_purpose, &self.custom]
    }
}

impl SuiteConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConformanceError::config_error(format!(
                "failed to read configuration file '{}': {}",
                path, e
            ))
        })?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fills unset values from the process environment (`E2E_TEST_RESULT`,
    /// `E2E_SECRET_ENCRYPTION_KEY`).
    pub fn apply_env(&mut self) {
        if self.result_file.is_none() {
            if let Ok(path) = std::env::var(RESULT_FILE_ENV) {
                if !path.is_empty() {
                    self.result_file = Some(PathBuf::from(path));
                }
            }
        }
        if self.encryption_key.is_empty() {
            if let Ok(key) = std::env::var(ENCRYPTION_KEY_ENV) {
                self.encryption_key = key;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(ConformanceError::config_error("namespace must not be empty"));
        }
        if self.suite_tag.is_empty() {
            return Err(ConformanceError::config_error("suite tag must not be empty"));
        }
        for storage_class in self.storage_classes.all() {
            if storage_class.is_empty() {
                return Err(ConformanceError::config_error(
                    "storage-class identifiers must not be empty",
                ));
            }
        }
        if self.test_image.is_empty() {
            return Err(ConformanceError::config_error("test image must not be empty"));
        }
        Ok(())
    }
}
