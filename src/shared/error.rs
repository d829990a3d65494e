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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, ConformanceError>;

#[derive(Error, Debug)]
pub enum ConformanceError {
    #[error("Kubernetes API error: {0}")]
    KubeApi(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{resource_type} '{name}' did not reach {condition} within {waited_secs}s")]
    ProvisionTimeout {
        resource_type: String,
        name: String,
        condition: String,
        waited_secs: u64,
    },

    #[error("checkpoint {checkpoint} mismatch: expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        checkpoint: usize,
        expected: String,
        actual: String,
    },

    #[error("Disruption error: {0}")]
    Disruption(String),

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("Result recording error: {0}")]
    Record(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<kube::Error> for ConformanceError {
    fn from(err: kube::Error) -> Self {
        ConformanceError::KubeApi(err.to_string())
    }
}

impl ConformanceError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn validation(context: impl Into<String>) -> Self {
        Self::ValidationError(context.into())
    }

    pub fn disruption(context: impl Into<String>) -> Self {
        Self::Disruption(context.into())
    }

    pub fn provision_timeout(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        condition: impl Into<String>,
        waited_secs: u64,
    ) -> Self {
        Self::ProvisionTimeout {
            resource_type: resource_type.into(),
            name: name.into(),
            condition: condition.into(),
            waited_secs,
        }
    }
}
