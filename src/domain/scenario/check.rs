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

use crate::domain::scenario::runner::ScenarioContext;
use crate::shared::error::{ConformanceError, Result};

/// Post-condition assertion executed inside a running test Pod.
///
/// The same command runs at every checkpoint; the expected stdout differs
/// per checkpoint because the volume content changes across restarts
/// (one line first, two lines after the command ran again).
#[derive(Debug, Clone)]
pub struct ExecCheck {
    pub command: Vec<String>,
    pub expected: Vec<String>,
}

impl ExecCheck {
    pub fn new(command: Vec<String>, expected: Vec<String>) -> Self {
        Self { command, expected }
    }

    pub fn checkpoints(&self) -> usize {
        self.expected.len()
    }

    pub fn last_checkpoint(&self) -> usize {
        self.expected.len().saturating_sub(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() {
            return Err(ConformanceError::validation(
                "exec check command must not be empty",
            ));
        }
        if self.expected.is_empty() {
            return Err(ConformanceError::validation(
                "exec check needs at least one expected output",
            ));
        }
        Ok(())
    }

    /// Runs the command in the Pod's primary container and byte-compares
    /// captured stdout against the literal registered for `checkpoint`.
    pub async fn verify(
        &self,
        ctx: &ScenarioContext,
        pod_name: &str,
        checkpoint: usize,
    ) -> Result<()> {
        let expected = self.expected.get(checkpoint).ok_or_else(|| {
            ConformanceError::validation(format!(
                "no expected output registered for checkpoint {}",
                checkpoint
            ))
        })?;

        let actual = ctx.client().exec_pod(pod_name, &self.command).await?;
        if actual != *expected {
            return Err(ConformanceError::AssertionMismatch {
                checkpoint,
                expected: expected.clone(),
                actual,
            });
        }

        tracing::debug!(pod = pod_name, checkpoint, "exec check passed");
        Ok(())
    }
}
