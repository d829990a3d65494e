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

//! Append-only result artifact sink.
//!
//! One line is recorded per fully-successful scenario, in the form
//! `"<SUITE-TAG>: <scenario-name>: PASS\n"`. The sink is owned by the
//! test-run context, opened once at suite start and passed explicitly to
//! the suite loop; a recording failure surfaces as an error so the caller
//! decides whether it is fatal.

use crate::shared::error::{ConformanceError, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

pub trait ResultRecorder: Send {
    fn record(&mut self, line: &str) -> Result<()>;
}

/// Appends result lines to a file on disk.
pub struct FileRecorder {
    file: File,
}

impl FileRecorder {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|e| {
                ConformanceError::Record(format!(
                    "failed to open result file '{}': {}",
                    path.as_ref().display(),
                    e
                ))
            })?;
        Ok(Self { file })
    }
}

impl ResultRecorder for FileRecorder {
    fn record(&mut self, line: &str) -> Result<()> {
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| ConformanceError::Record(e.to_string()))
    }
}

/// Keeps result lines in memory. Used when no result file is configured
/// and by tests.
#[derive(Default)]
pub struct MemoryRecorder {
    lines: Vec<String>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ResultRecorder for MemoryRecorder {
    fn record(&mut self, line: &str) -> Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_recorder_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");

        let mut recorder = FileRecorder::open(&path).unwrap();
        recorder.record("BLK-CSI-E2E: first: PASS\n").unwrap();
        recorder.record("BLK-CSI-E2E: second: PASS\n").unwrap();
        drop(recorder);

        // Reopening must append, not truncate
        let mut recorder = FileRecorder::open(&path).unwrap();
        recorder.record("BLK-CSI-E2E: third: PASS\n").unwrap();
        drop(recorder);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.ends_with("third: PASS\n"));
    }

    #[test]
    fn test_memory_recorder() {
        let mut recorder = MemoryRecorder::new();
        recorder.record("TAG: scenario: PASS\n").unwrap();
        assert_eq!(recorder.lines(), ["TAG: scenario: PASS\n"]);
    }
}
