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

//! Scenario descriptors, checks and the execution runner

pub mod catalog;
pub mod check;
pub mod descriptor;
pub mod runner;

pub use self::catalog::builtin_scenarios;
pub use self::check::ExecCheck;
pub use self::descriptor::{
    quantity_gib, PodDescriptor, ReclaimPolicy, SecretDescriptor, VolumeDescriptor,
    VolumeMountDescriptor,
};
pub use self::runner::{
    CleanupStack, DeployScenario, ManagedResource, PodScenario, ResizeScenario, Scenario,
    ScenarioContext, StatefulSetScenario,
};
