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

//! Resource handles: manifest builder + create/cleanup per resource kind

pub mod deployment;
pub mod pod;
pub mod pvc;
pub mod secret;
pub mod service;
pub mod statefulset;

pub use self::deployment::TestDeployment;
pub use self::pod::{pod_node_name, wait_for_pod_phase, TestPod};
pub use self::pvc::TestPvc;
pub use self::secret::TestSecret;
pub use self::service::TestHeadlessService;
pub use self::statefulset::TestStatefulSet;
