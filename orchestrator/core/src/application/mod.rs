// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod control_plane;
pub mod hooks;
pub mod killswitch;
pub mod local_control_plane;
pub mod monitor;
pub mod policy;

// Re-export the contract and its consumers for convenience
pub use control_plane::{ControlPlane, HttpMethod, Route};
pub use hooks::{logging_hooks, timing_hooks, Hook, HookRegistry, HookStage};
pub use killswitch::KillSwitch;
pub use local_control_plane::LocalControlPlane;
pub use monitor::Monitor;
pub use policy::PolicyEvaluator;
