// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Request Hooks
//!
//! Observers attached to a control-plane backend. A registry maps each
//! [`HookStage`] to an ordered list of callables:
//!
//! - **pre** hooks receive `(method, path, payload)` once per logical call,
//!   before dispatch;
//! - **post** hooks receive `(method, path, payload, result)` once after the
//!   call succeeded.
//!
//! Hooks run synchronously on the calling task, in registration order. They
//! observe; they cannot veto or rewrite a call.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub type PreHook = Arc<dyn Fn(&str, &str, Option<&Value>) + Send + Sync>;
pub type PostHook = Arc<dyn Fn(&str, &str, Option<&Value>, &Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    Pre,
    Post,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Pre => "pre",
            HookStage::Post => "post",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub enum Hook {
    Pre(PreHook),
    Post(PostHook),
}

impl Hook {
    pub fn pre(f: impl Fn(&str, &str, Option<&Value>) + Send + Sync + 'static) -> Self {
        Hook::Pre(Arc::new(f))
    }

    pub fn post(f: impl Fn(&str, &str, Option<&Value>, &Value) + Send + Sync + 'static) -> Self {
        Hook::Post(Arc::new(f))
    }

    pub fn stage(&self) -> HookStage {
        match self {
            Hook::Pre(_) => HookStage::Pre,
            Hook::Post(_) => HookStage::Post,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{}", self.stage())
    }
}

/// Stage -> ordered hook list.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookStage, Vec<Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hook: Hook) {
        self.hooks.write().entry(hook.stage()).or_default().push(hook);
    }

    pub fn len(&self, stage: HookStage) -> usize {
        self.hooks.read().get(&stage).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().values().all(Vec::is_empty)
    }

    // Hooks run outside the lock so they may register further hooks.
    fn snapshot(&self, stage: HookStage) -> Vec<Hook> {
        self.hooks.read().get(&stage).cloned().unwrap_or_default()
    }

    pub fn run_pre(&self, method: &str, path: &str, payload: Option<&Value>) {
        for hook in self.snapshot(HookStage::Pre) {
            if let Hook::Pre(f) = hook {
                f(method, path, payload);
            }
        }
    }

    pub fn run_post(&self, method: &str, path: &str, payload: Option<&Value>, result: &Value) {
        for hook in self.snapshot(HookStage::Post) {
            if let Hook::Post(f) = hook {
                f(method, path, payload, result);
            }
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("pre", &self.len(HookStage::Pre))
            .field("post", &self.len(HookStage::Post))
            .finish()
    }
}

/// Log every request and response at info level.
pub fn logging_hooks() -> (Hook, Hook) {
    let pre = Hook::pre(|method, path, _payload| {
        info!("AgentMolt request: {} {}", method, path);
    });
    let post = Hook::post(|method, path, _payload, response| {
        let keys = response.as_object().map_or(0, |o| o.len());
        info!("AgentMolt response: {} {} -> {} keys", method, path, keys);
    });
    (pre, post)
}

/// Log how long each call took, keyed by `METHOD path`.
pub fn timing_hooks() -> (Hook, Hook) {
    let started: Arc<Mutex<HashMap<String, Instant>>> = Arc::default();

    let pre_started = started.clone();
    let pre = Hook::pre(move |method, path, _payload| {
        pre_started
            .lock()
            .insert(format!("{} {}", method, path), Instant::now());
    });

    let post = Hook::post(move |method, path, _payload, _response| {
        let key = format!("{} {}", method, path);
        if let Some(start) = started.lock().remove(&key) {
            info!(
                "AgentMolt {} took {:.3}s",
                key,
                start.elapsed().as_secs_f64()
            );
        }
    });
    (pre, post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hooks_run_in_registration_order() {
        let registry = HookRegistry::new();
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();

        for name in ["first", "second"] {
            let calls = calls.clone();
            registry.add(Hook::pre(move |method, path, _| {
                calls.lock().push(format!("{}:{} {}", name, method, path));
            }));
        }
        let post_calls = calls.clone();
        registry.add(Hook::post(move |_, _, payload, result| {
            post_calls
                .lock()
                .push(format!("post:{}:{}", payload.is_some(), result["id"]));
        }));

        registry.run_pre("GET", "/api/v1/agents", None);
        registry.run_post("POST", "/api/v1/events", Some(&json!({})), &json!({"id": "e1"}));

        assert_eq!(
            *calls.lock(),
            vec![
                "first:GET /api/v1/agents".to_string(),
                "second:GET /api/v1/agents".to_string(),
                "post:true:\"e1\"".to_string(),
            ]
        );
        assert_eq!(registry.len(HookStage::Pre), 2);
        assert_eq!(registry.len(HookStage::Post), 1);
    }

    #[test]
    fn test_bundled_hooks_register_both_stages() {
        let registry = HookRegistry::new();
        let (pre, post) = timing_hooks();
        registry.add(pre);
        registry.add(post);
        let (pre, post) = logging_hooks();
        registry.add(pre);
        registry.add(post);
        assert_eq!(registry.len(HookStage::Pre), 2);
        assert_eq!(registry.len(HookStage::Post), 2);

        registry.run_pre("GET", "/x", None);
        registry.run_post("GET", "/x", None, &json!({"a": 1}));
    }
}
