use std::collections::BTreeMap;

use hs_core::{ErrorDescriptor, Value};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 10_000;
pub const DEFAULT_NOTIFICATION_NAMESPACE: &str = "hyperscript";

/// What a command sequence does when one of its commands fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// Record the error and run the next command.
    #[default]
    Continue,
    /// End the invocation with the first error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeOptions {
    pub error_policy: ErrorPolicy,
    pub max_loop_iterations: usize,
    pub notification_namespace: String,
    pub emit_notifications: bool,
    pub globals: BTreeMap<String, serde_json::Value>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Continue,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            notification_namespace: DEFAULT_NOTIFICATION_NAMESPACE.to_string(),
            emit_notifications: true,
            globals: BTreeMap::new(),
        }
    }
}

impl RuntimeOptions {
    pub fn from_json_str(raw: &str) -> Result<Self, ErrorDescriptor> {
        serde_json::from_str(raw).map_err(|error| {
            ErrorDescriptor::invalid_argument(
                "RUNTIME_OPTIONS_INVALID",
                format!("Runtime options are not valid JSON: {}", error),
            )
            .suggest("Known keys: errorPolicy, maxLoopIterations, notificationNamespace, emitNotifications, globals.")
        })
    }

    pub fn initial_globals(&self) -> BTreeMap<String, Value> {
        self.globals
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_json(value)))
            .collect()
    }
}
