use hs_runtime::RuntimeOptions;
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "hs-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default)]
    pub name: Option<String>,
    pub markup: String,
    #[serde(default)]
    pub config: Option<RuntimeOptions>,
    /// Handler errors fail the case unless this is set.
    #[serde(default)]
    pub allow_errors: bool,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TestAction {
    /// Dispatches `event` at the first element matching `target`. A detached trigger keeps
    /// running in the background while later actions proceed.
    Trigger {
        target: String,
        event: String,
        #[serde(default)]
        detail: Option<serde_json::Value>,
        #[serde(default)]
        detached: bool,
    },
    /// Lets the virtual clock move forward, firing any timers that fall due.
    Advance { ms: u64 },
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Trigger { .. } => "trigger",
            Self::Advance { .. } => "advance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expectation {
    HasClass {
        target: String,
        class: String,
    },
    LacksClass {
        target: String,
        class: String,
    },
    Text {
        target: String,
        text: String,
    },
    /// `value: null` expects the attribute to be absent.
    Attribute {
        target: String,
        name: String,
        value: Option<String>,
    },
    Hidden {
        target: String,
    },
    Visible {
        target: String,
    },
    Global {
        name: String,
        value: serde_json::Value,
    },
    Count {
        selector: String,
        count: usize,
    },
}
