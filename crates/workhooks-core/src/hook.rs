//! Hook wire types: the JSON object an agent host writes to stdin and the
//! decision objects the hooks answer with on stdout.

use crate::error::Result;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default)]
    pub tool_result: ToolResult,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub enabled_plugins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub exit_code: i64,
}

impl HookInput {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn command(&self) -> &str {
        self.tool_input.command.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HookResponse<T: Serialize> {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Deny,
}

/// Answer to a pre-tool-use hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    #[serde(rename = "permissionDecision")]
    pub decision: Permission,
    #[serde(
        rename = "permissionDecisionReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
}

impl PermissionDecision {
    pub fn allow() -> Self {
        Self {
            decision: Permission::Allow,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: Permission::Deny,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allow(&self) -> bool {
        self.decision == Permission::Allow
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&HookResponse {
            hook_specific_output: self,
        })?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopVerdict {
    Allow,
    Block,
}

/// Answer to a session-stop hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopDecision {
    #[serde(rename = "stopDecision")]
    pub decision: StopVerdict,
    #[serde(rename = "stopDecisionReason", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StopDecision {
    pub fn allow() -> Self {
        Self {
            decision: StopVerdict::Allow,
            reason: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: StopVerdict::Block,
            reason: Some(reason.into()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&HookResponse {
            hook_specific_output: self,
        })?)
    }
}

/// Answer to a prompt-submit hook that refuses the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptBlock {
    pub decision: &'static str,
    pub reason: String,
}

impl PromptBlock {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            decision: "block",
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
