//! Compiler configuration

use serde::{Deserialize, Serialize};

/// Options controlling a single compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Name written into the `; ModuleID` header and the manifest.
    pub module_name: String,
    /// Lower `console.log(<number>)` to the runtime print primitive.
    pub intercept_console_log: bool,
    /// Close an open block with `br label %lN` before every new label.
    pub fallthrough_branches: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            intercept_console_log: true,
            fallthrough_branches: true,
        }
    }
}

impl CompileOptions {
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Parse options from JSON; missing keys keep their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
