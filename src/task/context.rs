// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Execution context handed to a task's command function

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::workspace::{Patterns, Resolved};

/// Free-form task parameters
pub type Params = BTreeMap<String, Value>;

/// Resolved, read-only view of one task invocation
#[derive(Debug, Clone)]
pub struct Context {
    /// Task display name
    pub name: String,

    /// Input paths, shaped like the declared input; `None` for root producers
    pub input: Option<Resolved>,

    /// Output patterns checked once the command finishes
    pub output: Option<Patterns>,

    /// Parameters, passed through unchanged
    pub params: Params,

    /// Absolute working directory
    pub dir: PathBuf,
}

impl Context {
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Parameter rendered for a command line (strings without quotes)
    pub fn param_str(&self, key: &str) -> Option<String> {
        self.param(key).map(value_to_arg)
    }
}

/// Render a JSON value as a shell argument
pub(crate) fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(value_to_arg).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_rendering() {
        let ctx = Context {
            name: "bwa".into(),
            input: None,
            output: None,
            params: Params::from([
                ("output".to_string(), json!("bwa_output.sam")),
                ("threads".to_string(), json!(4)),
                ("suffixes".to_string(), json!(["amb", "ann"])),
            ]),
            dir: PathBuf::from("/ws"),
        };

        assert_eq!(ctx.param_str("output").as_deref(), Some("bwa_output.sam"));
        assert_eq!(ctx.param_str("threads").as_deref(), Some("4"));
        assert_eq!(ctx.param_str("suffixes").as_deref(), Some("amb ann"));
        assert_eq!(ctx.param_str("missing"), None);
    }
}
