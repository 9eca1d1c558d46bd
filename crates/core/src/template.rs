//! Message templates with `{{name}}` placeholders.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::Channel;
use crate::types::Timestamp;

/// Matches placeholders of the form `{{variable_name}}`.
static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("variable pattern is valid"));

/// A named, channel-bound message template.
///
/// `variables` is derived from `content` and kept in first-occurrence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub channel: Channel,
    pub content: String,
    pub variables: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Template {
    pub fn new(name: impl Into<String>, channel: Channel, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let content = content.into();
        let variables = extract_variables(&content);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            channel,
            content,
            variables,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the template content and re-derive the variable list.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.variables = extract_variables(&self.content);
        self.updated_at = Utc::now();
    }

    /// Render the template by literal placeholder replacement. Placeholders
    /// absent from `vars` are left intact in the output.
    pub fn render(&self, vars: &HashMap<String, String>) -> String {
        let mut result = self.content.clone();
        for (key, value) in vars {
            let placeholder = format!("{{{{{key}}}}}");
            result = result.replace(&placeholder, value);
        }
        result
    }

    /// Return the template variables that `vars` does not supply.
    pub fn missing_variables(&self, vars: &HashMap<String, String>) -> Vec<String> {
        self.variables
            .iter()
            .filter(|v| !vars.contains_key(*v))
            .cloned()
            .collect()
    }
}

/// Extract distinct placeholder names from template content, in order of
/// first occurrence.
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut variables = Vec::new();
    for capture in VARIABLE_PATTERN.captures_iter(content) {
        let name = &capture[1];
        if seen.insert(name.to_string()) {
            variables.push(name.to_string());
        }
    }
    variables
}
