//! Variable substitution for response bodies.
//!
//! Placeholders have the form `{{name}}`. Lookup is case-insensitive and
//! scoped: variables of the active environment group override those of the
//! [`GLOBALS_GROUP`]. Unknown placeholders are left in the output verbatim.
//!
//! Dynamic placeholders (`{{$uuid}}`, `{{$timestamp}}`, ...) are only expanded by
//! [`VariableStore::substitute_dynamic`]; the plain [`VariableSubstitutor`] path
//! leaves them untouched.

mod builtins;

pub use builtins::resolve_builtin;

use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Group whose variables apply regardless of the active environment
pub const GLOBALS_GROUP: &str = "Globals";

/// Matches `{{name}}`, `{{$dynamic}}` and `{{name:arg}}`, capturing the inner name
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{(\$?\w+(?::\S+)?)\}\}").expect("placeholder regex is valid")
    })
}

/// Synchronous text substitution consumed by the mock server.
pub trait VariableSubstitutor: Send + Sync {
    fn substitute(&self, input: &str) -> String;
}

/// A named value within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_group")]
    pub group: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            group: group.into(),
        }
    }

    pub fn global(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value, GLOBALS_GROUP)
    }
}

fn default_group() -> String {
    GLOBALS_GROUP.to_string()
}

/// In-memory variable store with an optional active environment.
#[derive(Default)]
pub struct VariableStore {
    variables: RwLock<Vec<Variable>>,
    environment: RwLock<Option<String>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: Vec<Variable>, environment: Option<String>) -> Self {
        Self {
            variables: RwLock::new(variables),
            environment: RwLock::new(environment),
        }
    }

    pub fn list(&self) -> Vec<Variable> {
        self.variables.read().clone()
    }

    /// Insert or replace a variable (keyed by case-insensitive key within its group)
    pub fn set(&self, variable: Variable) {
        let mut variables = self.variables.write();
        match variables.iter_mut().find(|v| {
            v.key.eq_ignore_ascii_case(&variable.key) && v.group.eq_ignore_ascii_case(&variable.group)
        }) {
            Some(existing) => *existing = variable,
            None => variables.push(variable),
        }
    }

    /// Remove a variable from every group. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut variables = self.variables.write();
        let before = variables.len();
        variables.retain(|v| !v.key.eq_ignore_ascii_case(key));
        variables.len() != before
    }

    pub fn environment(&self) -> Option<String> {
        self.environment.read().clone()
    }

    pub fn set_environment(&self, environment: Option<String>) {
        *self.environment.write() = environment;
    }

    /// Effective variables for the active environment, keyed by lowercased name.
    fn resolved_values(&self) -> HashMap<String, String> {
        let environment = self.environment.read().clone();
        let variables = self.variables.read();

        let mut values = HashMap::new();
        let globals = variables
            .iter()
            .filter(|v| v.group.eq_ignore_ascii_case(GLOBALS_GROUP));
        for v in globals {
            values.insert(v.key.to_lowercase(), v.value.clone());
        }
        if let Some(environment) = environment.filter(|e| !e.eq_ignore_ascii_case(GLOBALS_GROUP)) {
            for v in variables.iter().filter(|v| v.group.eq_ignore_ascii_case(&environment)) {
                values.insert(v.key.to_lowercase(), v.value.clone());
            }
        }
        values
    }

    /// Substitute `{{name}}` placeholders and also expand built-in dynamic values.
    ///
    /// A variable whose value is itself a built-in reference (e.g. `$uuid`) is
    /// expanded too. Unknown names are left verbatim.
    pub fn substitute_dynamic(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }
        let values = self.resolved_values();
        placeholder_regex()
            .replace_all(input, |caps: &Captures| {
                let name = &caps[1];
                if name.starts_with('$') {
                    return resolve_builtin(name).unwrap_or_else(|| caps[0].to_string());
                }
                match values.get(&name.to_lowercase()) {
                    Some(value) if value.starts_with('$') => {
                        resolve_builtin(value).unwrap_or_else(|| value.clone())
                    }
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl VariableSubstitutor for VariableStore {
    fn substitute(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }
        let values = self.resolved_values();
        placeholder_regex()
            .replace_all(input, |caps: &Captures| {
                let name = &caps[1];
                if name.starts_with('$') {
                    return caps[0].to_string();
                }
                values
                    .get(&name.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Substitutor that also expands built-in dynamic values.
///
/// Shares the underlying [`VariableStore`], so edits made through the admin
/// API apply to both paths.
pub struct DynamicSubstitution(pub Arc<VariableStore>);

impl VariableSubstitutor for DynamicSubstitution {
    fn substitute(&self, input: &str) -> String {
        self.0.substitute_dynamic(input)
    }
}
