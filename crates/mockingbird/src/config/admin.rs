//! Admin API and variable settings.

use crate::variables::Variable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

fn default_admin_enabled() -> bool {
    true
}

fn default_admin_port() -> u16 {
    2626
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
            port: default_admin_port(),
        }
    }
}

/// Initial contents of the variable store
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesSettings {
    /// Active environment group; `Globals` only when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub entries: Vec<Variable>,
}
