//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! {
//!   "import": { "ruleOrder": "oldestFirst", "csvDelimiter": "," },
//!   "agreements": { "updatePolicy": "snapshot" },
//!   "user": { "defaultUserId": 1 }
//! }
//! ```
//! Fields the application does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::RuleOrder;

/// What happens to generated ledger entries when an agreement is edited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgreementUpdatePolicy {
    /// Entries keep the values they were generated with
    #[default]
    Snapshot,
    /// Entries are deleted and re-expanded from the edited agreement
    Regenerate,
}

impl AgreementUpdatePolicy {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "snapshot" => Some(Self::Snapshot),
            "regenerate" => Some(Self::Regenerate),
            _ => None,
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    agreements: AgreementSettings,
    #[serde(default)]
    user: UserSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default)]
    rule_order: RuleOrder,
    #[serde(default = "default_delimiter")]
    csv_delimiter: char,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            rule_order: RuleOrder::default(),
            csv_delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgreementSettings {
    #[serde(default)]
    update_policy: AgreementUpdatePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default = "default_user_id")]
    default_user_id: i64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_user_id: default_user_id(),
        }
    }
}

fn default_user_id() -> i64 {
    1
}

/// Kassabok configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Order in which active import rules are tested
    pub rule_order: RuleOrder,
    /// Field delimiter for delimited-text statements
    pub csv_delimiter: u8,
    pub agreement_update_policy: AgreementUpdatePolicy,
    pub default_user_id: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rule_order: RuleOrder::default(),
            csv_delimiter: b',',
            agreement_update_policy: AgreementUpdatePolicy::default(),
            default_user_id: default_user_id(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unparsable settings file yields defaults. The update
    /// policy can be overridden with KASSABOK_AGREEMENT_UPDATE_POLICY.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let env_policy = std::env::var("KASSABOK_AGREEMENT_UPDATE_POLICY")
            .ok()
            .and_then(|v| AgreementUpdatePolicy::from_env_value(&v));

        Ok(Self {
            rule_order: raw.import.rule_order,
            csv_delimiter: delimiter_byte(raw.import.csv_delimiter)?,
            agreement_update_policy: env_policy.unwrap_or(raw.agreements.update_policy),
            default_user_id: raw.user.default_user_id,
        })
    }

    /// Save config to the data directory, keeping unmanaged fields
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.import.rule_order = self.rule_order;
        settings.import.csv_delimiter = char::from(self.csv_delimiter);
        settings.agreements.update_policy = self.agreement_update_policy;
        settings.user.default_user_id = self.default_user_id;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join("settings.json"), content)?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        bail!("csvDelimiter must be a single ASCII character, got '{}'", c)
    }
}
