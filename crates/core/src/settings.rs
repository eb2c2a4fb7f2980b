use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evaluator::EvaluatorConfig;
use crate::readout::ReadoutConfig;
use crate::rule::Rule;
use crate::signature::SignatureSet;
use crate::types::CaptureRect;

/// Timing, gating and readout for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub scan_interval_ms: u64,
    /// Window-relative region to scan; the whole window when absent.
    pub scan_rect: Option<CaptureRect>,
    /// Minimum gap between two key presses across all rules.
    pub action_delay_ms: u64,
    pub action_jitter: f64,
    /// Minimum gap between two fires of one rule.
    pub min_fire_delay_ms: u64,
    pub bar_visibility_gate: bool,
    pub cooldown_gate: bool,
    pub readout: ReadoutConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            scan_interval_ms: 50,
            scan_rect: None,
            action_delay_ms: 40,
            action_jitter: 0.0,
            min_fire_delay_ms: 250,
            bar_visibility_gate: true,
            cooldown_gate: true,
            readout: ReadoutConfig::default(),
        }
    }
}

impl SessionSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn evaluator(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            min_fire_delay: Duration::from_millis(self.min_fire_delay_ms),
            bar_visibility_gate: self.bar_visibility_gate,
            cooldown_gate: self.cooldown_gate,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window_pattern: String,
    pub signatures: serde_json::Value,
    /// Raw so that one bad rule does not reject the file.
    pub rules: Vec<serde_json::Value>,
    pub enabled_rules: Vec<String>,
    pub session: SessionSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn signature_set(&self) -> Result<SignatureSet, ConfigError> {
        if self.signatures.is_null() {
            return Ok(SignatureSet::default());
        }
        SignatureSet::from_json(&self.signatures)
    }

    /// Every rule entry, parsed independently.
    pub fn parse_rules(&self) -> Vec<Result<Rule, ConfigError>> {
        self.rules.iter().map(Rule::from_json).collect()
    }

    pub fn is_enabled(&self, rule: &Rule) -> bool {
        rule.enabled && (self.enabled_rules.is_empty() || self.enabled_rules.contains(&rule.id))
    }
}
