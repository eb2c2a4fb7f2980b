use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CaptureRect, Rgb};

/// Threshold comparison used by both the HP and mana conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    pub fn compare(self, current: u8, threshold: u8) -> bool {
        match self {
            Operator::Lt => current < threshold,
            Operator::Le => current <= threshold,
            Operator::Eq => current == threshold,
            Operator::Gt => current > threshold,
            Operator::Ge => current >= threshold,
            Operator::Ne => current != threshold,
        }
    }
}

/// Action family sharing one cooldown flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    #[default]
    None,
    Healing,
    Support,
    Attack,
    Potion,
}

impl Category {
    /// Name of the signal that is `true` while this category is on cooldown.
    pub fn cooldown_signal(self) -> Option<&'static str> {
        match self {
            Category::None => None,
            Category::Healing => Some(crate::signals::IS_HEALING_COOLDOWN),
            Category::Support => Some("isSupportCooldown"),
            Category::Attack => Some("isAttackCooldown"),
            Category::Potion => Some("isPotionCooldown"),
        }
    }
}

/// A pixel that must (or must not) show a given color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
    pub enabled: bool,
}

impl Probe {
    pub fn holds(&self, sampled: Rgb) -> bool {
        (sampled == self.color) == self.enabled
    }
}

fn default_enabled() -> bool {
    true
}

/// A user-authored trigger. Never patched once its loop is running; an edit
/// replaces the whole rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub key: String,
    /// Evaluation period in milliseconds.
    pub interval: u64,
    #[serde(default)]
    pub category: Category,
    pub hp_trigger_condition: Operator,
    pub hp_trigger_percentage: u8,
    pub mana_trigger_condition: Operator,
    pub mana_trigger_percentage: u8,
    #[serde(default)]
    pub conditions: Vec<Probe>,
}

/// Largest probe coordinate accepted; no window is this large.
pub const MAX_PROBE_COORD: i32 = 1 << 16;

fn key_pattern() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| {
        Regex::new(r"(?i)^((ctrl|control|shift|alt|option|cmd|command)\+)*([a-z0-9]|f([1-9]|1[0-9]|2[0-4])|space|enter|return|tab|escape|esc|up|down|left|right)$")
            .expect("key pattern is valid")
    })
}

impl Rule {
    /// Parse and validate one rule from settings.json.
    pub fn from_json(value: &serde_json::Value) -> Result<Rule, ConfigError> {
        let rule: Rule = serde_json::from_value(value.clone()).map_err(ConfigError::MalformedRule)?;
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidRule { id: self.id.clone(), reason };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".into()));
        }
        if self.interval == 0 {
            return Err(invalid("interval must be positive".into()));
        }
        if self.hp_trigger_percentage > 100 {
            return Err(invalid(format!("hp percentage {} out of range", self.hp_trigger_percentage)));
        }
        if self.mana_trigger_percentage > 100 {
            return Err(invalid(format!("mana percentage {} out of range", self.mana_trigger_percentage)));
        }
        if !key_pattern().is_match(&self.key) {
            return Err(invalid(format!("unsupported key \"{}\"", self.key)));
        }
        let outside = |c: i32| !(0..MAX_PROBE_COORD).contains(&c);
        if let Some(p) = self.conditions.iter().find(|p| outside(p.x) || outside(p.y)) {
            return Err(invalid(format!("probe ({}, {}) outside the window", p.x, p.y)));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    /// Smallest window-relative rect covering every probe. `None` without
    /// probes or when the span does not fit an `i32`.
    pub fn probe_bounds(&self) -> Option<CaptureRect> {
        let first = self.conditions.first()?;
        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in &self.conditions[1..] {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }
        let w = r.checked_sub(l)?.checked_add(1)?;
        let h = b.checked_sub(t)?.checked_add(1)?;
        Some(CaptureRect { l, t, w, h })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn heal_json() -> serde_json::Value {
        json!({
            "id": "heal",
            "key": "F1",
            "interval": 100,
            "category": "healing",
            "hpTriggerCondition": "<",
            "hpTriggerPercentage": 30,
            "manaTriggerCondition": ">=",
            "manaTriggerPercentage": 10,
            "conditions": [
                { "x": 12, "y": 40, "color": "#00ff00", "enabled": true },
                { "x": 3, "y": 55, "color": [0, 0, 0], "enabled": false }
            ]
        })
    }

    #[test]
    fn test_operator_compare() {
        assert!(Operator::Lt.compare(29, 30));
        assert!(!Operator::Lt.compare(30, 30));
        assert!(Operator::Le.compare(30, 30));
        assert!(Operator::Eq.compare(30, 30));
        assert!(Operator::Gt.compare(31, 30));
        assert!(Operator::Ge.compare(30, 30));
        assert!(Operator::Ne.compare(0, 30));
        assert!(!Operator::Ne.compare(30, 30));
    }

    #[test]
    fn test_parse_rule() {
        let rule = Rule::from_json(&heal_json()).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.category, Category::Healing);
        assert_eq!(rule.hp_trigger_condition, Operator::Lt);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.interval(), Duration::from_millis(100));
        assert_eq!(rule.probe_bounds(), Some(CaptureRect { l: 3, t: 40, w: 10, h: 16 }));
    }

    #[test]
    fn test_malformed_rules_rejected() {
        let mut missing_probe_y = heal_json();
        missing_probe_y["conditions"][0].as_object_mut().unwrap().remove("y");
        assert!(matches!(Rule::from_json(&missing_probe_y), Err(ConfigError::MalformedRule(_))));

        let mut text_percentage = heal_json();
        text_percentage["hpTriggerPercentage"] = json!("thirty");
        assert!(matches!(Rule::from_json(&text_percentage), Err(ConfigError::MalformedRule(_))));

        let mut bad_operator = heal_json();
        bad_operator["manaTriggerCondition"] = json!("~");
        assert!(Rule::from_json(&bad_operator).is_err());

        let mut bad_key = heal_json();
        bad_key["key"] = json!("ctrl+");
        assert!(matches!(Rule::from_json(&bad_key), Err(ConfigError::InvalidRule { .. })));

        let mut zero_interval = heal_json();
        zero_interval["interval"] = json!(0);
        assert!(matches!(Rule::from_json(&zero_interval), Err(ConfigError::InvalidRule { .. })));
    }

    #[test]
    fn test_far_probes_rejected() {
        let mut far = heal_json();
        far["conditions"] = json!([
            { "x": 0, "y": 0, "color": "#00ff00", "enabled": true },
            { "x": 2147483647, "y": 0, "color": "#00ff00", "enabled": true }
        ]);
        assert!(matches!(Rule::from_json(&far), Err(ConfigError::InvalidRule { .. })));

        // Bypassing validation still never overflows.
        let mut rule = Rule::from_json(&heal_json()).unwrap();
        rule.conditions[0].x = i32::MIN;
        rule.conditions[1].x = i32::MAX;
        assert!(rule.validate().is_err());
        assert_eq!(rule.probe_bounds(), None);
    }

    #[test]
    fn test_probe_holds() {
        let must_show = Probe { x: 0, y: 0, color: Rgb::new(1, 2, 3), enabled: true };
        let must_not = Probe { enabled: false, ..must_show };
        assert!(must_show.holds(Rgb::new(1, 2, 3)));
        assert!(!must_show.holds(Rgb::new(1, 2, 4)));
        assert!(must_not.holds(Rgb::new(1, 2, 4)));
        assert!(!must_not.holds(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn test_category_signals() {
        assert_eq!(Category::Healing.cooldown_signal(), Some("isHealingCooldown"));
        assert_eq!(Category::None.cooldown_signal(), None);
    }
}
