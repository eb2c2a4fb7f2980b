use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

pub const HP_PERCENTAGE: &str = "hpPercentage";
pub const MANA_PERCENTAGE: &str = "manaPercentage";
pub const IS_BAR_VISIBLE: &str = "isBarVisible";
pub const IS_HEALING_COOLDOWN: &str = "isHealingCooldown";

/// A derived value written by the scan pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Percent(u8),
    Flag(bool),
}

impl Signal {
    /// Percentages are clamped to 0..=100.
    pub fn percent(value: u32) -> Signal {
        Signal::Percent(value.min(100) as u8)
    }
}

/// Latest signal values for one capture session.
///
/// Writers replace a key's value whole (last write wins); readers get a
/// complete value or nothing, never a partial update.
#[derive(Debug, Default)]
pub struct SignalStore {
    values: RwLock<HashMap<String, Signal>>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, name: &str, value: Signal) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Signal> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).get(name).copied()
    }

    /// Consistent copy of every signal, taken under one read lock.
    pub fn snapshot(&self) -> Signals {
        Signals(self.values.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Forget everything; called when the session ends.
    pub fn clear(&self) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Point-in-time view of the store, read by one evaluation tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signals(HashMap<String, Signal>);

impl Signals {
    pub fn with(mut self, name: &str, value: Signal) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<Signal> {
        self.0.get(name).copied()
    }

    /// `None` when the signal was never observed or is not a percentage.
    pub fn percent(&self, name: &str) -> Option<u8> {
        match self.get(name)? {
            Signal::Percent(p) => Some(p),
            Signal::Flag(_) => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Signal::Flag(f) => Some(f),
            Signal::Percent(_) => None,
        }
    }

    pub fn hp(&self) -> Option<u8> {
        self.percent(HP_PERCENTAGE)
    }

    pub fn mana(&self) -> Option<u8> {
        self.percent(MANA_PERCENTAGE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
