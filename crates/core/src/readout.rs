use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::rule::Category;
use crate::scanner::ScanResult;
use crate::signals::{Signal, SignalStore, HP_PERCENTAGE, IS_BAR_VISIBLE, MANA_PERCENTAGE};
use crate::types::{Capture, Point, Rgb};

/// A horizontal bar whose filled length encodes a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarReadout {
    /// Signature whose (offset) match marks the first fill pixel.
    pub signature: String,
    /// Fill length at 100%.
    pub width: u32,
    pub fill: Vec<Rgb>,
}

impl BarReadout {
    /// Filled share of the bar starting at `start`, rounded to a whole percent.
    pub fn percent(&self, capture: &Capture, start: Point) -> u32 {
        if self.width == 0 {
            return 0;
        }
        let filled = (0..self.width as i32)
            .take_while(|dx| {
                capture
                    .pixel(start.x + dx, start.y)
                    .is_some_and(|c| self.fill.contains(&c))
            })
            .count() as u32;
        (filled * 100 + self.width / 2) / self.width
    }
}

/// How a scan result becomes signal updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadoutConfig {
    pub health_bar: Option<BarReadout>,
    pub mana_bar: Option<BarReadout>,
    /// Cooldown icon signature -> category it blocks.
    pub cooldowns: BTreeMap<String, Category>,
    /// Presence signature (status icon, hotkey item, floor marker) -> signal name.
    pub flags: BTreeMap<String, String>,
}

impl ReadoutConfig {
    /// Signature names this readout depends on.
    pub fn signatures(&self) -> BTreeSet<&str> {
        let bars = [&self.health_bar, &self.mana_bar];
        bars.into_iter()
            .flatten()
            .map(|b| b.signature.as_str())
            .chain(self.cooldowns.keys().map(String::as_str))
            .chain(self.flags.keys().map(String::as_str))
            .collect()
    }

    /// Write this cycle's signals. A hidden bar keeps its last percentage.
    pub fn apply(&self, result: &ScanResult, capture: &Capture, store: &SignalStore) {
        if let Some(bar) = &self.health_bar {
            let found = result.get(&bar.signature);
            store.update(IS_BAR_VISIBLE, Signal::Flag(found.is_some()));
            if let Some(at) = found {
                store.update(HP_PERCENTAGE, Signal::percent(bar.percent(capture, at)));
            }
        }
        if let Some(bar) = &self.mana_bar {
            if let Some(at) = result.get(&bar.signature) {
                store.update(MANA_PERCENTAGE, Signal::percent(bar.percent(capture, at)));
            }
        }

        let mut cooling: BTreeMap<Category, bool> = BTreeMap::new();
        for (signature, category) in &self.cooldowns {
            *cooling.entry(*category).or_default() |= result.contains(signature);
        }
        for (category, on) in cooling {
            if let Some(name) = category.cooldown_signal() {
                store.update(name, Signal::Flag(on));
            }
        }

        for (signature, name) in &self.flags {
            store.update(name, Signal::Flag(result.contains(signature)));
        }
    }
}
