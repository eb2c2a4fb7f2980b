use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Point, Rgb};

/// How consecutive colors of a sequence are laid out in the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Along a row, wrapping into the next row.
    #[default]
    RowMajor,
    /// Down a column, wrapping into the next column.
    ColumnMajor,
}

impl Direction {
    /// Map a flattened cell index to (x, y) for a `width` x `height` buffer.
    pub fn coords(self, linear: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Direction::RowMajor => (linear % width, linear / width),
            Direction::ColumnMajor => (linear / height, linear % height),
        }
    }
}

/// An ordered run of colors identifying one UI element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSequence {
    colors: Vec<Rgb>,
    direction: Direction,
    offset: Point,
}

impl ColorSequence {
    pub fn new(colors: Vec<Rgb>, direction: Direction, offset: Point) -> Result<Self, ConfigError> {
        if colors.is_empty() {
            return Err(ConfigError::EmptySequence(String::new()));
        }
        Ok(Self { colors, direction, offset })
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn offset(&self) -> Point {
        self.offset
    }
}

/// Shape of a signature as written in settings.json.
#[derive(Debug, Clone, Deserialize)]
struct SequenceConfig {
    colors: Vec<Rgb>,
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    offset: Point,
}

/// Immutable catalog of named color sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignatureSet {
    sequences: BTreeMap<String, ColorSequence>,
}

impl SignatureSet {
    pub fn builder() -> SignatureSetBuilder {
        SignatureSetBuilder::default()
    }

    /// Parse the `signatures` object of settings.json.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, SequenceConfig> = serde_json::from_value(value.clone())?;
        let mut builder = Self::builder();
        for (name, seq) in raw {
            builder = builder.add(name, seq.colors, seq.direction, seq.offset);
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&ColorSequence> {
        self.sequences.get(name)
    }

    /// Sequences in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColorSequence)> {
        self.sequences.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[derive(Default)]
pub struct SignatureSetBuilder {
    entries: Vec<(String, Vec<Rgb>, Direction, Point)>,
}

impl SignatureSetBuilder {
    pub fn add(mut self, name: impl Into<String>, colors: Vec<Rgb>, direction: Direction, offset: Point) -> Self {
        self.entries.push((name.into(), colors, direction, offset));
        self
    }

    pub fn row(self, name: impl Into<String>, colors: Vec<Rgb>) -> Self {
        self.add(name, colors, Direction::RowMajor, Point::default())
    }

    pub fn column(self, name: impl Into<String>, colors: Vec<Rgb>) -> Self {
        self.add(name, colors, Direction::ColumnMajor, Point::default())
    }

    /// Later entries with the same name replace earlier ones.
    pub fn build(self) -> Result<SignatureSet, ConfigError> {
        let mut sequences = BTreeMap::new();
        for (name, colors, direction, offset) in self.entries {
            let seq = ColorSequence::new(colors, direction, offset).map_err(|_| ConfigError::EmptySequence(name.clone()))?;
            sequences.insert(name, seq);
        }
        Ok(SignatureSet { sequences })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "healthBar": { "colors": ["#db4f4f", "#c84a4a"], "offset": { "x": 5, "y": 2 } },
            "floorMarker": { "colors": [[1, 2, 3]], "direction": "column_major" }
        });
        let set = SignatureSet::from_json(&json).unwrap();
        assert_eq!(set.len(), 2);

        let bar = set.get("healthBar").unwrap();
        assert_eq!(bar.direction(), Direction::RowMajor);
        assert_eq!(bar.offset(), Point::new(5, 2));
        assert_eq!(bar.colors()[1], Rgb::new(0xc8, 0x4a, 0x4a));

        assert_eq!(set.get("floorMarker").unwrap().direction(), Direction::ColumnMajor);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = SignatureSet::builder().row("nothing", vec![]).build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptySequence(name) if name == "nothing"));
    }

    #[test]
    fn test_direction_coords() {
        assert_eq!(Direction::RowMajor.coords(7, 5, 3), (2, 1));
        assert_eq!(Direction::ColumnMajor.coords(7, 5, 3), (2, 1));
        assert_eq!(Direction::ColumnMajor.coords(4, 5, 3), (1, 1));
    }
}
