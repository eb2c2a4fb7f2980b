use std::collections::BTreeMap;

use crate::index::{SignatureIndex, ROOT};
use crate::types::{Capture, Point};

/// Signature name -> first match coordinate (offset applied). Names that
/// did not match are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    found: BTreeMap<String, Point>,
}

impl ScanResult {
    pub fn get(&self, name: &str) -> Option<Point> {
        self.found.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.found.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> {
        self.found.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

/// Find every indexed signature in `capture` in one pass over its cells.
///
/// The buffer is treated as `width*height` flattened cells. From each start
/// cell (ascending) the index is walked once per scan direction in use,
/// reading cell `start + j` through that direction's coordinate mapping, so
/// runs wrap across row (or column) ends. A signature is recorded at the
/// coordinates of the start cell plus its offset, the first time its
/// terminal is reached with a matching direction, and never again.
///
/// Cost is O(W*H*L) for a longest sequence L; keep regions small.
pub fn scan(capture: &Capture, index: &SignatureIndex) -> ScanResult {
    let (w, h) = (capture.width as usize, capture.height as usize);
    let cells = w * h;
    let mut found: Vec<Option<Point>> = vec![None; index.len()];
    let directions = index.directions();

    // Unmatched signatures per direction; a direction with none left is skipped.
    let mut live: Vec<usize> = directions
        .iter()
        .map(|d| (0..index.len()).filter(|&slot| index.direction_of(slot) == *d).count())
        .collect();
    let mut remaining: usize = live.iter().sum();

    'cells: for start in 0..cells {
        for (di, &dir) in directions.iter().enumerate() {
            if live[di] == 0 {
                continue;
            }
            let (sx, sy) = dir.coords(start, w, h);
            let origin = Point::new(sx as i32, sy as i32);

            let mut node = ROOT;
            for cell in start..cells {
                let (x, y) = dir.coords(cell, w, h);
                let Some(color) = capture.pixel(x as i32, y as i32) else { break };
                let Some(next) = index.child(node, color.packed()) else { break };
                node = next;

                for t in index.terminals(node) {
                    if t.direction == dir && found[t.slot].is_none() {
                        found[t.slot] = Some(origin.offset(t.offset));
                        live[di] -= 1;
                        remaining -= 1;
                    }
                }
                if remaining == 0 {
                    break 'cells;
                }
            }
        }
    }

    ScanResult {
        found: found
            .into_iter()
            .enumerate()
            .filter_map(|(slot, p)| p.map(|p| (index.name(slot).to_string(), p)))
            .collect(),
    }
}
