//! Labeled point lists.
//!
//! A [`PointList`] is an ordered sequence of `(label, point)` entries living in
//! one [`CoordinateSpace`]. Insertion order is significant: when two lists are
//! used as correspondences, the index is the pairing key. Helpers in this
//! module mutate several lists in lockstep and check that paired lists stay
//! aligned.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::Pt3;

/// Coordinate frame a point list lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Image coordinates scaled to millimetres.
    ImageMm,
    /// Frame rigidly attached to the tracked probe.
    Probe,
}

/// A recorded point together with its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: String,
    pub position: Pt3,
}

/// Ordered, labeled collection of points in a single coordinate space.
///
/// Recorded points are never edited in place; they are only removed
/// (undo, delete, clear) and re-added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointList {
    name: String,
    space: CoordinateSpace,
    points: Vec<LabeledPoint>,
}

impl PointList {
    /// Create an empty list.
    pub fn new(name: impl Into<String>, space: CoordinateSpace) -> Self {
        Self {
            name: name.into(),
            space,
            points: Vec::new(),
        }
    }

    /// Create a list from positions, labeling them automatically.
    pub fn from_positions(
        name: impl Into<String>,
        space: CoordinateSpace,
        positions: impl IntoIterator<Item = Pt3>,
    ) -> Self {
        let mut list = Self::new(name, space);
        for p in positions {
            list.append_auto(p);
        }
        list
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LabeledPoint> {
        self.points.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledPoint> {
        self.points.iter()
    }

    /// Positions in insertion order.
    pub fn positions(&self) -> Vec<Pt3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    /// Append an entry at the end and return its index.
    pub fn append(&mut self, label: impl Into<String>, position: Pt3) -> usize {
        self.points.push(LabeledPoint {
            label: label.into(),
            position,
        });
        self.points.len() - 1
    }

    /// Append an entry labeled `<name>-<k>` and return its index.
    ///
    /// See [`PointList::next_auto_label`] for how `k` is chosen.
    pub fn append_auto(&mut self, position: Pt3) -> usize {
        let label = self.next_auto_label();
        self.append(label, position)
    }

    /// Label the next [`PointList::append_auto`] would use.
    ///
    /// `k` is one more than the largest numeric suffix currently present, so
    /// it is a pure function of the list contents: undoing an append restores
    /// the same next label.
    pub fn next_auto_label(&self) -> String {
        let prefix = format!("{}-", self.name);
        let max_k = self
            .points
            .iter()
            .filter_map(|p| p.label.strip_prefix(&prefix))
            .filter_map(|suffix| suffix.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{}", prefix, max_k + 1)
    }

    /// Remove the last entry. Empty lists are left as they are.
    pub fn undo_last(&mut self) -> Option<LabeledPoint> {
        self.points.pop()
    }

    /// Remove the entry at `index`; out-of-range indices are ignored.
    pub fn delete_at(&mut self, index: usize) -> Option<LabeledPoint> {
        (index < self.points.len()).then(|| self.points.remove(index))
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl<'a> IntoIterator for &'a PointList {
    type Item = &'a LabeledPoint;
    type IntoIter = std::slice::Iter<'a, LabeledPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Remove the last entry of every list in `lists`.
///
/// Used to keep correspondence lists aligned; empty lists are skipped.
pub fn undo_last_all(lists: &mut [&mut PointList]) {
    for list in lists.iter_mut() {
        list.undo_last();
    }
}

/// Remove the entry at `index` from every list that has one.
///
/// Lists shorter than `index + 1` are left untouched, which tolerates
/// lists whose lengths have drifted apart.
pub fn delete_at_all(lists: &mut [&mut PointList], index: usize) {
    for list in lists.iter_mut() {
        list.delete_at(index);
    }
}

/// Which list of a pair is longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSide {
    First,
    Second,
}

/// Length relation between two correspondence lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSync {
    /// Equal lengths.
    Aligned,
    /// One list leads by exactly one entry, as happens mid-way through a
    /// matched add.
    Pending { leading: PairSide },
    /// Lengths differ by more than one entry.
    Desynchronized { first: usize, second: usize },
}

impl PairSync {
    /// Whether this state is a synchronization fault.
    pub fn is_fault(&self) -> bool {
        matches!(self, PairSync::Desynchronized { .. })
    }
}

/// Compare the lengths of two paired lists.
///
/// A difference larger than the single transient entry allowed during a
/// matched add is reported as [`PairSync::Desynchronized`] and logged.
pub fn count_mismatch(first: &PointList, second: &PointList) -> PairSync {
    let (a, b) = (first.len(), second.len());
    match a.abs_diff(b) {
        0 => PairSync::Aligned,
        1 => PairSync::Pending {
            leading: if a > b {
                PairSide::First
            } else {
                PairSide::Second
            },
        },
        _ => {
            warn!(
                "point lists '{}' ({}) and '{}' ({}) have become unsynchronized",
                first.name(),
                a,
                second.name(),
                b
            );
            PairSync::Desynchronized {
                first: a,
                second: b,
            }
        }
    }
}
