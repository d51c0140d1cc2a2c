//! Linear undo/redo over the undoable part of the scene.
//!
//! A snapshot holds `{layers, painted_cells}`. Fog, background, and
//! selection are not part of it and are never rewound. The entry at
//! `step` always mirrors what is on screen right after an undo or redo.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::MAX_HISTORY;
use crate::scene::{Layer, PaintedCell, Scene};

/// Deep copy of the undoable scene state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub layers: Vec<Layer>,
    pub painted_cells: Vec<PaintedCell>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(scene: &Scene) -> Self {
        Self { layers: scene.layers.clone(), painted_cells: scene.painted_cells.clone() }
    }

    fn restore_into(&self, scene: &mut Scene) {
        scene.layers.clone_from(&self.layers);
        scene.painted_cells.clone_from(&self.painted_cells);
    }
}

/// Snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    step: usize,
    capacity: usize,
}

impl History {
    /// Start a history whose first entry is the current state of `scene`.
    #[must_use]
    pub fn new(scene: &Scene) -> Self {
        Self::with_capacity(scene, MAX_HISTORY)
    }

    /// Like [`History::new`] but retaining at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(scene: &Scene, capacity: usize) -> Self {
        Self { entries: vec![Snapshot::capture(scene)], step: 0, capacity: capacity.max(1) }
    }

    /// Drop everything and start over from `scene`.
    pub fn reset(&mut self, scene: &Scene) {
        self.entries.clear();
        self.entries.push(Snapshot::capture(scene));
        self.step = 0;
    }

    /// Record the current state. Any redo entries past the cursor are lost.
    pub fn snapshot(&mut self, scene: &Scene) {
        self.entries.truncate(self.step + 1);
        self.entries.push(Snapshot::capture(scene));
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
        }
        self.step = self.entries.len() - 1;
    }

    /// Step back one entry and restore it. Returns `false` at the start.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        if self.step == 0 {
            return false;
        }
        self.step -= 1;
        self.entries[self.step].restore_into(scene);
        true
    }

    /// Step forward one entry and restore it. Returns `false` at the tail.
    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        if self.step + 1 >= self.entries.len() {
            return false;
        }
        self.step += 1;
        self.entries[self.step].restore_into(scene);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.step > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.step + 1 < self.entries.len()
    }

    /// Current cursor position.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a history holds at least its initial entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
