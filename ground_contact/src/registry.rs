use std::collections::HashMap;
use std::hash::Hash;

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use smallvec::SmallVec;

/// Ground points of one body, relative to the lower hemisphere centre.
pub type GroundPoints = SmallVec<[Vector<Real>; 4]>;

/// Small dense id assigned to a body while it supports the character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroundSlot(u32);

impl GroundSlot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct GroundEntry<B> {
    body: B,
    points: GroundPoints,
}

/// Bodies currently supporting the character and their ground points.
///
/// Entries live in a slot array; a body keeps its slot for as long as it stays
/// in the registry and freed slots are reused. Iteration follows slot order,
/// which is stable between mutations but otherwise unrelated to when a body
/// first touched the character.
#[derive(Clone, Debug)]
pub struct GroundRegistry<B> {
    slots: Vec<Option<GroundEntry<B>>>,
    index: HashMap<B, GroundSlot>,
    free: Vec<GroundSlot>,
}

impl<B> Default for GroundRegistry<B> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
        }
    }
}

impl<B: Copy + Eq + Hash> GroundRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces the ground points of `body`.
    ///
    /// An empty point list removes the body instead. Returns the slot the body
    /// occupies afterwards.
    pub fn upsert(&mut self, body: B, points: GroundPoints) -> Option<GroundSlot> {
        if points.is_empty() {
            self.remove(body);
            return None;
        }
        if let Some(&slot) = self.index.get(&body) {
            self.slots[slot.index()] = Some(GroundEntry { body, points });
            return Some(slot);
        }
        let entry = Some(GroundEntry { body, points });
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot.index()] = entry;
                slot
            }
            None => {
                let slot = GroundSlot(self.slots.len() as u32);
                self.slots.push(entry);
                slot
            }
        };
        self.index.insert(body, slot);
        Some(slot)
    }

    /// Drops `body` and reclaims its slot. Returns whether it was present.
    pub fn remove(&mut self, body: B) -> bool {
        let Some(slot) = self.index.remove(&body) else {
            return false;
        };
        self.slots[slot.index()] = None;
        self.free.push(slot);
        true
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.free.clear();
    }

    pub fn contains(&self, body: B) -> bool {
        self.index.contains_key(&body)
    }

    pub fn slot(&self, body: B) -> Option<GroundSlot> {
        self.index.get(&body).copied()
    }

    pub fn points(&self, body: B) -> Option<&[Vector<Real>]> {
        let slot = self.index.get(&body)?;
        self.slots[slot.index()]
            .as_ref()
            .map(|entry| entry.points.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when at least one body contributes at least one ground point.
    pub fn is_grounded(&self) -> bool {
        self.ground_points().next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (B, &[Vector<Real>])> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|entry| (entry.body, entry.points.as_slice()))
    }

    /// All ground points of all bodies, in slot order.
    pub fn ground_points(&self) -> impl Iterator<Item = &Vector<Real>> + '_ {
        self.slots
            .iter()
            .flatten()
            .flat_map(|entry| entry.points.iter())
    }
}
