//! Generational arena owning every patch node.
//!
//! Parent/child links are [`PatchId`]s, not references. An id stays valid
//! until its patch is removed; afterwards it never resolves again, even when
//! the slot is reused, so late build results cannot reach a recycled node.

use std::fmt;

use crate::patch::PatchNode;

/// Stable handle to a patch in a [`PatchArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId {
    index: u32,
    generation: u32,
}

impl PatchId {
    /// Slot index inside the arena.
    pub fn index(self) -> u32 {
        self.index
    }

    /// How many times the slot had been vacated before this id was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch {}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    node: Option<PatchNode>,
}

/// Owns all [`PatchNode`]s of a planet.
#[derive(Default)]
pub struct PatchArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl PatchArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its id.
    pub fn insert(&mut self, node: PatchNode) -> PatchId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return PatchId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        PatchId {
            index,
            generation: 0,
        }
    }

    /// Remove a node, returning it if the id was live.
    pub fn remove(&mut self, id: PatchId) -> Option<PatchNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    /// Look up a live node.
    pub fn get(&self, id: PatchId) -> Option<&PatchNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Look up a live node mutably.
    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut PatchNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: PatchId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &PatchNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    PatchId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }
}
