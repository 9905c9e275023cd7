//! Arena of transforms linked by non-owning parent handles.
//!
//! A parent never owns its children. Handles carry a generation, so a handle
//! to a removed node is reported as [`Error::StaleHandle`] instead of silently
//! aliasing whatever reuses the slot. Removing a node that still has children
//! is refused, which keeps every parent alive for as long as its children.

use log::debug;

use crate::error::{Error, Result};
use crate::math::*;
use crate::scene::transform::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId {
    index: u32,
    generation: u32,
}

impl TransformId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

struct Node {
    transform: Transform,
    parent: Option<TransformId>,
    children: Vec<TransformId>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A forest of transforms. Cycles are rejected when links are made, never during update.
#[derive(Default)]
pub struct Hierarchy {
    slots: Vec<Slot>,
    free: Vec<u32>,
    // parents-before-children order, rebuilt lazily after structural edits
    order: Option<Vec<TransformId>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TransformId) -> bool {
        self.node(id).is_ok()
    }

    pub fn insert(&mut self, transform: Transform) -> TransformId {
        let node = Node { transform, parent: None, children: Vec::new() };
        self.order = None;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                TransformId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, node: Some(node) });
                TransformId { index, generation: 0 }
            }
        }
    }

    /// Inserts `transform` already linked under `parent`.
    pub fn insert_child(&mut self, parent: TransformId, transform: Transform) -> Result<TransformId> {
        self.node(parent)?;
        let id = self.insert(transform);
        self.set_parent(id, parent)?;
        Ok(id)
    }

    /// Removes a leaf node and returns its transform. Nodes with children are refused.
    pub fn remove(&mut self, id: TransformId) -> Result<Transform> {
        let node = self.node(id)?;
        if !node.children.is_empty() {
            return Err(Error::InvalidHierarchy(format!(
                "cannot remove {:?}: still parent of {} node(s)",
                id,
                node.children.len()
            )));
        }

        self.detach(id)?;
        let slot = &mut self.slots[id.index()];
        let node = slot.node.take().ok_or(Error::StaleHandle(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order = None;
        debug!("removed transform {:?}", id);
        Ok(node.transform)
    }

    pub fn get(&self, id: TransformId) -> Result<&Transform> {
        Ok(&self.node(id)?.transform)
    }

    pub fn get_mut(&mut self, id: TransformId) -> Result<&mut Transform> {
        Ok(&mut self.node_mut(id)?.transform)
    }

    pub fn parent(&self, id: TransformId) -> Result<Option<TransformId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: TransformId) -> Result<&[TransformId]> {
        Ok(&self.node(id)?.children)
    }

    /// World matrix as of the last update.
    pub fn world(&self, id: TransformId) -> Result<Mat44> {
        Ok(self.node(id)?.transform.world_matrix())
    }

    /// Links `child` under `parent`, replacing any previous parent.
    pub fn set_parent(&mut self, child: TransformId, parent: TransformId) -> Result<()> {
        self.node(child)?;
        self.node(parent)?;
        if child == parent {
            return Err(Error::InvalidHierarchy(format!("{:?} cannot be its own parent", child)));
        }

        // walking up from the new parent must never reach the child
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(Error::InvalidHierarchy(format!(
                    "parenting {:?} under {:?} would create a cycle",
                    child, parent
                )));
            }
            cursor = self.node(ancestor)?.parent;
        }

        if self.node(child)?.parent == Some(parent) {
            return Ok(());
        }

        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.order = None;
        debug!("parented {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Turns `child` into a root.
    pub fn clear_parent(&mut self, child: TransformId) -> Result<()> {
        self.detach(child)?;
        self.order = None;
        Ok(())
    }

    /// Every live node, roots first and every parent before its children.
    pub fn update_order(&mut self) -> &[TransformId] {
        if self.order.is_none() {
            self.order = Some(self.build_order());
        }
        self.order.as_deref().unwrap_or_default()
    }

    /// Integrates and recomposes a single node against its parent's cached matrices.
    ///
    /// The parent must already have been updated this frame; nothing here
    /// enforces the ordering. Use [`Hierarchy::update`] to do the whole forest.
    pub fn compute_world_matrix(&mut self, id: TransformId, dt: f32) -> Result<Mat44> {
        let frame = match self.node(id)?.parent {
            Some(parent) => self.node(parent)?.transform.as_parent_frame(),
            None => ParentFrame::ROOT,
        };
        Ok(self.node_mut(id)?.transform.update(&frame, dt))
    }

    /// Runs [`Hierarchy::compute_world_matrix`] over every node in [`Hierarchy::update_order`].
    pub fn update(&mut self, dt: f32) -> Result<()> {
        self.update_order();
        let order = self.order.take().unwrap_or_default();
        let result = order.iter().try_for_each(|&id| self.compute_world_matrix(id, dt).map(|_| ()));
        self.order = Some(order);
        result
    }

    fn build_order(&self) -> Vec<TransformId> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(node) = &slot.node else { continue };
            if node.parent.is_some() {
                continue;
            }
            stack.push(TransformId { index: index as u32, generation: slot.generation });
            while let Some(id) = stack.pop() {
                order.push(id);
                if let Ok(node) = self.node(id) {
                    // reversed so children come out in insertion order
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        order
    }

    fn detach(&mut self, child: TransformId) -> Result<()> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != child);
        Ok(())
    }

    fn node(&self, id: TransformId) -> Result<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::StaleHandle(id))
    }

    fn node_mut(&mut self, id: TransformId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(Error::StaleHandle(id))
    }
}
