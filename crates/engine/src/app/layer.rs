use std::collections::{BTreeSet, HashMap, HashSet};

use super::node::EntityId;

/// Draw policy of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPolicy {
    /// Set semantics, no draw order guarantee between members.
    Unordered,
    /// Members draw in placement order.
    Ordered,
    /// Members are painted once into an off-screen buffer that is re-blitted
    /// until membership changes.
    CachedStatic,
}

#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    policy: LayerPolicy,
    unordered: BTreeSet<EntityId>,
    ordered: Vec<EntityId>,
    index: HashSet<EntityId>,
    revision: u64,
}

impl Layer {
    fn new(name: &str, policy: LayerPolicy) -> Self {
        Self {
            name: name.to_string(),
            policy,
            unordered: BTreeSet::new(),
            ordered: Vec::new(),
            index: HashSet::new(),
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> LayerPolicy {
        self.policy
    }

    /// Bumped whenever membership changes; cached layers repaint on change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn add(&mut self, id: EntityId) {
        match self.policy {
            LayerPolicy::Unordered => {
                self.unordered.insert(id);
            }
            LayerPolicy::Ordered | LayerPolicy::CachedStatic => {
                if self.index.insert(id) {
                    self.ordered.push(id);
                }
            }
        }
        self.revision += 1;
    }

    pub(crate) fn remove(&mut self, id: EntityId) {
        match self.policy {
            LayerPolicy::Unordered => {
                self.unordered.remove(&id);
            }
            LayerPolicy::Ordered | LayerPolicy::CachedStatic => {
                if self.index.remove(&id) {
                    self.ordered.retain(|member| *member != id);
                }
            }
        }
        self.revision += 1;
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.unordered.contains(&id) || self.index.contains(&id)
    }

    pub fn members(&self) -> Vec<EntityId> {
        match self.policy {
            LayerPolicy::Unordered => self.unordered.iter().copied().collect(),
            LayerPolicy::Ordered | LayerPolicy::CachedStatic => self.ordered.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.unordered.len() + self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named layers kept in creation order, which is also the draw order.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: HashMap<String, Layer>,
    order: Vec<String>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creating a name that already exists replaces that layer and moves it
    /// to the top of the draw order. Returns the members of the replaced
    /// layer so their back-references can be cleared.
    pub(crate) fn create(&mut self, name: &str, policy: LayerPolicy) -> Vec<EntityId> {
        let previous = self
            .layers
            .insert(name.to_string(), Layer::new(name, policy))
            .map(|old| old.members())
            .unwrap_or_default();
        self.order.retain(|existing| existing != name);
        self.order.push(name.to_string());
        previous
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Layer> {
        self.order.iter().filter_map(|name| self.layers.get(name))
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub(crate) fn clear(&mut self) {
        self.layers.clear();
        self.order.clear();
    }
}
