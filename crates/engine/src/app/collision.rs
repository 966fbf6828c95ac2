use std::collections::HashMap;

use super::node::{EntityId, Vec2, World};

/// Circle attached to an owner; its center is the owner's position plus
/// `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionNode {
    pub owner: EntityId,
    pub radius: f32,
    pub offset: Vec2,
}

/// A pair of group names whose members are tested against each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionPair {
    pub first: &'static str,
    pub second: &'static str,
}

/// Brute-force radial overlap between named groups.
#[derive(Debug, Default)]
pub struct CollisionEngine {
    groups: HashMap<&'static str, Vec<CollisionNode>>,
    pairs: Vec<CollisionPair>,
}

impl CollisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, first: &'static str, second: &'static str) {
        self.pairs.push(CollisionPair { first, second });
    }

    pub fn add_node(&mut self, group: &'static str, node: CollisionNode) {
        self.groups.entry(group).or_default().push(node);
    }

    pub fn remove_owner(&mut self, owner: EntityId) {
        for nodes in self.groups.values_mut() {
            nodes.retain(|node| node.owner != owner);
        }
    }

    pub fn nodes(&self, group: &str) -> &[CollisionNode] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pairs(&self) -> &[CollisionPair] {
        &self.pairs
    }

    pub fn node_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.pairs.clear();
    }

    /// Snapshot of the overlapping owner pairs for one handler, in group
    /// order. Callers dispatch each hit after re-checking liveness since
    /// earlier callbacks may delete or hide owners.
    pub fn candidates(&self, pair: &CollisionPair, world: &World) -> Vec<(CollisionNode, CollisionNode)> {
        let mut hits = Vec::new();
        for a in self.nodes(pair.first) {
            if !is_live(world, a.owner) {
                continue;
            }
            for b in self.nodes(pair.second) {
                if a.owner == b.owner || !is_live(world, b.owner) {
                    continue;
                }
                if overlaps(world, a, b) {
                    hits.push((*a, *b));
                }
            }
        }
        hits
    }
}

pub(crate) fn is_live(world: &World, owner: EntityId) -> bool {
    world.get(owner).is_some_and(|e| e.is_visible())
}

pub(crate) fn center_of(world: &World, node: &CollisionNode) -> Option<Vec2> {
    world
        .get(node.owner)
        .map(|e| Vec2::new(e.x + node.offset.x, e.y + node.offset.y))
}

/// Strict test: circles that merely touch do not collide.
pub(crate) fn overlaps(world: &World, a: &CollisionNode, b: &CollisionNode) -> bool {
    let (Some(pa), Some(pb)) = (center_of(world, a), center_of(world, b)) else {
        return false;
    };
    circles_overlap(pa, a.radius, pb, b.radius)
}

pub fn circles_overlap(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> bool {
    let dx = pa.x - pb.x;
    let dy = pa.y - pb.y;
    let reach = ra + rb;
    dx * dx + dy * dy < reach * reach
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_circles_do_not_collide() {
        let a = Vec2::new(0.0, 0.0);
        assert!(!circles_overlap(a, 3.0, Vec2::new(5.0, 0.0), 2.0));
        assert!(circles_overlap(a, 3.0, Vec2::new(4.999, 0.0), 2.0));
        assert!(!circles_overlap(a, 3.0, Vec2::new(3.0, 4.0), 2.0));
    }

    #[test]
    fn candidates_skip_hidden_and_same_owner() {
        let mut world = World::new();
        let player = world.spawn();
        let item = world.spawn();
        let ghost = world.spawn();
        if let Some(g) = world.get_mut(ghost) {
            g.hidden = true;
        }

        let mut engine = CollisionEngine::new();
        engine.add_handler("player", "bonus");
        let at = |owner| CollisionNode {
            owner,
            radius: 5.0,
            offset: Vec2::default(),
        };
        engine.add_node("player", at(player));
        engine.add_node("bonus", at(item));
        engine.add_node("bonus", at(ghost));
        engine.add_node("bonus", at(player));

        let pair = engine.pairs()[0].clone();
        let hits = engine.candidates(&pair, &world);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.owner, item);
    }

    #[test]
    fn offsets_shift_circle_centers() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        if let Some(e) = world.get_mut(b) {
            e.y = -100.0;
        }
        let na = CollisionNode {
            owner: a,
            radius: 10.0,
            offset: Vec2::new(0.0, -95.0),
        };
        let nb = CollisionNode {
            owner: b,
            radius: 1.0,
            offset: Vec2::default(),
        };
        assert!(overlaps(&world, &na, &nb));
    }

    #[test]
    fn remove_owner_drops_all_its_circles() {
        let mut engine = CollisionEngine::new();
        let owner = EntityId(9);
        for group in ["ground", "player"] {
            engine.add_node(
                group,
                CollisionNode {
                    owner,
                    radius: 1.0,
                    offset: Vec2::default(),
                },
            );
        }
        engine.remove_owner(owner);
        assert_eq!(engine.node_count(), 0);
    }
}
