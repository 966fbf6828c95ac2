use std::collections::BTreeSet;

use super::action::ActionId;
use super::particles::{EmitterId, ParticleSystemId};

/// Anything the reactor advances once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickTarget {
    Action(ActionId),
    Emitter(EmitterId),
    Particles(ParticleSystemId),
}

/// Per-frame scheduler with deferred membership changes. Adds and removes
/// requested while a pass runs are buffered and applied at the start of the
/// next pass.
#[derive(Debug)]
pub struct Reactor<T: Ord + Copy = TickTarget> {
    live: BTreeSet<T>,
    to_add: BTreeSet<T>,
    to_remove: BTreeSet<T>,
}

impl<T: Ord + Copy> Default for Reactor<T> {
    fn default() -> Self {
        Self {
            live: BTreeSet::new(),
            to_add: BTreeSet::new(),
            to_remove: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Copy> Reactor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: T) {
        self.to_remove.remove(&target);
        self.to_add.insert(target);
    }

    pub fn remove(&mut self, target: T) {
        self.to_add.remove(&target);
        self.to_remove.insert(target);
    }

    /// Applies buffered changes and returns the set to advance this pass.
    pub fn begin_pass(&mut self) -> Vec<T> {
        self.live.append(&mut self.to_add);
        for target in std::mem::take(&mut self.to_remove) {
            self.live.remove(&target);
        }
        self.live.iter().copied().collect()
    }

    /// Removal requested since the pass began; such targets are skipped.
    pub fn is_removed(&self, target: T) -> bool {
        self.to_remove.contains(&target)
    }

    pub fn contains(&self, target: T) -> bool {
        (self.live.contains(&target) || self.to_add.contains(&target))
            && !self.to_remove.contains(&target)
    }

    pub fn len(&self) -> usize {
        self.live
            .union(&self.to_add)
            .filter(|t| !self.to_remove.contains(t))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.to_add.clear();
        self.to_remove.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additions_wait_for_next_pass() {
        let mut reactor: Reactor<u32> = Reactor::new();
        reactor.add(1);
        assert_eq!(reactor.begin_pass(), vec![1]);
        reactor.add(2);
        reactor.remove(1);
        assert!(reactor.is_removed(1));
        assert_eq!(reactor.begin_pass(), vec![2]);
    }

    #[test]
    fn add_then_remove_cancels() {
        let mut reactor: Reactor<u32> = Reactor::new();
        reactor.add(7);
        reactor.remove(7);
        assert!(reactor.begin_pass().is_empty());
        reactor.remove(3);
        reactor.add(3);
        assert_eq!(reactor.begin_pass(), vec![3]);
    }

    #[test]
    fn clear_drops_pending_and_live() {
        let mut reactor: Reactor<u32> = Reactor::new();
        reactor.add(1);
        reactor.begin_pass();
        reactor.add(2);
        reactor.clear();
        assert!(reactor.is_empty());
        assert!(reactor.begin_pass().is_empty());
    }
}
