#![forbid(unsafe_code)]

//! Ordered bubble storage.
//!
//! [`BubbleRegistry`] keeps bubbles by key in an [`AHashMap`] and their
//! stacking order in a `Vec`, front (index 0) being the most recently
//! added. It also tracks which bubble is master and which are queued.
//!
//! # Invariants
//!
//! 1. Every key in the order appears in the map and vice versa, once.
//! 2. `stack_index` of every bubble equals its position in the order after
//!    any mutation.
//! 3. At most one bubble carries [`BubbleFlags::MASTER`], and it is the
//!    bubble named by [`master_key`](BubbleRegistry::master_key).
//!
//! The registry does not pick a new master on removal. The engine does,
//! because a hand-off also moves springs.

use std::fmt;

use ahash::AHashMap;

use crate::bubble::{Bubble, BubbleFlags, BubbleKey};

/// Result of [`BubbleRegistry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new bubble went to the front.
    Inserted,
    /// The key existed; its content was replaced in place.
    Updated,
}

/// A broken registry invariant, as found by
/// [`BubbleRegistry::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryInvariantError {
    /// Order and map disagree about the key set.
    KeyMismatch(BubbleKey),
    /// A bubble's `stack_index` is stale.
    StaleIndex {
        key: BubbleKey,
        index: usize,
        position: usize,
    },
    /// More than one bubble carries the master flag.
    MultipleMasters(usize),
    /// The recorded master does not carry the flag or does not exist.
    MasterMismatch,
}

impl fmt::Display for RegistryInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMismatch(key) => write!(f, "key {key} is in only one of order and map"),
            Self::StaleIndex {
                key,
                index,
                position,
            } => write!(f, "bubble {key} has stack index {index} but sits at {position}"),
            Self::MultipleMasters(n) => write!(f, "{n} bubbles flagged as master"),
            Self::MasterMismatch => write!(f, "master key and master flag disagree"),
        }
    }
}

impl std::error::Error for RegistryInvariantError {}

/// Bubbles by key, in stacking order.
#[derive(Debug)]
pub struct BubbleRegistry<C> {
    bubbles: AHashMap<BubbleKey, Bubble<C>>,
    order: Vec<BubbleKey>,
    master: Option<BubbleKey>,
}

impl<C> Default for BubbleRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BubbleRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bubbles: AHashMap::new(),
            order: Vec::new(),
            master: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &BubbleKey) -> bool {
        self.bubbles.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &BubbleKey) -> Option<&Bubble<C>> {
        self.bubbles.get(key)
    }

    pub fn get_mut(&mut self, key: &BubbleKey) -> Option<&mut Bubble<C>> {
        self.bubbles.get_mut(key)
    }

    /// Insert at the front, or replace the content of an existing key.
    ///
    /// On update the incoming bubble's window and springs are discarded;
    /// only its content is kept.
    pub fn insert(&mut self, bubble: Bubble<C>) -> Insertion {
        if let Some(existing) = self.bubbles.get_mut(bubble.key()) {
            existing.replace_content(bubble.into_content());
            return Insertion::Updated;
        }
        let key = bubble.key().clone();
        self.bubbles.insert(key.clone(), bubble);
        self.order.insert(0, key);
        self.update_positions();
        Insertion::Inserted
    }

    /// Remove a bubble and compact the stacking indices.
    pub fn remove(&mut self, key: &BubbleKey) -> Option<Bubble<C>> {
        let mut bubble = self.bubbles.remove(key)?;
        self.order.retain(|k| k != key);
        if self.master.as_ref() == Some(key) {
            self.master = None;
        }
        bubble.flags.remove(BubbleFlags::MASTER);
        self.update_positions();
        Some(bubble)
    }

    /// Remove every bubble, front first.
    pub fn drain(&mut self) -> Vec<Bubble<C>> {
        self.master = None;
        let order = std::mem::take(&mut self.order);
        order
            .iter()
            .filter_map(|k| self.bubbles.remove(k))
            .collect()
    }

    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&BubbleKey> {
        self.order.get(index)
    }

    #[must_use]
    pub fn index_of(&self, key: &BubbleKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// Keys in stacking order, front first.
    #[must_use]
    pub fn keys(&self) -> &[BubbleKey] {
        &self.order
    }

    #[must_use]
    pub fn master_key(&self) -> Option<&BubbleKey> {
        self.master.as_ref()
    }

    /// Make `key` the master. Returns `false` if the key is unknown.
    pub fn set_master(&mut self, key: &BubbleKey) -> bool {
        if !self.bubbles.contains_key(key) {
            return false;
        }
        if let Some(old) = self.master.take()
            && let Some(b) = self.bubbles.get_mut(&old)
        {
            b.flags.remove(BubbleFlags::MASTER);
        }
        if let Some(b) = self.bubbles.get_mut(key) {
            b.flags.insert(BubbleFlags::MASTER);
        }
        self.master = Some(key.clone());
        true
    }

    /// Front-most bubble that is not being destroyed.
    #[must_use]
    pub fn front_alive(&self) -> Option<&BubbleKey> {
        self.order
            .iter()
            .find(|k| self.bubbles.get(*k).is_some_and(|b| !b.is_destroyed()))
    }

    /// Rewrite `stack_index` from the order.
    pub fn update_positions(&mut self) {
        for (i, key) in self.order.iter().enumerate() {
            if let Some(b) = self.bubbles.get_mut(key) {
                b.stack_index = i;
            }
        }
    }

    /// Queue every bubble at index `max_visible` or later and unqueue the
    /// rest. Returns the keys whose queued state changed, with the new
    /// state.
    pub fn apply_queue(&mut self, max_visible: usize) -> Vec<(BubbleKey, bool)> {
        let mut changed = Vec::new();
        for (i, key) in self.order.iter().enumerate() {
            let Some(b) = self.bubbles.get_mut(key) else {
                continue;
            };
            let queued = i >= max_visible;
            if b.is_queued() != queued {
                b.flags.set(BubbleFlags::QUEUED, queued);
                changed.push((key.clone(), queued));
            }
        }
        changed
    }

    /// Bubbles in stacking order, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Bubble<C>> + '_ {
        self.order.iter().filter_map(|k| self.bubbles.get(k))
    }

    /// Mutable access to every bubble, in no particular order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Bubble<C>> + '_ {
        self.bubbles.values_mut()
    }

    /// Verify the registry invariants.
    pub fn check_invariants(&self) -> Result<(), RegistryInvariantError> {
        if self.order.len() != self.bubbles.len() {
            let missing = self
                .bubbles
                .keys()
                .find(|k| !self.order.contains(k))
                .or_else(|| self.order.iter().find(|k| !self.bubbles.contains_key(*k)));
            if let Some(key) = missing {
                return Err(RegistryInvariantError::KeyMismatch(key.clone()));
            }
        }
        for (position, key) in self.order.iter().enumerate() {
            let Some(b) = self.bubbles.get(key) else {
                return Err(RegistryInvariantError::KeyMismatch(key.clone()));
            };
            if b.stack_index != position {
                return Err(RegistryInvariantError::StaleIndex {
                    key: key.clone(),
                    index: b.stack_index,
                    position,
                });
            }
        }
        let masters = self.bubbles.values().filter(|b| b.is_master()).count();
        if masters > 1 {
            return Err(RegistryInvariantError::MultipleMasters(masters));
        }
        let flagged = self
            .master
            .as_ref()
            .and_then(|k| self.bubbles.get(k))
            .is_some_and(Bubble::is_master);
        if (masters == 1 || self.master.is_some()) && !flagged {
            return Err(RegistryInvariantError::MasterMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GestureConfig;
    use crate::controller::BubbleController;
    use crate::geometry::Point;
    use crate::surface::WindowHandle;

    fn bubble(key: &str, content: u32) -> Bubble<u32> {
        Bubble::new(
            BubbleKey::from(key),
            WindowHandle(u64::from(content)),
            content,
            Point::ZERO,
            BubbleController::new(GestureConfig::default()),
        )
    }

    fn keys(r: &BubbleRegistry<u32>) -> Vec<&str> {
        r.keys().iter().map(BubbleKey::as_str).collect()
    }

    #[test]
    fn insert_goes_to_front() {
        let mut r = BubbleRegistry::new();
        assert_eq!(r.insert(bubble("a", 1)), Insertion::Inserted);
        assert_eq!(r.insert(bubble("b", 2)), Insertion::Inserted);
        assert_eq!(keys(&r), vec!["b", "a"]);
        assert_eq!(r.get(&"a".into()).map(|b| b.stack_index()), Some(1));
        assert!(r.check_invariants().is_ok());
    }

    #[test]
    fn duplicate_key_updates_in_place() {
        let mut r = BubbleRegistry::new();
        r.insert(bubble("x", 1));
        r.insert(bubble("y", 2));
        assert_eq!(r.insert(bubble("x", 3)), Insertion::Updated);
        assert_eq!(r.len(), 2);
        let x = r.get(&"x".into()).expect("x");
        assert_eq!(*x.content(), 3);
        assert_eq!(x.window(), WindowHandle(1), "window survives the update");
        assert_eq!(keys(&r), vec!["y", "x"]);
    }

    #[test]
    fn remove_compacts_and_clears_master() {
        let mut r = BubbleRegistry::new();
        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            r.insert(bubble(k, i as u32));
        }
        assert!(r.set_master(&"b".into()));
        let removed = r.remove(&"b".into()).expect("b");
        assert!(!removed.is_master());
        assert_eq!(r.master_key(), None);
        assert_eq!(keys(&r), vec!["c", "a"]);
        assert_eq!(r.get(&"a".into()).map(|b| b.stack_index()), Some(1));
        assert!(r.check_invariants().is_ok());
        assert!(r.remove(&"b".into()).is_none());
    }

    #[test]
    fn master_moves_between_bubbles() {
        let mut r = BubbleRegistry::new();
        r.insert(bubble("a", 1));
        r.insert(bubble("b", 2));
        r.set_master(&"a".into());
        r.set_master(&"b".into());
        assert!(!r.get(&"a".into()).expect("a").is_master());
        assert!(r.get(&"b".into()).expect("b").is_master());
        assert!(!r.set_master(&"zzz".into()));
        assert!(r.check_invariants().is_ok());
    }

    #[test]
    fn queue_marks_overflow() {
        let mut r = BubbleRegistry::new();
        for i in 0..7 {
            r.insert(bubble(&format!("k{i}"), i));
        }
        let changed = r.apply_queue(5);
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|(_, q)| *q));
        assert_eq!(r.iter().filter(|b| b.is_queued()).count(), 2);
        assert!(r.apply_queue(5).is_empty(), "stable once applied");

        r.remove(&"k6".into());
        let changed = r.apply_queue(5);
        assert_eq!(changed, vec![(BubbleKey::from("k1"), false)]);
    }

    #[test]
    fn lookup_by_index() {
        let mut r = BubbleRegistry::new();
        r.insert(bubble("a", 1));
        r.insert(bubble("b", 2));
        assert_eq!(r.key_at(0), Some(&BubbleKey::from("b")));
        assert_eq!(r.index_of(&"a".into()), Some(1));
        assert_eq!(r.key_at(2), None);
    }

    #[test]
    fn invariant_checker_catches_two_masters() {
        let mut r = BubbleRegistry::new();
        r.insert(bubble("a", 1));
        r.insert(bubble("b", 2));
        r.set_master(&"a".into());
        if let Some(b) = r.get_mut(&"b".into()) {
            b.flags.insert(BubbleFlags::MASTER);
        }
        assert_eq!(r.check_invariants(), Err(RegistryInvariantError::MultipleMasters(2)));
    }

    #[test]
    fn drain_empties_everything() {
        let mut r = BubbleRegistry::new();
        r.insert(bubble("a", 1));
        r.insert(bubble("b", 2));
        r.set_master(&"b".into());
        let all = r.drain();
        assert_eq!(all.len(), 2);
        assert!(r.is_empty());
        assert_eq!(r.master_key(), None);
        assert!(r.check_invariants().is_ok());
    }
}
