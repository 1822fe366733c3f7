#![forbid(unsafe_code)]

//! Master/slave spring coupling for a linked bubble cluster.
//!
//! A [`SpringChain`] observes one master spring pair and drives an ordered
//! list of slave spring pairs so that the slaves trail the master in a
//! short diagonal stack.
//!
//! The chain never owns springs. It stores keys and resolves them through
//! [`ChainSprings`] on every update, so a bubble that disappeared between
//! rebuilds is simply skipped.
//!
//! # Invariants
//!
//! 1. Slave order is the order of [`SpringChain::add_slave`] calls since the
//!    last [`SpringChain::clear`]. Callers rebuild on every membership
//!    change.
//! 2. The chain holds at most `max_visible - 1` slaves (the master occupies
//!    one visible slot).
//! 3. Slave `i` (1-based) targets `master + i × (±x_step, y_step)` while
//!    displacement is enabled, and exactly `master` while disabled.
//! 4. The horizontal sign is positive when the master sits right of the
//!    screen midpoint, so the stack leans toward the nearer wall.

use crate::geometry::Point;

/// Access to the springs a chain coordinates.
pub trait ChainSprings<K> {
    /// Current position of the spring pair for `key`.
    fn position(&self, key: &K) -> Option<Point>;

    /// Retarget the spring pair for `key`.
    fn set_target(&mut self, key: &K, target: Point);

    /// Settle the spring pair for `key` on its target immediately.
    fn rest(&mut self, key: &K);
}

/// Couples slave spring pairs to a master pair.
#[derive(Debug, Clone)]
pub struct SpringChain<K> {
    master: Option<K>,
    slaves: Vec<K>,
    screen_width: f64,
    max_visible: usize,
    x_step: f64,
    y_step: f64,
    displacement: bool,
}

impl<K: Clone + PartialEq> SpringChain<K> {
    #[must_use]
    pub fn new(screen_width: f64, max_visible: usize, x_step: f64, y_step: f64) -> Self {
        Self {
            master: None,
            slaves: Vec::new(),
            screen_width,
            max_visible,
            x_step,
            y_step,
            displacement: true,
        }
    }

    pub fn set_master(&mut self, key: K) {
        self.slaves.retain(|k| *k != key);
        self.master = Some(key);
    }

    /// Append a slave. Returns `false` if the chain is full or `key` is the
    /// master or already present.
    pub fn add_slave(&mut self, key: K) -> bool {
        if self.is_full() || self.master.as_ref() == Some(&key) || self.slaves.contains(&key) {
            return false;
        }
        self.slaves.push(key);
        true
    }

    /// Drop master and slaves.
    pub fn clear(&mut self) {
        self.master = None;
        self.slaves.clear();
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slaves.len() + 1 >= self.max_visible
    }

    #[inline]
    #[must_use]
    pub fn master(&self) -> Option<&K> {
        self.master.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn slaves(&self) -> &[K] {
        &self.slaves
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.master.as_ref() == Some(key) || self.slaves.contains(key)
    }

    pub fn enable_displacement(&mut self) {
        self.displacement = true;
    }

    pub fn disable_displacement(&mut self) {
        self.displacement = false;
    }

    #[inline]
    #[must_use]
    pub fn is_displacement_enabled(&self) -> bool {
        self.displacement
    }

    pub fn set_screen_width(&mut self, width: f64) {
        self.screen_width = width;
    }

    /// Target positions for each slave, in chain order, given the master
    /// position.
    pub fn slave_targets(&self, master: Point) -> impl Iterator<Item = Point> + '_ {
        let sign = if master.x > self.screen_width / 2.0 {
            1.0
        } else {
            -1.0
        };
        (1..=self.slaves.len()).map(move |i| {
            if self.displacement {
                let i = i as f64;
                master.offset(sign * i * self.x_step, i * self.y_step)
            } else {
                master
            }
        })
    }

    /// Propagate the master's current position to every slave target.
    pub fn on_master_update(&self, springs: &mut impl ChainSprings<K>) {
        let Some(master) = self.master.as_ref() else {
            return;
        };
        let Some(pos) = springs.position(master) else {
            return;
        };
        for (key, target) in self.slaves.iter().zip(self.slave_targets(pos)) {
            springs.set_target(key, target);
        }
    }

    /// Settle every managed spring on its target.
    pub fn rest_all(&self, springs: &mut impl ChainSprings<K>) {
        for key in self.master.iter().chain(self.slaves.iter()) {
            springs.rest(key);
        }
    }
}
