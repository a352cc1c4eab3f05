//! Candidate ordering
//!
//! A pool probes its candidates in the order a [`SelectionStrategy`] picks.
//! Random by default, so repeated selections spread over the whole network
//! instead of always hitting the first few entries. Tests inject a
//! deterministic strategy on the pool instead of touching any global state.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Produces a permutation of `0..n`.
pub trait SelectionStrategy: Send + Sync {
    fn permutation(&self, n: usize) -> Vec<usize>;
}

/// Fresh uniformly random permutation on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelection;

impl SelectionStrategy for RandomSelection {
    fn permutation(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rand::thread_rng());
        order
    }
}

/// Random permutations from a fixed seed.
///
/// Every call reseeds, so two pools built from the same input come out in
/// the same order.
#[derive(Debug, Clone, Copy)]
pub struct SeededSelection {
    seed: u64,
}

impl SeededSelection {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl SelectionStrategy for SeededSelection {
    fn permutation(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(self.seed));
        order
    }
}

/// Random permutations drawn from one seeded generator.
///
/// Successive calls differ but the whole sequence is reproducible.
pub struct SeededStream {
    rng: Mutex<StdRng>,
}

impl SeededStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SelectionStrategy for SeededStream {
    fn permutation(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        order.shuffle(&mut *rng);
        order
    }
}

impl<F> SelectionStrategy for F
where
    F: Fn(usize) -> Vec<usize> + Send + Sync,
{
    fn permutation(&self, n: usize) -> Vec<usize> {
        self(n)
    }
}

/// Whether `order` contains each index of `0..n` exactly once.
pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
