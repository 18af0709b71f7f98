//! Unique identifier generation for walls and tiles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Length of every generated name.
pub const NAME_LEN: usize = 8;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Source of identifiers that are never repeated for the lifetime of the source.
pub trait NameSource {
    fn next_name(&mut self) -> String;
}

/// Random 8-letter ASCII names, remembering every name it has issued.
///
/// One instance lives in the process context so that repeated `generate`
/// runs inside the interactive menu never hand out the same name twice.
pub struct RandomNames {
    rng: StdRng,
    issued: HashSet<String>,
}

impl RandomNames {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            issued: HashSet::new(),
        }
    }

    /// Reproducible names for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    fn candidate(&mut self) -> String {
        (0..NAME_LEN)
            .map(|_| ALPHABET[self.rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for RandomNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSource for RandomNames {
    fn next_name(&mut self) -> String {
        loop {
            let name = self.candidate();
            if self.issued.insert(name.clone()) {
                return name;
            }
        }
    }
}
