//! Random fixture generation.
//!
//! A [`RandomGenerator`] is constructed explicitly and handed to whatever
//! needs fixtures; there is no process-wide seed. It is safe to share across
//! tasks, and a fixed seed makes a run reproducible.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::currency::Currency;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

#[derive(Debug)]
pub struct RandomGenerator {
    rng: Mutex<StdRng>,
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomGenerator {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Integer in `min..=max`.
    pub fn int(&self, min: i64, max: i64) -> i64 {
        self.with_rng(|rng| rng.random_range(min..=max))
    }

    /// Lowercase ASCII string of length `n`.
    pub fn string(&self, n: usize) -> String {
        self.with_rng(|rng| {
            (0..n)
                .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
                .collect()
        })
    }

    pub fn owner(&self) -> String {
        self.string(6)
    }

    pub fn money(&self) -> i64 {
        self.int(0, 1000)
    }

    pub fn currency(&self) -> Currency {
        self.with_rng(|rng| Currency::ALL[rng.random_range(0..Currency::ALL.len())])
    }

    pub fn email(&self) -> String {
        format!("{}@email.com", self.string(6))
    }
}
