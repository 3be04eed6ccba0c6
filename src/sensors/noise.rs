//! Zero-mean Gaussian sensor noise.
//!
//! Emulates thermometer jitter on the simulated plant.  A standard
//! deviation of exactly zero produces exactly zero noise and never
//! touches the RNG, so noiseless runs are bit-for-bit deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

pub struct GaussianNoise {
    rng: StdRng,
    dist: Option<Normal<f64>>,
}

impl GaussianNoise {
    /// `seed = None` draws the seed from OS entropy.
    ///
    /// A non-finite or negative `std_dev` is treated as zero; callers are
    /// expected to have run `config::validate` already.
    pub fn new(std_dev: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let dist = if std_dev > 0.0 {
            Normal::new(0.0, std_dev).ok()
        } else {
            None
        };
        Self { rng, dist }
    }

    /// One noise sample (K).
    pub fn sample(&mut self) -> f64 {
        match &self.dist {
            Some(normal) => self.rng.sample(normal),
            None => 0.0,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.dist.as_ref().map_or(0.0, |n| n.std_dev())
    }
}
