//! The shared reproducible pseudo-random stream.
//!
//! A single [`EvoRng`] is owned by each `Model` instance (never a process-wide
//! singleton, so that multiple models are independently seedable). It wraps
//! `rand::rngs::SmallRng` behind an explicit `&mut` handle rather than a
//! thread-local default, and adds the Gaussian/geometric/binomial draws a
//! reproducible evolutionary simulation needs on top of what plain `rand` offers.
use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Binomial, Geometric, Normal};

#[derive(Clone, Debug)]
pub struct EvoRng {
    seed: u64,
    inner: SmallRng,
    words_consumed: u64,
}

impl EvoRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            inner: SmallRng::seed_from_u64(seed),
            words_consumed: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reconstruct the stream at the point `words_consumed` 32-bit words past
    /// `seed` (§6, §8): re-seeds, then replays that many raw draws so a restored
    /// `Model` continues the identical forward stream a live one would have reached.
    pub fn restore(seed: u64, words_consumed: u64) -> Self {
        let mut rng = Self::from_seed(seed);
        for _ in 0..words_consumed {
            rng.next_u32();
        }
        rng
    }

    /// Number of 32-bit words drawn from the stream so far, part of the snapshot's
    /// byte-equivalence contract (§6): replaying `words_consumed` draws after
    /// re-seeding from `seed()` reproduces the exact forward state.
    pub fn words_consumed(&self) -> u64 {
        self.words_consumed
    }

    /// A uniform draw in `[0, 1)`.
    ///
    /// Draws through `self` (not `self.inner` directly) so the word-count tracked by
    /// [`EvoRng::words_consumed`] stays accurate -- every public draw method below
    /// follows the same rule.
    pub fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }

    /// A uniform draw in `[0, n)`, used for site/neighbour indexing.
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            0
        } else {
            self.gen_range(0..n)
        }
    }

    pub fn bernoulli(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            Bernoulli::new(p).expect("p is checked to be within (0,1)").sample(self)
        }
    }

    /// `N(mean, sigma)` draw; used by the SDE core for demographic noise increments.
    pub fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        if sigma <= 0.0 {
            return mean;
        }
        Normal::new(mean, sigma)
            .expect("sigma is checked to be positive")
            .sample(self)
    }

    /// Geometrically-distributed waiting time (number of Bernoulli(p) failures before
    /// the first success), used by the IBS homogeneous-population fast path to skip
    /// ahead to the next mutation event.
    pub fn geometric(&mut self, p: f64) -> u64 {
        if p <= 0.0 {
            return u64::MAX;
        }
        if p >= 1.0 {
            return 0;
        }
        Geometric::new(p)
            .expect("p is checked to be within (0,1)")
            .sample(self)
    }

    /// Binomial draw, used by migration counts and group-sampling without replacement.
    pub fn binomial(&mut self, n: u64, p: f64) -> u64 {
        if n == 0 {
            return 0;
        }
        let p = p.clamp(0.0, 1.0);
        Binomial::new(n, p)
            .expect("n, p are checked to be valid")
            .sample(self)
    }

    /// Spin off an independent stream seeded from the current stream, so that
    /// ephemeral-score recomputation (cosmetic, not part of the evolutionary
    /// trajectory) never perturbs the reproducible forward stream used for evolution.
    pub fn fork(&mut self) -> Self {
        let seed = self.gen::<u64>();
        Self::from_seed(seed)
    }
}

impl rand::RngCore for EvoRng {
    fn next_u32(&mut self) -> u32 {
        self.words_consumed += 1;
        self.inner.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.words_consumed += 2;
        self.inner.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.words_consumed += (dest.len() as u64).div_ceil(4);
        self.inner.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.words_consumed += (dest.len() as u64).div_ceil(4);
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_same_stream() {
        let mut a = EvoRng::from_seed(42);
        let mut b = EvoRng::from_seed(42);
        let sample_a: Vec<f64> = (0..10).map(|_| a.uniform()).collect();
        let sample_b: Vec<f64> = (0..10).map(|_| b.uniform()).collect();
        assert_eq!(sample_a, sample_b);
    }

    #[test]
    fn words_consumed_grows_with_every_draw() {
        let mut rng = EvoRng::from_seed(1);
        assert_eq!(rng.words_consumed(), 0);
        rng.uniform();
        assert!(rng.words_consumed() > 0);
    }

    #[test]
    fn fork_is_deterministic_given_parent_state() {
        let mut parent_a = EvoRng::from_seed(7);
        let mut parent_b = EvoRng::from_seed(7);
        let mut child_a = parent_a.fork();
        let mut child_b = parent_b.fork();
        assert_eq!(child_a.uniform(), child_b.uniform());
        // Forking consumes from the parent stream, so the parents stay in lockstep too.
        assert_eq!(parent_a.uniform(), parent_b.uniform());
    }

    #[test]
    fn bernoulli_boundaries_are_exact() {
        let mut rng = EvoRng::from_seed(1);
        assert!(!rng.bernoulli(0.0));
        assert!(rng.bernoulli(1.0));
    }
}
