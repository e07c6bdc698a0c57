//! Per-species individual-based population state (§3): `N` sites with traits,
//! scores, interaction counts, and a parallel fitness vector derived from scores
//! through the species' [`FitnessMap`](crate::fitness_map::FitnessMap).
use fixedbitset::FixedBitSet;

use crate::fitness_map::FitnessMap;

#[derive(Clone, Debug)]
pub struct IbsPopulation {
    pub traits: Vec<usize>,
    pub traits_next: Vec<usize>,
    pub score: Vec<f64>,
    pub fitness: Vec<f64>,
    pub interactions: Vec<u32>,
}

impl IbsPopulation {
    pub fn new(size: usize, initial_trait: usize) -> Self {
        Self {
            traits: vec![initial_trait; size],
            traits_next: vec![initial_trait; size],
            score: vec![0.0; size],
            fitness: vec![0.0; size],
            interactions: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.traits.len()
    }

    /// Whether every site shares one trait, checked via the set of distinct trait
    /// values seen rather than a pairwise comparison against `traits[0]` -- a
    /// `FixedBitSet` indexed by trait value is the cheapest way to ask "how many
    /// distinct values occur" without allocating a `HashSet` per call (`optimizeHomo`,
    /// §4.5, consults this every event).
    pub fn is_homogeneous(&self) -> bool {
        if self.traits.is_empty() {
            return true;
        }
        let max_trait = self.traits.iter().copied().max().unwrap_or(0);
        let mut seen = FixedBitSet::with_capacity(max_trait + 1);
        for &t in &self.traits {
            seen.insert(t);
            if seen.count_ones(..) > 1 {
                return false;
            }
        }
        true
    }

    pub fn reset_scores(&mut self) {
        self.score.iter_mut().for_each(|s| *s = 0.0);
        self.interactions.iter_mut().for_each(|i| *i = 0);
    }

    pub fn total_fitness(&self) -> f64 {
        self.fitness.iter().sum()
    }

    pub fn commit(&mut self) {
        self.traits.copy_from_slice(&self.traits_next);
    }

    /// Average score, or total score, per the species' [`ScoreReset`] policy, used
    /// when re-deriving fitness after an interaction.
    pub fn map_to_fitness(&mut self, i: usize, raw_score: f64, map: FitnessMap) {
        self.fitness[i] = map.to_fitness(raw_score);
    }

    /// Trait frequency vector, used to feed ODE-shaped `avgScores` modules (e.g.
    /// `BEST_RESPONSE`'s local-neighbourhood best response) and for reporting.
    pub fn frequencies(&self, n_traits: usize) -> Vec<f64> {
        let mut counts = vec![0usize; n_traits];
        for &t in &self.traits {
            counts[t] += 1;
        }
        let n = self.traits.len().max(1) as f64;
        counts.into_iter().map(|c| c as f64 / n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_population_is_homogeneous() {
        let pop = IbsPopulation::new(10, 0);
        assert!(pop.is_homogeneous());
    }

    #[test]
    fn a_single_mutant_breaks_homogeneity() {
        let mut pop = IbsPopulation::new(10, 0);
        pop.traits[3] = 1;
        assert!(!pop.is_homogeneous());
    }

    #[test]
    fn frequencies_sum_to_one() {
        let mut pop = IbsPopulation::new(4, 0);
        pop.traits = vec![0, 0, 1, 1];
        let freqs = pop.frequencies(2);
        assert_eq!(freqs, vec![0.5, 0.5]);
    }
}
