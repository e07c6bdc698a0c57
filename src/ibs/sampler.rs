//! Interaction and reference group samplers (§3, §4.5): `ALL` plays against every
//! out-neighbour, `RANDOM k` samples `k` of them without replacement while `k` stays
//! within the node's degree, falling back to sampling with replacement once `k`
//! exceeds it. Interaction and reference sampling are configured separately.
use rustc_hash::FxHashSet;

use crate::geometry::Geometry;
use crate::rng::EvoRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupSampler {
    All,
    Random(usize),
}

impl GroupSampler {
    /// Opponent (or role-model) node indices for `node`, drawn from its out-neighbours.
    pub fn sample(&self, geometry: &Geometry, node: usize, rng: &mut EvoRng) -> Vec<usize> {
        let neighbours = geometry.out_neighbours(node);
        match *self {
            GroupSampler::All => neighbours.to_vec(),
            GroupSampler::Random(k) => {
                if neighbours.is_empty() {
                    Vec::new()
                } else if k <= neighbours.len() {
                    let mut chosen = FxHashSet::default();
                    let mut picks = Vec::with_capacity(k);
                    while picks.len() < k {
                        let candidate = neighbours[rng.index(neighbours.len())];
                        if chosen.insert(candidate) {
                            picks.push(candidate);
                        }
                    }
                    picks
                } else {
                    (0..k).map(|_| neighbours[rng.index(neighbours.len())]).collect()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    #[test]
    fn all_sampler_returns_the_full_out_neighbourhood() {
        let geo = Geometry::builder().meanfield(5).build().unwrap();
        let mut rng = EvoRng::from_seed(1);
        let group = GroupSampler::All.sample(&geo, 0, &mut rng);
        assert_eq!(group.len(), 4);
    }

    #[test]
    fn random_sampler_returns_exactly_k_picks() {
        let geo = Geometry::builder().square(4).build().unwrap();
        let mut rng = EvoRng::from_seed(1);
        let group = GroupSampler::Random(3).sample(&geo, 0, &mut rng);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn random_sampler_never_repeats_a_neighbour_while_k_is_within_degree() {
        let geo = Geometry::builder().square(4).build().unwrap(); // degree 4
        let mut rng = EvoRng::from_seed(1);
        for _ in 0..20 {
            let group = GroupSampler::Random(4).sample(&geo, 0, &mut rng);
            let distinct: std::collections::HashSet<_> = group.iter().collect();
            assert_eq!(distinct.len(), 4);
        }
    }

    #[test]
    fn random_sampler_falls_back_to_replacement_once_k_exceeds_degree() {
        let geo = Geometry::builder().linear(3).build().unwrap(); // degree 2
        let mut rng = EvoRng::from_seed(1);
        let group = GroupSampler::Random(5).sample(&geo, 0, &mut rng);
        assert_eq!(group.len(), 5);
    }
}
