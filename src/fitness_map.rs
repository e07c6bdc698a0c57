//! The monotone affine payoff -> fitness map shared by every backend.
//!
//! Kept as a small, explicit, `Copy` type rather than a closure, keeping the
//! score/fitness distinction out of a bare `f64` everywhere it's used.

/// `fitness = intercept + slope * payoff`, with `slope > 0` so fitness stays monotone
/// in payoff and, given `slope, intercept` chosen so that the attainable payoff range
/// maps to strictly positive fitness, `adjustedDynamics` (§4.2 step 4) is well defined.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FitnessMap {
    pub intercept: f64,
    pub slope: f64,
}

impl Default for FitnessMap {
    fn default() -> Self {
        Self {
            intercept: 1.0,
            slope: 1.0,
        }
    }
}

impl FitnessMap {
    pub fn new(intercept: f64, slope: f64) -> Self {
        debug_assert!(slope > 0.0, "fitness map must be monotone increasing");
        Self { intercept, slope }
    }

    pub fn to_fitness(&self, payoff: f64) -> f64 {
        self.intercept + self.slope * payoff
    }

    /// `map2fit⁻¹`, used by IBS to recover `score` from a stored `fitness` value.
    pub fn to_payoff(&self, fitness: f64) -> f64 {
        (fitness - self.intercept) / self.slope
    }

    /// Construct the map that sends `[min_payoff, max_payoff]` onto `[lo, hi]` with
    /// `lo, hi > 0`, the usual way a module picks a fitness map from its own known
    /// payoff range.
    pub fn from_range(min_payoff: f64, max_payoff: f64, lo: f64, hi: f64) -> Self {
        debug_assert!(lo > 0.0 && hi > lo, "target fitness range must be positive and ordered");
        let span = max_payoff - min_payoff;
        if span.abs() < f64::EPSILON {
            return Self::new(lo, 1.0);
        }
        let slope = (hi - lo) / span;
        let intercept = lo - slope * min_payoff;
        Self::new(intercept, slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trips_through_payoff_and_back() {
        let map = FitnessMap::new(1.0, 2.0);
        let payoff = 3.5;
        let fitness = map.to_fitness(payoff);
        assert_relative_eq!(map.to_payoff(fitness), payoff);
    }

    #[test]
    fn from_range_maps_extremes_exactly() {
        let map = FitnessMap::from_range(-2.0, 4.0, 0.1, 1.0);
        assert_relative_eq!(map.to_fitness(-2.0), 0.1);
        assert_relative_eq!(map.to_fitness(4.0), 1.0);
    }
}
