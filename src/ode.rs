//! Generic multi-species fixed-step (Euler) integrator; derivative assembly over the
//! six player-update policies of §4.2.
pub mod prelude;

use crate::errors::CheckReport;
use crate::module::{Module, PlayerUpdate};

/// Sub-step collapse below this threshold is treated as a numerical emergency brake
/// (§7, §9: "a heuristic; make it a tunable constant") -- it triggers convergence with
/// a warning rather than spinning forever on a vanishing step.
pub const ODE_MIN_STEP: f64 = 1e-16;

/// One species' placement within the concatenated state vector `y[0..D)`.
#[derive(Clone, Copy, Debug)]
pub struct SpeciesSlice {
    pub start: usize,
    pub end: usize,
}

impl SpeciesSlice {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Tunables for the ODE core (§6 CLI surface: `--dt`, `--accuracy`, `--adjusted`,
/// `--timereversed`).
#[derive(Clone, Debug)]
pub struct OdeConfig {
    pub dt: f64,
    pub accuracy: f64,
    pub adjusted_dynamics: bool,
    pub time_reversed: bool,
    /// Player-update noise `σ` (THERMAL/IMITATE family); ignored by BEST/BEST_RESPONSE.
    pub noise: f64,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            accuracy: 1e-4,
            adjusted_dynamics: false,
            time_reversed: false,
            noise: 1.0,
        }
    }
}

impl OdeConfig {
    /// `check()` for the ODE config: refuses `adjusted_dynamics` if any fitness in
    /// `fitness` is non-positive (§4.2 step 4, §7), reverting the flag with a warning.
    pub fn check(&mut self, fitness: &[f64]) -> CheckReport {
        let mut report = CheckReport::ok();
        if self.adjusted_dynamics && fitness.iter().any(|&f| f <= 0.0) {
            self.adjusted_dynamics = false;
            report.revert("adjusted_dynamics", "fitness <= 0");
        }
        report
    }
}

/// A multi-species ODE state: concatenated frequency/density vector `y`, its
/// derivative `dy`, and each species' slice within them.
#[derive(Clone, Debug)]
pub struct OdeState {
    pub y: Vec<f64>,
    pub dy: Vec<f64>,
    pub fitness: Vec<f64>,
    pub slices: Vec<SpeciesSlice>,
    pub time: f64,
}

impl OdeState {
    pub fn new(sizes: &[usize]) -> Self {
        let mut slices = Vec::with_capacity(sizes.len());
        let mut offset = 0;
        for &size in sizes {
            slices.push(SpeciesSlice {
                start: offset,
                end: offset + size,
            });
            offset += size;
        }
        Self {
            y: vec![0.0; offset],
            dy: vec![0.0; offset],
            fitness: vec![0.0; offset],
            slices,
            time: 0.0,
        }
    }

    pub fn species_slice(&self, species: usize) -> &[f64] {
        let s = self.slices[species];
        &self.y[s.start..s.end]
    }
}

/// Compute the per-species fitness vector into `state.fitness`: static table if the
/// module provides one, otherwise `map2fit(module.avg_scores(y))` (§4.2 step 1).
pub fn compute_fitness(module: &dyn Module, slice: SpeciesSlice, y: &[f64], fitness: &mut [f64]) {
    if let Some(table) = module.static_scores() {
        let map = module.fitness_map();
        for (f, &s) in fitness.iter_mut().zip(table[..slice.len()].iter()) {
            *f = map.to_fitness(s);
        }
        return;
    }
    let state = &y[slice.start..slice.end];
    let mut payoff = vec![0.0; slice.len()];
    module.avg_scores(state, &mut payoff);
    let map = module.fitness_map();
    for (f, p) in fitness.iter_mut().zip(payoff.iter()) {
        *f = map.to_fitness(*p);
    }
}

/// The six (seven, with RANDOM folded in at the IBS layer only) player-update
/// derivative rules of §4.2, dispatched by a `match` as the design notes (§9) require.
///
/// `delta_min` is the smallest fitness range across species in a multi-species model,
/// used by IMITATE to keep relative time-scales comparable (§4.2).
pub fn derivative(
    policy: PlayerUpdate,
    y: &[f64],
    f: &[f64],
    dependent: Option<usize>,
    vacant: Option<usize>,
    death_rate: f64,
    noise: f64,
    delta_min: f64,
    dy: &mut [f64],
) {
    let n = y.len();
    let active: Vec<usize> = (0..n).filter(|&i| Some(i) != dependent && Some(i) != vacant).collect();
    dy.iter_mut().for_each(|v| *v = 0.0);

    match policy {
        PlayerUpdate::Thermal => {
            let sigma = if noise <= 0.0 { 1e-12 } else { noise };
            for &i in &active {
                let mut acc = 0.0;
                for &j in &active {
                    acc += y[j] * ((f[i] - f[j]) / (2.0 * sigma)).tanh();
                }
                dy[i] = y[i] * acc;
            }
        }
        PlayerUpdate::Best => {
            for &i in &active {
                let mut acc = 0.0;
                for &j in &active {
                    let diff = f[i] - f[j];
                    let sign = if diff > 0.0 {
                        1.0
                    } else if diff < 0.0 {
                        -1.0
                    } else {
                        -1e-9 // ties break toward "stay"
                    };
                    acc += y[j] * sign;
                }
                dy[i] = y[i] * acc;
            }
        }
        PlayerUpdate::Imitate | PlayerUpdate::ImitateBetter => {
            let halving = if matches!(policy, PlayerUpdate::ImitateBetter) { 2.0 } else { 1.0 };
            let sigma = (if noise <= 0.0 { 1e-12 } else { noise }) * halving;
            let scale = sigma * delta_min.max(1e-12);
            for &i in &active {
                let mut acc = 0.0;
                for &j in &active {
                    acc += y[j] * ((f[i] - f[j]) / scale).clamp(-1.0, 1.0);
                }
                dy[i] = y[i] * acc;
            }
        }
        PlayerUpdate::Proportional => {
            for &i in &active {
                let mut acc = 0.0;
                for &j in &active {
                    let denom = f[i] + f[j];
                    if denom.abs() > f64::EPSILON {
                        acc += y[j] * (f[i] - f[j]) / denom;
                    }
                }
                dy[i] = y[i] * acc;
            }
        }
        PlayerUpdate::BestResponse => {
            let max_f = active.iter().map(|&i| f[i]).fold(f64::MIN, f64::max);
            let min_f = active.iter().map(|&i| f[i]).fold(f64::MAX, f64::min);
            let tied: Vec<usize> = active.iter().copied().filter(|&i| (f[i] - max_f).abs() < 1e-6).collect();
            let share = 1.0 / tied.len() as f64;
            for &i in &active {
                let target = if tied.contains(&i) { share } else { 0.0 };
                dy[i] = target - y[i];
            }
            // "no change" declaration (§4.2) is left to the caller's convergence test,
            // which already compares ||dy|| against accuracy scaled by the step taken.
            let _ = max_f - min_f;
        }
        PlayerUpdate::Random => {
            // Not a deterministic-drift rule; IBS draws a uniform random trait instead.
            // Present only so the enum covers the full set the IBS layer also uses.
        }
    }

    let _ = (vacant, death_rate); // ECOLOGY derivative lives in `ecology_derivative` below.
}

/// ECOLOGY derivative (§4.2): `dyᵢ = yᵢ(y_v·fᵢ − d)` for `i ≠ v`, `dy_v = −Σ dyᵢ`.
/// Kept as its own function (rather than a `PlayerUpdate` variant) because it is
/// selected by the *species* having a vacant trait, orthogonal to the player-update
/// policy the rest of the population still uses for its trait-revision probabilities.
pub fn ecology_derivative(y: &[f64], f: &[f64], vacant: usize, death_rate: f64, dy: &mut [f64]) {
    dy.iter_mut().for_each(|v| *v = 0.0);
    let mut total = 0.0;
    for i in 0..y.len() {
        if i == vacant {
            continue;
        }
        dy[i] = y[i] * (y[vacant] * f[i] - death_rate);
        total += dy[i];
    }
    dy[vacant] = -total;
}

/// Subtract the mean drift across active (non-dependent, non-vacant) traits so that
/// `Σ dyᵢ = 0` in frequency mode (§4.2 step 3).
pub fn correct_drift(dy: &mut [f64], dependent: Option<usize>, vacant: Option<usize>) {
    if vacant.is_some() {
        return; // ecology/density mode does not conserve Σy.
    }
    let active: Vec<usize> = (0..dy.len()).filter(|&i| Some(i) != dependent).collect();
    if active.is_empty() {
        return;
    }
    let mean = active.iter().map(|&i| dy[i]).sum::<f64>() / active.len() as f64;
    for &i in &active {
        dy[i] -= mean;
    }
}

/// Euler step with non-negativity clamping (§4.2 step 6). Returns the step size
/// actually taken, which may be shorter than `h` if a coordinate would go negative.
pub fn euler_step_clamped(y: &mut [f64], dy: &[f64], h: f64, dependent: Option<usize>) -> f64 {
    let mut h_taken = h;
    for (i, (&yi, &dyi)) in y.iter().zip(dy.iter()).enumerate() {
        if Some(i) == dependent {
            continue;
        }
        let projected = yi + h * dyi;
        if projected < 0.0 && dyi * h.signum() < 0.0 {
            let bound = -yi / dyi;
            if bound.abs() < h_taken.abs() {
                h_taken = bound;
            }
        }
    }
    for (i, yi) in y.iter_mut().enumerate() {
        if Some(i) == dependent {
            continue;
        }
        *yi += h_taken * dy[i];
        if *yi < 0.0 {
            *yi = 0.0;
        }
    }
    h_taken
}

/// Restore frequency normalisation on one species' slice, writing the dependent
/// trait (if any) as `1 - Σ(others)` and otherwise rescaling to sum to 1 (§4.2 step 7).
pub fn normalize_frequency(y: &mut [f64], dependent: Option<usize>) {
    match dependent {
        Some(d) => {
            let sum_others: f64 = y.iter().enumerate().filter(|&(i, _)| i != d).map(|(_, v)| v).sum();
            y[d] = (1.0 - sum_others).max(0.0);
        }
        None => {
            let sum: f64 = y.iter().sum();
            if sum > f64::EPSILON {
                for v in y.iter_mut() {
                    *v /= sum;
                }
            }
        }
    }
}

/// `‖y(t+h) − y(t)‖² < (accuracy·h_taken)²` (§4.2 convergence).
pub fn converged(y_before: &[f64], y_after: &[f64], accuracy: f64, h_taken: f64) -> bool {
    let sq_dist: f64 = y_before.iter().zip(y_after).map(|(a, b)| (a - b).powi(2)).sum();
    sq_dist < (accuracy * h_taken).powi(2)
}

/// All species have exactly one trait with `yᵢ ≥ accuracy`, excluding dependent/vacant.
pub fn is_monomorphic(y: &[f64], dependent: Option<usize>, vacant: Option<usize>, accuracy: f64) -> bool {
    let count = (0..y.len())
        .filter(|&i| Some(i) != dependent && Some(i) != vacant && y[i] >= accuracy)
        .count();
    count == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::placeholders::TwoByTwoGame;
    use crate::module::Module;
    use approx::assert_relative_eq;

    fn step_once(game: &TwoByTwoGame, y: &mut [f64; 2], dt: f64) {
        let mut f = [0.0; 2];
        game.avg_scores(y, &mut f);
        let map = game.fitness_map();
        f[0] = map.to_fitness(f[0]);
        f[1] = map.to_fitness(f[1]);
        let mut dy = [0.0; 2];
        derivative(game.player_update(), y, &f, None, None, 0.0, 1.0, 1.0, &mut dy);
        correct_drift(&mut dy, None, None);
        euler_step_clamped(y, &dy, dt, None);
        normalize_frequency(y, None);
    }

    #[test]
    fn snowdrift_converges_to_two_thirds_one_third() {
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let mut y = [0.5, 0.5];
        for _ in 0..20_000 {
            step_once(&game, &mut y, 0.01);
        }
        assert_relative_eq!(y[0], 2.0 / 3.0, epsilon = 1e-2);
        assert_relative_eq!(y[1], 1.0 / 3.0, epsilon = 1e-2);
    }

    #[test]
    fn prisoners_dilemma_drives_defectors_to_fixation() {
        let game = TwoByTwoGame::new(3.0, 0.0, 5.0, 1.0);
        let mut y = [0.9, 0.1];
        for _ in 0..20_000 {
            step_once(&game, &mut y, 0.01);
        }
        assert!(y[1] > 1.0 - 1e-3, "defectors should fixate, got {y:?}");
    }

    #[test]
    fn non_negativity_holds_under_clamping() {
        let mut y = vec![0.01, 0.99];
        let dy = vec![-10.0, 10.0];
        euler_step_clamped(&mut y, &dy, 0.1, None);
        assert!(y[0] >= 0.0);
    }

    #[test]
    fn best_is_the_zero_noise_limit_of_thermal_and_imitate() {
        let f = [1.0, 0.4];
        let y = [0.5, 0.5];
        let mut dy_best = [0.0; 2];
        let mut dy_thermal = [0.0; 2];
        let mut dy_imitate = [0.0; 2];
        derivative(PlayerUpdate::Best, &y, &f, None, None, 0.0, 1.0, 1.0, &mut dy_best);
        derivative(PlayerUpdate::Thermal, &y, &f, None, None, 0.0, 1e-8, 1.0, &mut dy_thermal);
        derivative(PlayerUpdate::Imitate, &y, &f, None, None, 0.0, 1e-8, 1.0, &mut dy_imitate);
        assert_relative_eq!(dy_best[0], dy_thermal[0], epsilon = 1e-6);
        assert_relative_eq!(dy_best[0], dy_imitate[0], epsilon = 1e-6);
    }

    #[test]
    fn imitate_is_scale_invariant_in_payoff() {
        let y = [0.3, 0.7];
        let f1 = [2.0, 1.0];
        let f2 = [20.0, 10.0]; // same game, payoffs scaled by 10
        let mut dy1 = [0.0; 2];
        let mut dy2 = [0.0; 2];
        // delta_min scales along with f, as it is derived from the same payoff range.
        derivative(PlayerUpdate::Imitate, &y, &f1, None, None, 0.0, 1.0, 1.0, &mut dy1);
        derivative(PlayerUpdate::Imitate, &y, &f2, None, None, 0.0, 1.0, 10.0, &mut dy2);
        assert_relative_eq!(dy1[0], dy2[0], epsilon = 1e-9);
    }

    #[test]
    fn adjusted_dynamics_is_refused_for_nonpositive_fitness() {
        let mut config = OdeConfig {
            adjusted_dynamics: true,
            ..Default::default()
        };
        let report = config.check(&[1.0, -0.1]);
        assert!(!config.adjusted_dynamics);
        assert!(!report.is_clean());
    }

    #[test]
    fn ecology_derivative_conserves_the_vacant_balance() {
        let y = [0.3, 0.3, 0.4]; // trait 2 is vacant
        let f = [1.2, 0.8, 0.0];
        let mut dy = [0.0; 3];
        ecology_derivative(&y, &f, 2, 0.1, &mut dy);
        assert_relative_eq!(dy[0] + dy[1] + dy[2], 0.0, epsilon = 1e-12);
    }
}
