//! Extends the ODE core (§4.4) with Gaussian demographic noise, scaled by `1/N_eff`.
//! Exact only for species with at most 3 traits (2 independent dimensions): the
//! 2x2 covariance of the allele-frequency noise is diagonalised in closed form and
//! used to draw a correlated Gaussian increment per step.
use crate::errors::{CheckReport, TryFromBuilderError};
use crate::ode::{correct_drift, derivative, euler_step_clamped, normalize_frequency, OdeConfig};
use crate::rng::EvoRng;

#[derive(Clone, Debug)]
pub struct SdeConfig {
    pub ode: OdeConfig,
    /// Population size `N`; noise amplitude scales as `1/N_eff`.
    pub population_size: usize,
}

impl SdeConfig {
    pub fn new(population_size: usize) -> Self {
        Self {
            ode: OdeConfig::default(),
            population_size,
        }
    }

    /// SDE is only exact for up to 3 traits (§4.4); reject construction otherwise
    /// rather than silently producing an under-specified covariance.
    pub fn check_dimension(n_active_traits: usize) -> Result<(), TryFromBuilderError> {
        if n_active_traits > 3 {
            Err(TryFromBuilderError(
                "SDE core supports at most 3 traits (2 independent dimensions) per species",
            ))
        } else {
            Ok(())
        }
    }
}

/// `N_eff = N · (1 − y_v)` for a species with vacant trait `v`; plain `N` otherwise.
pub fn effective_population(n: usize, y: &[f64], vacant: Option<usize>) -> f64 {
    match vacant {
        Some(v) => (n as f64) * (1.0 - y[v]).max(f64::EPSILON),
        None => n as f64,
    }
}

/// The 2x2 covariance matrix `B` of the demographic noise for two independent
/// frequencies `y0, y1` under the standard multinomial sampling variance
/// (`Cov(yi, yj) = -yi*yj` off-diagonal, `Var(yi) = yi*(1-yi)` on-diagonal).
pub fn covariance_2x2(y0: f64, y1: f64) -> [[f64; 2]; 2] {
    [[y0 * (1.0 - y0), -y0 * y1], [-y0 * y1, y1 * (1.0 - y1)]]
}

/// Diagonalise a symmetric positive-semidefinite 2x2 matrix in closed form and return
/// its matrix square root `C` such that `C @ C^T = B` (§4.4: "closed form: eigenvalues
/// trB/2 ± sqrt((trB/2)^2 - detB); eigenvectors from the off-diagonal").
pub fn sqrt_covariance_2x2(b: [[f64; 2]; 2]) -> [[f64; 2]; 2] {
    let tr = b[0][0] + b[1][1];
    let det = b[0][0] * b[1][1] - b[0][1] * b[1][0];
    let half_tr = tr / 2.0;
    let disc = (half_tr * half_tr - det).max(0.0).sqrt();
    let lambda1 = (half_tr + disc).max(0.0);
    let lambda2 = (half_tr - disc).max(0.0);

    // Eigenvector for lambda1, from the off-diagonal (b[0][1] is generically nonzero
    // for correlated allele frequencies; fall back to the axis-aligned basis when it
    // vanishes, which only happens at a corner where the noise itself is zero anyway).
    let (v1, v2) = if b[0][1].abs() > 1e-15 {
        let v1 = (lambda1 - b[1][1], b[0][1]);
        let norm1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt().max(1e-15);
        let v1 = (v1.0 / norm1, v1.1 / norm1);
        let v2 = (-v1.1, v1.0); // orthogonal complement
        (v1, v2)
    } else {
        ((1.0, 0.0), (0.0, 1.0))
    };

    let s1 = lambda1.sqrt();
    let s2 = lambda2.sqrt();
    [
        [s1 * v1.0 * v1.0 + s2 * v2.0 * v2.0, s1 * v1.0 * v1.1 + s2 * v2.0 * v2.1],
        [s1 * v1.1 * v1.0 + s2 * v2.1 * v2.0, s1 * v1.1 * v1.1 + s2 * v2.1 * v2.1],
    ]
}

/// One SDE step for a 2-independent-trait species: deterministic drift (delegated to
/// the ODE derivative) plus a correlated Gaussian increment scaled by `sqrt(h)/N_eff`.
/// Under mutation, drift is rescaled by `(1-mu)` and a mutation-bias term is added
/// before clamping (§4.4).
#[allow(clippy::too_many_arguments)]
pub fn sde_step(
    policy: crate::module::PlayerUpdate,
    y: &mut [f64],
    f: &[f64],
    dependent: Option<usize>,
    vacant: Option<usize>,
    death_rate: f64,
    config: &SdeConfig,
    mutation_rate: f64,
    rng: &mut EvoRng,
) {
    let h = config.ode.dt;
    let mut dy = vec![0.0; y.len()];
    derivative(
        policy,
        y,
        f,
        dependent,
        vacant,
        death_rate,
        config.ode.noise,
        1.0,
        &mut dy,
    );
    correct_drift(&mut dy, dependent, vacant);

    if mutation_rate > 0.0 {
        let t = y.len() as f64;
        for (i, dyi) in dy.iter_mut().enumerate() {
            if Some(i) == dependent {
                continue;
            }
            let bias = (1.0 - t * y[i]) / t;
            *dyi = (1.0 - mutation_rate) * *dyi + mutation_rate * bias;
        }
    }

    // Demographic noise only applies to the first two independent (non-dependent,
    // non-vacant) traits -- the SDE core's dimension bound (§4.4).
    let independent: Vec<usize> = (0..y.len())
        .filter(|&i| Some(i) != dependent && Some(i) != vacant)
        .take(2)
        .collect();
    if independent.len() == 2 {
        let n_eff = effective_population(config.population_size, y, vacant);
        let b = covariance_2x2(y[independent[0]], y[independent[1]]);
        let c = sqrt_covariance_2x2(b);
        let z0 = rng.gaussian(0.0, 1.0) / n_eff.sqrt();
        let z1 = rng.gaussian(0.0, 1.0) / n_eff.sqrt();
        dy[independent[0]] += (c[0][0] * z0 + c[0][1] * z1) / h.sqrt();
        dy[independent[1]] += (c[1][0] * z0 + c[1][1] * z1) / h.sqrt();
    }

    euler_step_clamped(y, &dy, h, dependent);
    normalize_frequency(y, dependent);
}

pub fn check(config: &mut SdeConfig, n_active_traits: usize) -> CheckReport {
    let mut report = CheckReport::ok();
    if SdeConfig::check_dimension(n_active_traits).is_err() {
        report.revert("population_size", "SDE core only supports up to 3 traits; running ODE-only");
        report.require_reset();
    }
    report
}
