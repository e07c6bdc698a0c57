//! Reaction + diffusion + advection on an arbitrary [`Geometry`](crate::geometry::Geometry).
//! The reaction half-step reuses the ODE derivative (§4.2) per cell; the transport
//! half-step (diffusion + advection) couples each cell to its geometric neighbours,
//! with an optional symmetry-preserving neighbour sort for bit-stable results.
pub mod init;
pub mod supervisor;

use crate::errors::CheckReport;
use crate::geometry::Geometry;
use crate::module::{Module, PlayerUpdate};
use crate::ode::{compute_fitness, correct_drift, derivative, normalize_frequency};

/// Tunables for the PDE core (§6: `--D`, `--A`, `--dt`, `--symmetric`).
#[derive(Clone, Debug)]
pub struct PdeConfig {
    pub dt: f64,
    pub accuracy: f64,
    /// Diffusion coefficient `D` per trait.
    pub diffusion: Vec<f64>,
    /// Advection matrix `A[j][k]`: flow of trait `j` driven by the gradient of `k`.
    pub advection: Vec<Vec<f64>>,
    /// Symmetric mode sorts neighbour contributions before accumulating, trading a
    /// little speed for bit-stability under any reordering of the neighbour list.
    pub symmetric: bool,
    pub noise: f64,
}

impl PdeConfig {
    pub fn new(n_traits: usize) -> Self {
        Self {
            dt: 0.001,
            accuracy: 1e-4,
            diffusion: vec![0.0; n_traits],
            advection: vec![vec![0.0; n_traits]; n_traits],
            symmetric: true,
            noise: 1.0,
        }
    }

    /// `checkDt` (§4.3): require `nDim · Dmax/Δx² · kmax · h < 0.5`, shrinking `h`
    /// (and logging) otherwise. Advection is bounded the same way using `max|A|/Δx²`.
    pub fn check(&mut self, geometry: &Geometry) -> CheckReport {
        let mut report = CheckReport::ok();
        let dx2 = geometry.dx() * geometry.dx();
        let n_dim = self.diffusion.len().max(1) as f64;
        let kmax = geometry.max_in().max(geometry.max_out()).max(1) as f64;

        let d_max = self.diffusion.iter().cloned().fold(0.0_f64, f64::max);
        let a_max = self.advection.iter().flatten().fold(0.0_f64, |acc, &v| acc.max(v.abs()));

        let bound = (n_dim * (d_max.max(a_max)) * kmax / dx2).max(1e-300);
        let limit = 0.5 / bound;
        if self.dt >= limit {
            log::info!("pde: shrinking dt from {} to {} to satisfy the CFL-like stability bound", self.dt, limit * 0.99);
            self.dt = limit * 0.99;
            report.revert("dt", "diffusion/advection stability bound");
        }
        report
    }
}

/// Double-buffered cell state for one species: `density[c]`, `next[c]`, each a
/// length-`T` slice; `C` cells laid out row-major.
#[derive(Clone, Debug)]
pub struct PdeState {
    pub n_traits: usize,
    pub density: Vec<f64>,
    pub next: Vec<f64>,
    pub min_fitness: f64,
    pub max_fitness: f64,
    pub mean_fitness: f64,
    pub time: f64,
}

impl PdeState {
    pub fn new(n_cells: usize, n_traits: usize) -> Self {
        Self {
            n_traits,
            density: vec![0.0; n_cells * n_traits],
            next: vec![0.0; n_cells * n_traits],
            min_fitness: 0.0,
            max_fitness: 0.0,
            mean_fitness: 0.0,
            time: 0.0,
        }
    }

    pub fn cell(&self, c: usize) -> &[f64] {
        &self.density[c * self.n_traits..(c + 1) * self.n_traits]
    }

    pub fn cell_mut(&mut self, c: usize) -> &mut [f64] {
        let t = self.n_traits;
        &mut self.density[c * t..(c + 1) * t]
    }

    pub fn next_cell(&self, c: usize) -> &[f64] {
        &self.next[c * self.n_traits..(c + 1) * self.n_traits]
    }

    pub fn next_cell_mut(&mut self, c: usize) -> &mut [f64] {
        let t = self.n_traits;
        &mut self.next[c * t..(c + 1) * t]
    }

    pub fn n_cells(&self) -> usize {
        self.density.len() / self.n_traits
    }
}

/// Step 1 of §4.3: local reaction at cell `c`, writing into `next[c]`. Returns the
/// cell's scalar fitness used to fold into the running min/max/mean aggregates.
#[allow(clippy::too_many_arguments)]
pub fn react_cell(
    module: &dyn Module,
    policy: PlayerUpdate,
    density: &[f64],
    fitness_scratch: &mut [f64],
    dependent: Option<usize>,
    vacant: Option<usize>,
    death_rate: f64,
    noise: f64,
    dt: f64,
    next: &mut [f64],
) -> f64 {
    let slice = crate::ode::SpeciesSlice { start: 0, end: density.len() };
    compute_fitness(module, slice, density, fitness_scratch);
    let mut dy = vec![0.0; density.len()];
    if let Some(v) = vacant {
        crate::ode::ecology_derivative(density, fitness_scratch, v, death_rate, &mut dy);
    } else {
        derivative(policy, density, fitness_scratch, dependent, vacant, death_rate, noise, 1.0, &mut dy);
        correct_drift(&mut dy, dependent, vacant);
    }
    for (i, ni) in next.iter_mut().enumerate() {
        *ni = (density[i] + dt * dy[i]).max(0.0);
    }
    fitness_scratch.iter().copied().sum::<f64>() / fitness_scratch.len().max(1) as f64
}

/// Step 2 of §4.3: diffusion + advection at cell `c`, reading the already-reacted
/// `next[]` buffer of `c` and its neighbours, writing the transported result back
/// into `density[c]` (the buffers swap roles after the full sweep completes).
#[allow(clippy::too_many_arguments)]
pub fn diffuse_cell(
    geometry: &Geometry,
    c: usize,
    next_of: impl Fn(usize) -> Vec<f64>,
    config: &PdeConfig,
    dependent: Option<usize>,
    out_density: &mut [f64],
) {
    let t = config.diffusion.len();
    let next_c = next_of(c);
    let k_out = geometry.k_out(c) as f64;
    let dx2 = geometry.dx() * geometry.dx();

    let mut s = vec![0.0; t];
    for j in 0..t {
        s[j] = -k_out * next_c[j];
    }
    let mut adv = vec![0.0; t];

    let neighbours: Vec<usize> = if config.symmetric {
        let mut nbs = geometry.in_neighbours(c).to_vec();
        nbs.sort_by(|&a, &b| next_of(a)[0].partial_cmp(&next_of(b)[0]).unwrap_or(std::cmp::Ordering::Equal));
        nbs
    } else {
        geometry.in_neighbours(c).to_vec()
    };

    for nb in neighbours {
        let si = next_of(nb);
        for j in 0..t {
            s[j] += si[j];
        }
        for j in 0..t {
            let mut acc = 0.0;
            for k in 0..t {
                let delta_k = 1.0 + (si[k] - next_c[k]);
                let beta_jk = config.advection[j][k] * config.dt / dx2;
                acc += beta_jk * (0.5 * delta_k * (-next_c[j]) + (1.0 - 0.5 * delta_k) * si[j]);
            }
            adv[j] += acc;
        }
    }

    for j in 0..t {
        let alpha = config.diffusion[j] * config.dt / dx2;
        out_density[j] = alpha * s[j] + next_c[j] + adv[j];
    }

    if let Some(d) = dependent {
        let sum_others: f64 = out_density.iter().enumerate().filter(|&(i, _)| i != d).map(|(_, v)| v).sum();
        out_density[d] = (1.0 - sum_others).max(0.0);
    }
}

pub fn normalize_cell(density: &mut [f64], dependent: Option<usize>) {
    normalize_frequency(density, dependent);
}
