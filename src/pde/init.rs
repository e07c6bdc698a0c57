//! Initial-condition profiles for the PDE core (§4.3): each produces a per-cell
//! scalar weight in `[0, 1]` that lerps between a background vector and a peak
//! vector. Coordinate arithmetic for SQUARE/CIRCLE/GAUSSIAN/RING assumes the cell
//! index is laid out row-major over a square lattice of side `geometry.linear_extension()`.
use crate::geometry::Geometry;
use crate::rng::EvoRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitProfile {
    Uniform,
    Random,
    Perturbation,
    Square,
    Circle,
    Gaussian,
    Ring,
}

fn coords(geometry: &Geometry, c: usize) -> (f64, f64) {
    let side = geometry.linear_extension().max(1);
    let x = (c % side) as f64 / side as f64;
    let y = (c / side) as f64 / side as f64;
    (x, y)
}

/// Weight of cell `c` under `profile`, in `[0, 1]`. `rng` is only consumed by RANDOM
/// and PERTURBATION, which are stochastic; the others are pure functions of position.
pub fn weight(profile: InitProfile, geometry: &Geometry, c: usize, rng: &mut EvoRng) -> f64 {
    match profile {
        InitProfile::Uniform => 1.0,
        InitProfile::Random => rng.uniform(),
        InitProfile::Perturbation => {
            if c == geometry.size() / 2 {
                1.0
            } else {
                0.0
            }
        }
        InitProfile::Square => {
            let (x, y) = coords(geometry, c);
            if (0.25..0.75).contains(&x) && (0.25..0.75).contains(&y) {
                1.0
            } else {
                0.0
            }
        }
        InitProfile::Circle => {
            let (x, y) = coords(geometry, c);
            let r2 = (x - 0.5).powi(2) + (y - 0.5).powi(2);
            if r2 < 0.25 * 0.25 {
                1.0
            } else {
                0.0
            }
        }
        InitProfile::Gaussian => {
            let (x, y) = coords(geometry, c);
            let r2 = (x - 0.5).powi(2) + (y - 0.5).powi(2);
            (-r2 / (2.0 * 0.1 * 0.1)).exp()
        }
        InitProfile::Ring => {
            let (x, y) = coords(geometry, c);
            let r = ((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt();
            let band = (r - 0.3).abs();
            if band < 0.05 {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Fill a species' density field for every cell by lerping `background` toward
/// `peak` with the profile's per-cell weight.
pub fn apply(
    profile: InitProfile,
    geometry: &Geometry,
    background: &[f64],
    peak: &[f64],
    rng: &mut EvoRng,
    density: &mut [f64],
) {
    let t = background.len();
    for c in 0..geometry.size() {
        let w = weight(profile, geometry, c, rng);
        let cell = &mut density[c * t..(c + 1) * t];
        for j in 0..t {
            cell[j] = background[j] * (1.0 - w) + peak[j] * w;
        }
    }
}
