//! Immutable neighbourhood structure: in/out adjacency, lattice metadata, symmetry flag.
//!
//! A [`Geometry`] is built once (through [`GeometryBuilder`]) and then shared,
//! read-only, between the backend that interacts on it and the backend that
//! reproduces on it -- a species may use two different geometries for the two roles.
mod builder;
mod lattice;

pub use builder::GeometryBuilder;
pub use lattice::LatticeType;

/// The neighbourhood graph one species interacts or reproduces on.
#[derive(Clone, Debug)]
pub struct Geometry {
    size: usize,
    in_neighbours: Vec<Vec<usize>>,
    out_neighbours: Vec<Vec<usize>>,
    undirected: bool,
    lattice_type: LatticeType,
    /// Linear extension (e.g. side length of a square lattice); used by the PDE core
    /// to derive `Δx`. `1` for non-lattice (well-mixed/graph) geometries.
    linear_extension: usize,
}

impl Geometry {
    pub fn builder() -> GeometryBuilder {
        GeometryBuilder::new()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_neighbours(&self, node: usize) -> &[usize] {
        &self.in_neighbours[node]
    }

    pub fn out_neighbours(&self, node: usize) -> &[usize] {
        &self.out_neighbours[node]
    }

    pub fn k_in(&self, node: usize) -> usize {
        self.in_neighbours[node].len()
    }

    pub fn k_out(&self, node: usize) -> usize {
        self.out_neighbours[node].len()
    }

    pub fn max_in(&self) -> usize {
        self.in_neighbours.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn max_out(&self) -> usize {
        self.out_neighbours.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_undirected(&self) -> bool {
        self.undirected
    }

    pub fn lattice_type(&self) -> LatticeType {
        self.lattice_type
    }

    pub fn is_lattice(&self) -> bool {
        self.lattice_type.is_lattice()
    }

    pub fn linear_extension(&self) -> usize {
        self.linear_extension
    }

    /// Cell spacing used by the PDE core's diffusion/advection coefficients.
    pub fn dx(&self) -> f64 {
        1.0 / self.linear_extension as f64
    }

    /// Pick a random neighbour of `node` from its out-list, used by migration and by
    /// `IMITATE`-family player updates that copy a random neighbour's trait.
    pub fn random_out_neighbour(&self, node: usize, rng: &mut crate::rng::EvoRng) -> Option<usize> {
        let list = &self.out_neighbours[node];
        if list.is_empty() {
            None
        } else {
            Some(list[rng.index(list.len())])
        }
    }
}
