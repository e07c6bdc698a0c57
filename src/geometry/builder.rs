use itertools::iproduct;

use super::{Geometry, LatticeType};
use crate::errors::TryFromBuilderError;
use crate::rng::EvoRng;

/// Builds a [`Geometry`] from a handful of `with_*`/convenience constructors
/// landing in a single `build()` that validates and reports a
/// [`TryFromBuilderError`] on misuse.
#[derive(Default)]
pub struct GeometryBuilder {
    size: Option<usize>,
    in_neighbours: Option<Vec<Vec<usize>>>,
    out_neighbours: Option<Vec<Vec<usize>>>,
    undirected: bool,
    lattice_type: LatticeType,
    linear_extension: usize,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self {
            linear_extension: 1,
            ..Default::default()
        }
    }

    /// A fully-connected, undirected geometry of `size` nodes -- the "well-mixed"
    /// population every replicator-equation textbook assumes implicitly.
    pub fn meanfield(mut self, size: usize) -> Self {
        let adjacency: Vec<Vec<usize>> = (0..size)
            .map(|n| (0..size).filter(|&m| m != n).collect())
            .collect();
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Meanfield;
        self.linear_extension = 1;
        self
    }

    /// A 1-D ring of `size` sites, each connected to its two nearest neighbours.
    pub fn linear(mut self, size: usize) -> Self {
        let adjacency: Vec<Vec<usize>> = (0..size)
            .map(|n| {
                let left = (n + size - 1) % size;
                let right = (n + 1) % size;
                vec![left, right]
            })
            .collect();
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Linear;
        self.linear_extension = size;
        self
    }

    /// A `side x side` von-Neumann (4-neighbour) torus.
    pub fn square(mut self, side: usize) -> Self {
        let size = side * side;
        let coord = |n: usize| (n / side, n % side);
        let index = |r: usize, c: usize| r * side + c;
        let adjacency: Vec<Vec<usize>> = (0..size)
            .map(|n| {
                let (r, c) = coord(n);
                let up = index((r + side - 1) % side, c);
                let down = index((r + 1) % side, c);
                let left = index(r, (c + side - 1) % side);
                let right = index(r, (c + 1) % side);
                vec![up, down, left, right]
            })
            .collect();
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Square;
        self.linear_extension = side;
        self
    }

    /// A `side x side x side` von-Neumann (6-neighbour) torus. Coordinate triples
    /// are enumerated with `itertools::iproduct!` instead of hand-nesting three
    /// `for` loops.
    pub fn cube(mut self, side: usize) -> Self {
        let size = side * side * side;
        let index = |x: usize, y: usize, z: usize| (x * side + y) * side + z;
        let mut adjacency = vec![Vec::with_capacity(6); size];
        for (x, y, z) in iproduct!(0..side, 0..side, 0..side) {
            let n = index(x, y, z);
            adjacency[n] = vec![
                index((x + side - 1) % side, y, z),
                index((x + 1) % side, y, z),
                index(x, (y + side - 1) % side, z),
                index(x, (y + 1) % side, z),
                index(x, y, (z + side - 1) % side),
                index(x, y, (z + 1) % side),
            ];
        }
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Cube;
        self.linear_extension = side;
        self
    }

    /// An undirected Erdos-Renyi random graph over `size` nodes with per-edge
    /// probability `p`, used for `--rewire`/exploratory graph scenarios.
    pub fn random_graph(mut self, size: usize, p: f64, rng: &mut EvoRng) -> Self {
        let mut adjacency = vec![Vec::new(); size];
        for i in 0..size {
            for j in (i + 1)..size {
                if rng.bernoulli(p) {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Graph;
        self.linear_extension = 1;
        self
    }

    /// A directed star: node 0 is the hub, all other nodes point only to/from the hub.
    /// Used by the Moran birth-death amplifier scenario (§8 #6).
    pub fn star(mut self, size: usize) -> Self {
        let mut adjacency = vec![Vec::new(); size];
        for leaf in 1..size {
            adjacency[0].push(leaf);
            adjacency[leaf].push(0);
        }
        self.size = Some(size);
        self.in_neighbours = Some(adjacency.clone());
        self.out_neighbours = Some(adjacency);
        self.undirected = true;
        self.lattice_type = LatticeType::Graph;
        self.linear_extension = 1;
        self
    }

    /// Supply an arbitrary, possibly-directed adjacency list directly.
    pub fn with_adjacency(
        mut self,
        out_neighbours: Vec<Vec<usize>>,
        in_neighbours: Vec<Vec<usize>>,
        undirected: bool,
    ) -> Self {
        self.size = Some(out_neighbours.len());
        self.out_neighbours = Some(out_neighbours);
        self.in_neighbours = Some(in_neighbours);
        self.undirected = undirected;
        self.lattice_type = LatticeType::Graph;
        self
    }

    pub fn build(self) -> Result<Geometry, TryFromBuilderError> {
        let size = self.size.ok_or(TryFromBuilderError("geometry requires a size"))?;
        let out_neighbours = self
            .out_neighbours
            .ok_or(TryFromBuilderError("geometry requires an adjacency structure"))?;
        let in_neighbours = self
            .in_neighbours
            .ok_or(TryFromBuilderError("geometry requires an adjacency structure"))?;
        if out_neighbours.len() != size || in_neighbours.len() != size {
            return Err(TryFromBuilderError("adjacency length does not match size"));
        }
        for list in out_neighbours.iter().chain(in_neighbours.iter()) {
            if list.iter().any(|&n| n >= size) {
                return Err(TryFromBuilderError("adjacency references an out-of-range node"));
            }
        }
        Ok(Geometry {
            size,
            in_neighbours,
            out_neighbours,
            undirected: self.undirected,
            lattice_type: self.lattice_type,
            linear_extension: self.linear_extension.max(1),
        })
    }
}
