/// The lattice/graph family a [`Geometry`](super::Geometry) was generated from.
///
/// Carried mainly so the PDE core's initial-condition profiles (§4.3) can interpret a
/// cell index as a coordinate (square/cube need row/column arithmetic; meanfield and
/// random graphs do not have a coordinate system at all).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum LatticeType {
    Linear,
    Square,
    Cube,
    Triangular,
    Hexagonal,
    Meanfield,
    /// An arbitrary graph with no coordinate system (e.g. a random or scale-free graph).
    #[default]
    Graph,
}

impl LatticeType {
    pub fn is_lattice(&self) -> bool {
        matches!(
            self,
            LatticeType::Linear
                | LatticeType::Square
                | LatticeType::Cube
                | LatticeType::Triangular
                | LatticeType::Hexagonal
        )
    }
}
