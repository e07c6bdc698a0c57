//! Migration event classes (§4.5), applied as a separate event class with its own
//! rate: diffusive (two sites swap traits), birth-death (the fitter of the pair
//! migrates), death-birth (a random site is vacated and a neighbour migrates in
//! regardless of fitness).
use crate::geometry::Geometry;
use crate::ibs::population::IbsPopulation;
use crate::rng::EvoRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationKind {
    None,
    Diffusive,
    BirthDeath,
    DeathBirth,
}

pub fn apply(
    kind: MigrationKind,
    rate: f64,
    geometry: &Geometry,
    population: &mut IbsPopulation,
    rng: &mut EvoRng,
) {
    if kind == MigrationKind::None || rate <= 0.0 || !rng.bernoulli(rate) {
        return;
    }
    let node = rng.index(population.size());
    let Some(neighbour) = geometry.random_out_neighbour(node, rng) else {
        return;
    };

    match kind {
        MigrationKind::None => {}
        MigrationKind::Diffusive => {
            population.traits.swap(node, neighbour);
        }
        MigrationKind::BirthDeath => {
            let (from, to) = if population.fitness[node] >= population.fitness[neighbour] {
                (node, neighbour)
            } else {
                (neighbour, node)
            };
            population.traits[to] = population.traits[from];
        }
        MigrationKind::DeathBirth => {
            population.traits[node] = population.traits[neighbour];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    #[test]
    fn zero_rate_migration_never_changes_the_population() {
        let geo = Geometry::builder().square(4).build().unwrap();
        let mut pop = IbsPopulation::new(geo.size(), 0);
        pop.traits[0] = 1;
        let before = pop.traits.clone();
        let mut rng = EvoRng::from_seed(1);
        for _ in 0..50 {
            apply(MigrationKind::Diffusive, 0.0, &geo, &mut pop, &mut rng);
        }
        assert_eq!(pop.traits, before);
    }

    #[test]
    fn birth_death_always_propagates_the_fitter_trait() {
        let geo = Geometry::builder().square(4).build().unwrap();
        let mut pop = IbsPopulation::new(geo.size(), 0);
        pop.traits[5] = 1;
        pop.fitness[5] = 10.0; // far fitter than any neighbour
        let mut rng = EvoRng::from_seed(1);
        for _ in 0..200 {
            apply(MigrationKind::BirthDeath, 1.0, &geo, &mut pop, &mut rng);
        }
        assert!(pop.traits.iter().any(|&t| t == 1));
    }
}
