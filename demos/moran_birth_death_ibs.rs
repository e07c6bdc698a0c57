use evo_dynamics::geometry::Geometry;
use evo_dynamics::ibs::driver::{IbsClock, IbsConfig};
use evo_dynamics::ibs::population::IbsPopulation;
use evo_dynamics::model::{Backend, Model};
use evo_dynamics::module::placeholders::MoranConstantSelection;

fn main() {
    env_logger::init();

    let geometry = Geometry::builder().meanfield(50).build().unwrap();
    let moran = MoranConstantSelection::new(1.5);
    let mut population = IbsPopulation::new(geometry.size(), 1);
    population.traits[0] = 0;
    population.fitness = vec![1.0; geometry.size()];
    population.fitness[0] = moran.relative_fitness;

    let backend = Backend::Ibs {
        geometry,
        population,
        config: IbsConfig::default(),
        clock: IbsClock::default(),
    };
    let mut model = Model::new(moran, backend, 7, 1.0);

    let mut generations = 0.0;
    while model.next() {
        generations = model.time();
        if generations > 5_000.0 {
            break;
        }
    }

    let snapshot = model.snapshot();
    let fixed = snapshot.ibs.as_ref().unwrap().strategies.iter().all(|&s| s == 0);
    println!(
        "moran birth-death amplifier: generations={:.1} mutant_fixed={}",
        generations, fixed
    );
}
