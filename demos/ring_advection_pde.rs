use evo_dynamics::geometry::Geometry;
use evo_dynamics::model::{Backend, Model};
use evo_dynamics::module::placeholders::TwoByTwoGame;
use evo_dynamics::pde::init::{self, InitProfile};
use evo_dynamics::pde::{PdeConfig, PdeState};

fn main() {
    env_logger::init();

    let ring_size = 40;
    let geometry = Geometry::builder().linear(ring_size).build().unwrap();
    let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);

    let mut config = PdeConfig::new(2);
    config.diffusion = vec![0.01, 0.01];
    config.advection = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
    config.advection[0][0] = 2.0;
    config.check(&geometry);

    let mut state = PdeState::new(geometry.size(), 2);
    let mut rng = evo_dynamics::rng::EvoRng::from_seed(11);
    init::apply(InitProfile::Perturbation, &geometry, &[0.5, 0.5], &[1.0, 0.0], &mut rng, &mut state.density);

    let backend = Backend::Pde { geometry, state, config };
    let mut model = Model::new(game, backend, 11, 1.0);

    let peak_cell = |m: &Model<TwoByTwoGame>| -> usize {
        let snapshot = m.snapshot();
        (0..ring_size)
            .max_by(|&a, &b| {
                snapshot.state[a * 2]
                    .partial_cmp(&snapshot.state[b * 2])
                    .unwrap()
            })
            .unwrap()
    };

    let start = peak_cell(&model);
    for _ in 0..200 {
        if !model.next() {
            break;
        }
    }
    let end = peak_cell(&model);

    println!(
        "advection ring: cooperator peak moved from cell {} to cell {} over t={:.2}",
        start,
        end,
        model.time()
    );
}
