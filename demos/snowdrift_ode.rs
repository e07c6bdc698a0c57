use evo_dynamics::model::{Backend, Model};
use evo_dynamics::module::placeholders::TwoByTwoGame;
use evo_dynamics::ode::{OdeConfig, OdeState};

fn main() {
    env_logger::init();

    let snowdrift = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
    let backend = Backend::Ode {
        state: OdeState::new(&[2]),
        config: OdeConfig::default(),
    };
    let mut model = Model::new(snowdrift, backend, 1, 0.1);
    model.init_frequencies(&[0.9, 0.1]);

    while model.next() {}

    let snapshot = model.snapshot();
    println!(
        "snowdrift converged at t={:.2}: cooperators={:.4} defectors={:.4}",
        model.time(),
        snapshot.state[0],
        snapshot.state[1]
    );
}
