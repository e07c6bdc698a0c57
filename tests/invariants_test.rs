//! Cross-cutting invariants that must hold regardless of which concrete backend
//! or module drives a [`Model`].
use evo_dynamics::fitness_map::FitnessMap;
use evo_dynamics::ibs::driver::{IbsClock, IbsConfig};
use evo_dynamics::ibs::population::IbsPopulation;
use evo_dynamics::model::{Backend, Model};
use evo_dynamics::module::placeholders::{MoranConstantSelection, TwoByTwoGame};
use evo_dynamics::module::{Capability, Module, MutationKind, PlayerUpdate};
use evo_dynamics::ode::{OdeConfig, OdeState};
use evo_dynamics::geometry::Geometry;

#[test]
fn frequency_stays_normalized_through_every_ode_step() {
    let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
    let backend = Backend::Ode {
        state: OdeState::new(&[2]),
        config: OdeConfig::default(),
    };
    let mut model = Model::new(game, backend, 5, 0.05);
    model.init_frequencies(&[0.7, 0.3]);
    for _ in 0..500 {
        let snapshot = model.snapshot();
        let y = &snapshot.state;
        let sum: f64 = y.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "frequencies must sum to 1, got {y:?}");
        for &yi in y {
            assert!(yi >= -1e-9, "frequencies must stay non-negative, got {y:?}");
        }
        if !model.next() {
            break;
        }
    }
}

#[test]
fn a_model_snapshot_round_trips_through_json_unchanged() {
    let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
    let backend = Backend::Ode {
        state: OdeState::new(&[2]),
        config: OdeConfig::default(),
    };
    let mut model = Model::new(game, backend, 9, 0.1);
    model.init_frequencies(&[0.6, 0.4]);
    for _ in 0..25 {
        if !model.next() {
            break;
        }
    }
    let snapshot = model.snapshot();
    let json = snapshot.to_json().unwrap();
    let restored = evo_dynamics::model::Snapshot::from_json(&json).unwrap();
    assert_eq!(snapshot, restored);
}

#[test]
fn ibs_realtime_clock_never_goes_backwards() {
    let geometry = Geometry::builder().square(6).build().unwrap();
    let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
    let population = IbsPopulation::new(geometry.size(), 0);
    let backend = Backend::Ibs {
        geometry,
        population,
        config: IbsConfig::default(),
        clock: IbsClock::default(),
    };
    let mut model = Model::new(game, backend, 6, 0.2);

    let mut last_realtime = 0.0;
    for _ in 0..100 {
        if !model.next() {
            break;
        }
        let realtime = model.snapshot().realtime;
        assert!(realtime >= last_realtime, "realtime clock must be monotone: {realtime} < {last_realtime}");
        last_realtime = realtime;
    }
}

/// A module whose fitness map is left at the identity and whose payoff is a fixed
/// negative constant, so `check()` has something concrete to revert.
#[derive(Debug)]
struct AlwaysUnfitModule;

impl Module for AlwaysUnfitModule {
    fn trait_count(&self) -> usize {
        2
    }
    fn dependent(&self) -> Option<usize> {
        None
    }
    fn vacant(&self) -> Option<usize> {
        None
    }
    fn n_group(&self) -> usize {
        2
    }
    fn capability(&self) -> Capability {
        Capability {
            c_pairs: true,
            ..Default::default()
        }
    }
    fn player_update(&self) -> PlayerUpdate {
        PlayerUpdate::Imitate
    }
    fn mutation(&self) -> MutationKind {
        MutationKind::None
    }
    fn fitness_map(&self) -> FitnessMap {
        FitnessMap::default()
    }
    fn pair_scores(&self, _my_trait: usize, _opp_traits: &[usize], _out_scores: &mut [f64]) -> f64 {
        0.0
    }
    fn avg_scores(&self, _state: &[f64], out_scores: &mut [f64]) {
        out_scores.iter_mut().for_each(|s| *s = -5.0);
    }
}

#[test]
fn check_reverts_adjusted_dynamics_when_fitness_is_non_positive() {
    let mut config = OdeConfig::default();
    config.adjusted_dynamics = true;
    let backend = Backend::Ode {
        state: OdeState::new(&[2]),
        config,
    };
    let mut model = Model::new(AlwaysUnfitModule, backend, 1, 0.1);
    model.init_frequencies(&[0.5, 0.5]);

    let report = model.check();
    assert!(!report.is_clean());
    assert!(report.warnings.iter().any(|w| w.field == "adjusted_dynamics"));
}

#[test]
fn restoring_a_snapshot_reproduces_the_same_forward_trajectory_bit_for_bit() {
    let build_model = |seed: u64| -> Model<TwoByTwoGame> {
        let geometry = Geometry::builder().meanfield(10).build().unwrap();
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let population = IbsPopulation::new(geometry.size(), 0);
        let backend = Backend::Ibs {
            geometry,
            population,
            config: IbsConfig::default(),
            clock: IbsClock::default(),
        };
        Model::new(game, backend, seed, 2.0)
    };

    let mut live = build_model(11);
    for _ in 0..30 {
        if !live.next() {
            break;
        }
    }
    let midpoint = live.snapshot();

    for _ in 0..20 {
        if !live.next() {
            break;
        }
    }
    let continued = live.snapshot();

    let geometry = Geometry::builder().meanfield(10).build().unwrap();
    let backend = Backend::Ibs {
        geometry,
        population: IbsPopulation::new(10, 0),
        config: IbsConfig::default(),
        clock: IbsClock::default(),
    };
    let driver = evo_dynamics::model::DriverConfig::new(2.0);
    let mut restored = Model::restore(TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0), backend, driver, &midpoint);
    for _ in 0..20 {
        if !restored.next() {
            break;
        }
    }
    let restored_snapshot = restored.snapshot();

    assert_eq!(continued.rng_seed, restored_snapshot.rng_seed);
    assert_eq!(continued.rng_words_consumed, restored_snapshot.rng_words_consumed);
    assert_eq!(continued.generation, restored_snapshot.generation);
    assert_eq!(continued.realtime, restored_snapshot.realtime);
    assert_eq!(continued.ibs.unwrap().strategies, restored_snapshot.ibs.unwrap().strategies);
}

#[test]
fn moran_module_exposes_a_constant_relative_fitness_ratio() {
    let moran = MoranConstantSelection::new(2.5);
    let mut out = [0.0; 2];
    moran.avg_scores(&[0.0, 0.0], &mut out);
    assert_eq!(out, [2.5, 1.0]);
}
