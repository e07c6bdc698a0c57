//! The common `Model` shell (§3 lifecycle, §4.6 driver loop): binds one [`Module`]
//! to one concrete backend and exposes `load/check/reset/init/next/relax/unload`,
//! plus milestone/change listener notification. One enum, one match per operation,
//! repeated for `Ibs`/`Ode`/`Sde`/`Pde`.
use crate::errors::CheckReport;
use crate::geometry::Geometry;
use crate::ibs::driver::{self as ibs_driver, IbsClock, IbsConfig};
use crate::ibs::population::IbsPopulation;
use crate::model::listener::{ChangeListener, MilestoneListener, PendingAction};
use crate::model::snapshot::{BackendKind, IbsSnapshot, Snapshot};
use crate::model::Mode;
use crate::module::{Module, PopulationUpdate};
use crate::ode::{self, OdeConfig, OdeState};
use crate::pde::{self, PdeConfig, PdeState};
use crate::rng::EvoRng;
use crate::sde::{self, SdeConfig};
use std::collections::VecDeque;

/// The concrete dynamical backend a [`Model`] drives (§2).
pub enum Backend {
    Ibs {
        geometry: Geometry,
        population: IbsPopulation,
        config: IbsConfig,
        clock: IbsClock,
    },
    Ode {
        state: OdeState,
        config: OdeConfig,
    },
    Sde {
        state: OdeState,
        config: SdeConfig,
    },
    Pde {
        geometry: Geometry,
        state: PdeState,
        config: PdeConfig,
    },
}

impl Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Ibs { .. } => BackendKind::Ibs,
            Backend::Ode { .. } => BackendKind::Ode,
            Backend::Sde { .. } => BackendKind::Sde,
            Backend::Pde { .. } => BackendKind::Pde,
        }
    }

    /// Only IBS has a natural absorbing/fixation halt to sample repeatedly (§4.6).
    fn supports_statistics(&self) -> bool {
        matches!(self, Backend::Ibs { .. })
    }

    #[cfg(test)]
    pub(crate) fn ode_state_for_test(&self) -> &OdeState {
        match self {
            Backend::Ode { state, .. } | Backend::Sde { state, .. } => state,
            _ => panic!("not an ODE/SDE backend"),
        }
    }
}

/// Driver tunables shared by every backend (§2.1, §6): separates "what to run"
/// (a [`Module`] bound to a [`Backend`]) from "how to run it" (report cadence,
/// execution [`Mode`]), the same split the teacher draws between `EvolveConfig`
/// and the strategy it configures. Built through `with_*` like the backend
/// configs (`OdeConfig`, `SdeConfig`, `PdeConfig`, `IbsConfig`).
#[derive(Clone, Copy, Debug)]
pub struct DriverConfig {
    /// Size of one `next()` advance: generations for IBS/ODE/SDE's reporting
    /// cadence, or direct time units for PDE -- interpreted by the concrete
    /// backend's stepper.
    pub report_interval: f64,
    pub mode: Mode,
}

impl DriverConfig {
    pub fn new(report_interval: f64) -> Self {
        Self {
            report_interval,
            mode: Mode::Dynamics,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Binds one [`Module`] to one concrete [`Backend`] and drives it one report
/// interval at a time. A single `Model` owns one species' state; the ODE stepper
/// generalizes across [`OdeState::slices`] when a caller packs several species into
/// one state vector, and the IBS side's multi-species focal-species selection
/// (§4.5 step 1) lives in [`ibs_driver::async_event_multi_species`] for callers
/// driving several species' populations side by side, sharing one [`EvoRng`].
pub struct Model<M: Module> {
    module: M,
    backend: Backend,
    rng: EvoRng,
    driver: DriverConfig,
    time: f64,
    converged: bool,
    needs_reset: bool,
    pending: VecDeque<PendingAction>,
    /// Samples collected under `Mode::StatisticsSample`/`StatisticsUpdate` (§4.6).
    samples: Vec<Snapshot>,
    milestone_listeners: Vec<Box<dyn MilestoneListener>>,
    change_listeners: Vec<Box<dyn ChangeListener>>,
}

impl<M: Module> Model<M> {
    pub fn new(module: M, backend: Backend, seed: u64, report_interval: f64) -> Self {
        Self::with_driver_config(module, backend, seed, DriverConfig::new(report_interval))
    }

    /// Construct with an explicit [`DriverConfig`], e.g. to start in a statistics
    /// mode rather than `Dynamics`.
    pub fn with_driver_config(module: M, backend: Backend, seed: u64, driver: DriverConfig) -> Self {
        Self {
            module,
            backend,
            rng: EvoRng::from_seed(seed),
            driver,
            time: 0.0,
            converged: false,
            needs_reset: false,
            pending: VecDeque::new(),
            samples: Vec::new(),
            milestone_listeners: Vec::new(),
            change_listeners: Vec::new(),
        }
    }

    pub fn add_milestone_listener(&mut self, listener: Box<dyn MilestoneListener>) {
        self.milestone_listeners.push(listener);
    }

    pub fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.change_listeners.push(listener);
    }

    fn notify_milestone(&mut self, f: impl Fn(&mut dyn MilestoneListener)) {
        for listener in self.milestone_listeners.iter_mut() {
            f(listener.as_mut());
        }
    }

    pub fn load(&mut self) {
        self.notify_milestone(|l| l.on_model_loaded());
    }

    pub fn unload(&mut self) {
        self.notify_milestone(|l| l.on_model_unloaded());
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    pub fn mode(&self) -> Mode {
        self.driver.mode
    }

    /// Samples collected so far under a statistics [`Mode`] (§4.6); empty under
    /// `Dynamics`.
    pub fn samples(&self) -> &[Snapshot] {
        &self.samples
    }

    /// Queue a cooperative action for [`Model::next`] to process on its next call
    /// (§4.6). Actions run in FIFO order, one full drain per `next()` call.
    pub fn enqueue_pending_action(&mut self, action: PendingAction) {
        self.pending.push_back(action);
    }

    /// Drain and apply queued [`PendingAction`]s. `Init`/`Reset` are milestones in
    /// their own right and fire only the matching milestone hook; every other
    /// variant (including `Stop`, which also halts the run) notifies
    /// `on_pending_action` instead.
    fn process_pending_actions(&mut self) {
        while let Some(action) = self.pending.pop_front() {
            match action {
                PendingAction::None => {}
                PendingAction::Init => self.notify_milestone(|l| l.on_did_reinit()),
                PendingAction::Reset => self.reset(),
                PendingAction::Stop => {
                    self.converged = true;
                    for listener in self.change_listeners.iter_mut() {
                        listener.on_pending_action(action);
                    }
                }
                _ => {
                    for listener in self.change_listeners.iter_mut() {
                        listener.on_pending_action(action);
                    }
                }
            }
        }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// `setMode`, consulting `permitsMode` first (§4.6).
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if !mode.permits(self.backend.supports_statistics()) {
            return false;
        }
        self.driver.mode = mode;
        for listener in self.change_listeners.iter_mut() {
            listener.on_mode_changed(mode);
        }
        true
    }

    /// `check()` (§3, §7): validates parameters, reverting unsafe ones with a
    /// logged warning, and records whether structural state now demands a `reset`.
    pub fn check(&mut self) -> CheckReport {
        let module = &self.module;
        let report = match &mut self.backend {
            Backend::Ode { state, config } => {
                for slice in state.slices.clone() {
                    ode::compute_fitness(module, slice, &state.y, &mut state.fitness[slice.start..slice.end]);
                }
                config.check(&state.fitness)
            }
            Backend::Sde { config, .. } => {
                let active = module.trait_count()
                    - module.dependent().is_some() as usize
                    - module.vacant().is_some() as usize;
                sde::check(config, active)
            }
            Backend::Pde { geometry, config, .. } => config.check(geometry),
            Backend::Ibs { .. } => CheckReport::ok(),
        };
        if report.needs_reset {
            self.needs_reset = true;
        }
        report
    }

    /// `reset()` (§3): clears statistics, re-derives nothing else (fitness maps are
    /// stateless and recomputed every step already).
    pub fn reset(&mut self) {
        match &mut self.backend {
            Backend::Ibs { population, .. } => population.reset_scores(),
            Backend::Ode { state, .. } | Backend::Sde { state, .. } => {
                state.dy.iter_mut().for_each(|d| *d = 0.0);
                state.time = 0.0;
            }
            Backend::Pde { state, .. } => state.time = 0.0,
        }
        self.time = 0.0;
        self.converged = false;
        self.needs_reset = false;
        self.notify_milestone(|l| l.on_did_reset());
    }

    /// `init()` (§3): set the initial trait-frequency vector (ODE/SDE: the state
    /// vector directly; PDE: broadcast to every cell; IBS: assign traits so that
    /// rounded integer counts match the requested frequencies, then shuffle).
    pub fn init_frequencies(&mut self, y0: &[f64]) {
        let dependent = self.module.dependent();
        match &mut self.backend {
            Backend::Ode { state, .. } | Backend::Sde { state, .. } => {
                state.y.copy_from_slice(y0);
                for slice in state.slices.clone() {
                    ode::normalize_frequency(&mut state.y[slice.start..slice.end], dependent);
                }
            }
            Backend::Pde { geometry, state, .. } => {
                let n_cells = geometry.size();
                for c in 0..n_cells {
                    state.cell_mut(c).copy_from_slice(y0);
                }
            }
            Backend::Ibs { population, .. } => {
                let n = population.size();
                let mut traits = Vec::with_capacity(n);
                for (t, &freq) in y0.iter().enumerate() {
                    let count = (freq * n as f64).round() as usize;
                    traits.extend(std::iter::repeat(t).take(count));
                }
                traits.resize(n, 0);
                for i in (1..traits.len()).rev() {
                    let j = self.rng.index(i + 1);
                    traits.swap(i, j);
                }
                population.traits.copy_from_slice(&traits);
                population.traits_next.copy_from_slice(&traits);
            }
        }
        self.notify_milestone(|l| l.on_did_reinit());
    }

    /// Steps every species' slice in lockstep, sharing one Euler step size so their
    /// clocks stay aligned, and deriving IMITATE's relative time scale from the
    /// tightest fitness range across all of them (§4.2 multi-species normalisation)
    /// rather than a fixed constant. Global convergence requires every species to
    /// have individually converged.
    fn step_ode(module: &M, state: &mut OdeState, config: &mut OdeConfig, rng: &mut EvoRng, target: f64) -> f64 {
        let dependent = module.dependent();
        let vacant = module.vacant();
        let mutation = module.mutation();
        let slices = state.slices.clone();
        let mut advanced = 0.0;
        loop {
            let step = config.dt.min(target - advanced);
            for &slice in &slices {
                ode::compute_fitness(module, slice, &state.y, &mut state.fitness[slice.start..slice.end]);
            }
            let before = state.y.clone();

            let delta_min = slices
                .iter()
                .map(|s| {
                    let seg = &state.fitness[s.start..s.end];
                    let hi = seg.iter().cloned().fold(f64::MIN, f64::max);
                    let lo = seg.iter().cloned().fold(f64::MAX, f64::min);
                    (hi - lo).max(1e-12)
                })
                .fold(f64::MAX, f64::min);

            for &slice in &slices {
                let y_local = &state.y[slice.start..slice.end];
                let f_local = &state.fitness[slice.start..slice.end];
                let mut dy_local = vec![0.0; slice.len()];
                if let Some(v) = vacant {
                    ode::ecology_derivative(y_local, f_local, v, module.death_rate(), &mut dy_local);
                } else {
                    ode::derivative(
                        module.player_update(),
                        y_local,
                        f_local,
                        dependent,
                        vacant,
                        module.death_rate(),
                        config.noise,
                        delta_min,
                        &mut dy_local,
                    );
                    ode::correct_drift(&mut dy_local, dependent, vacant);
                }
                state.dy[slice.start..slice.end].copy_from_slice(&dy_local);
            }

            if config.adjusted_dynamics {
                let mean_f = state.fitness.iter().sum::<f64>() / state.fitness.len().max(1) as f64;
                if mean_f > 0.0 {
                    state.dy.iter_mut().for_each(|d| *d /= mean_f);
                }
            }

            if let crate::module::MutationKind::Uniform { rate } = mutation {
                for &slice in &slices {
                    let t = slice.len() as f64;
                    for i in slice.start..slice.end {
                        if Some(i - slice.start) == dependent {
                            continue;
                        }
                        let bias = (1.0 - t * state.y[i]) / t;
                        state.dy[i] = (1.0 - rate) * state.dy[i] + rate * bias;
                    }
                }
            }

            let signed_step = if config.time_reversed { -step } else { step };
            // Probe every slice independently to find the most restrictive clamp,
            // then apply that single step size everywhere so species stay in lockstep.
            let mut h_taken = signed_step;
            for &slice in &slices {
                let mut y_probe = state.y[slice.start..slice.end].to_vec();
                let probe = ode::euler_step_clamped(&mut y_probe, &state.dy[slice.start..slice.end], signed_step, dependent);
                if probe.abs() < h_taken.abs() {
                    h_taken = probe;
                }
            }
            for &slice in &slices {
                let mut y_local = state.y[slice.start..slice.end].to_vec();
                ode::euler_step_clamped(&mut y_local, &state.dy[slice.start..slice.end], h_taken, dependent);
                ode::normalize_frequency(&mut y_local, dependent);
                state.y[slice.start..slice.end].copy_from_slice(&y_local);
            }
            state.time += h_taken;
            advanced += h_taken.abs();

            if h_taken.abs() < ode::ODE_MIN_STEP {
                log::warn!("ode: emergency brake triggered (step collapsed below {})", ode::ODE_MIN_STEP);
                return -h_taken.abs().max(ode::ODE_MIN_STEP);
            }
            let all_converged = slices
                .iter()
                .all(|s| ode::converged(&before[s.start..s.end], &state.y[s.start..s.end], config.accuracy, h_taken));
            if all_converged {
                return -h_taken.abs();
            }
            let _ = rng;
            if advanced >= target {
                return step;
            }
        }
    }

    fn step_sde(module: &M, state: &mut OdeState, config: &mut SdeConfig, rng: &mut EvoRng, target: f64) -> f64 {
        let dependent = module.dependent();
        let vacant = module.vacant();
        let mutation_rate = module.mutation().rate();
        let mut advanced = 0.0;
        while advanced < target {
            let slice = ode::SpeciesSlice { start: 0, end: state.y.len() };
            ode::compute_fitness(module, slice, &state.y, &mut state.fitness);
            sde::sde_step(
                module.player_update(),
                &mut state.y,
                &state.fitness,
                dependent,
                vacant,
                module.death_rate(),
                config,
                mutation_rate,
                rng,
            );
            state.time += config.ode.dt;
            advanced += config.ode.dt;
            if mutation_rate <= 0.0 && ode::is_monomorphic(&state.y, dependent, vacant, config.ode.accuracy) {
                return -config.ode.dt;
            }
        }
        config.ode.dt
    }

    fn step_pde(module: &M, geometry: &Geometry, state: &mut PdeState, config: &mut PdeConfig, target: f64) -> f64
    where
        M: Sync,
    {
        let dependent = module.dependent();
        let vacant = module.vacant();
        let mut advanced = 0.0;
        while advanced < target {
            pde::supervisor::step(module, geometry, module.player_update(), config, dependent, vacant, module.death_rate(), state);
            advanced += config.dt;
        }
        config.dt
    }

    fn step_ibs(module: &M, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, clock: &mut IbsClock, rng: &mut EvoRng, target_generations: f64) -> f64 {
        let start = clock.generation;
        let update = module.population_update();
        while clock.generation - start < target_generations {
            match update {
                PopulationUpdate::Sync { fraction } => {
                    ibs_driver::sync_step(module, geometry, population, config, fraction, 1.0, rng);
                    clock.generation += 1.0;
                }
                PopulationUpdate::WrightFisher => {
                    ibs_driver::wright_fisher_step(module, geometry, population, config, rng);
                    clock.generation += 1.0;
                }
                PopulationUpdate::Once => {
                    ibs_driver::async_event(module, geometry, population, config, module.update_rate(), 1.0, rng, clock);
                    break;
                }
                _ => {
                    ibs_driver::async_event(module, geometry, population, config, module.update_rate(), 1.0, rng, clock);
                }
            }
        }
        target_generations
    }

    /// `next()`, the universal event-pump (§4.6). Returns `false` when the model
    /// has nothing left to do this report interval (converged, or a milestone was
    /// reached), `true` if the caller should call again to keep advancing.
    pub fn next(&mut self) -> bool
    where
        M: Sync,
    {
        self.process_pending_actions();

        if self.converged && self.module.mutation().rate() <= 0.0 {
            self.notify_milestone(|l| l.on_model_stopped());
            return false;
        }

        let mut introduced_mutant = false;
        if let Backend::Ibs { population, config, clock, .. } = &mut self.backend {
            if ibs_driver::homogeneous_fast_path(population, self.module.mutation().rate(), config.optimize_homo, clock, &mut self.rng).is_some() {
                let n = population.size();
                let site = self.rng.index(n);
                let mutant_trait = self.rng.index(self.module.trait_count());
                population.traits[site] = mutant_trait;
                population.traits_next[site] = mutant_trait;
                introduced_mutant = true;
            }
        }
        if introduced_mutant {
            self.notify_milestone(|l| l.on_model_running());
            return true;
        }

        let module = &self.module;
        let rng = &mut self.rng;
        let report_interval = self.driver.report_interval;
        let dt = match &mut self.backend {
            Backend::Ode { state, config } => Self::step_ode(module, state, config, rng, report_interval),
            Backend::Sde { state, config } => Self::step_sde(module, state, config, rng, report_interval),
            Backend::Pde { geometry, state, config } => Self::step_pde(module, geometry, state, config, report_interval),
            Backend::Ibs { geometry, population, config, clock } => Self::step_ibs(module, geometry, population, config, clock, rng, report_interval),
        };

        self.notify_milestone(|l| l.on_model_running());
        self.time += dt.abs();

        if self.driver.mode == Mode::StatisticsUpdate {
            self.samples.push(self.snapshot());
        }

        if dt < 0.0 {
            if self.driver.mode == Mode::StatisticsSample {
                // One run to an absorbing state per sample, then start over (§4.6)
                // instead of halting the whole model.
                self.samples.push(self.snapshot());
                self.reset();
                self.notify_milestone(|l| l.on_did_reinit());
                return true;
            }
            self.converged = true;
            self.notify_milestone(|l| l.on_model_stopped());
            return false;
        }
        true
    }

    /// `relax(G)` (§4.6): temporarily set the report interval to `G` generations,
    /// run one step, then restore the previous interval. Used for burn-in.
    pub fn relax(&mut self, generations: f64) -> bool
    where
        M: Sync,
    {
        let saved = self.driver.report_interval;
        self.driver.report_interval = generations;
        let result = self.next();
        self.driver.report_interval = saved;
        self.notify_milestone(|l| l.on_model_relaxed());
        result
    }

    /// A restorable snapshot of the current state (§6).
    pub fn snapshot(&self) -> Snapshot {
        let rng_seed = self.rng.seed();
        let rng_words_consumed = self.rng.words_consumed();
        match &self.backend {
            Backend::Ode { state, config } => Snapshot {
                generation: state.time,
                realtime: state.time,
                model: self.backend.kind(),
                state: state.y.clone(),
                state_change: state.dy.clone(),
                fitness: Some(state.fitness.clone()),
                dt: config.dt,
                forward: !config.time_reversed,
                adjusted_dynamics: config.adjusted_dynamics,
                accuracy: config.accuracy,
                ibs: None,
                rng_seed,
                rng_words_consumed,
            },
            Backend::Sde { state, config } => Snapshot {
                generation: state.time,
                realtime: state.time,
                model: self.backend.kind(),
                state: state.y.clone(),
                state_change: state.dy.clone(),
                fitness: Some(state.fitness.clone()),
                dt: config.ode.dt,
                forward: !config.ode.time_reversed,
                adjusted_dynamics: config.ode.adjusted_dynamics,
                accuracy: config.ode.accuracy,
                ibs: None,
                rng_seed,
                rng_words_consumed,
            },
            Backend::Pde { state, config, .. } => Snapshot {
                generation: state.time,
                realtime: state.time,
                model: self.backend.kind(),
                state: state.density.clone(),
                state_change: state.next.clone(),
                fitness: None,
                dt: config.dt,
                forward: true,
                adjusted_dynamics: false,
                accuracy: config.accuracy,
                ibs: None,
                rng_seed,
                rng_words_consumed,
            },
            Backend::Ibs { population, clock, .. } => Snapshot {
                generation: clock.generation,
                realtime: clock.realtime,
                model: self.backend.kind(),
                state: Vec::new(),
                state_change: Vec::new(),
                fitness: None,
                dt: 0.0,
                forward: true,
                adjusted_dynamics: false,
                accuracy: 0.0,
                ibs: Some(IbsSnapshot {
                    strategies: population.traits.clone(),
                    fitness: population.fitness.clone(),
                    interactions: population.interactions.clone(),
                }),
                rng_seed,
                rng_words_consumed,
            },
        }
    }

    /// Rebuild a [`Model`] from a [`Snapshot`] so that continuing to call `next()`
    /// reproduces the exact forward trajectory a live run would have taken (§6, §8
    /// byte-equivalence). `backend` must already be shaped for the snapshot's
    /// [`BackendKind`] -- right geometry, right config fields the snapshot itself
    /// doesn't carry (`OdeConfig::noise`, `PdeConfig::diffusion`/`advection`, any
    /// `IbsConfig`) -- only the numeric state and the RNG stream are overwritten
    /// from `snapshot`.
    pub fn restore(module: M, mut backend: Backend, driver: DriverConfig, snapshot: &Snapshot) -> Self {
        match (&mut backend, snapshot.model) {
            (Backend::Ode { state, config }, BackendKind::Ode) => {
                state.y.copy_from_slice(&snapshot.state);
                state.dy.copy_from_slice(&snapshot.state_change);
                if let Some(fitness) = &snapshot.fitness {
                    state.fitness.copy_from_slice(fitness);
                }
                state.time = snapshot.generation;
                config.dt = snapshot.dt;
                config.time_reversed = !snapshot.forward;
                config.adjusted_dynamics = snapshot.adjusted_dynamics;
                config.accuracy = snapshot.accuracy;
            }
            (Backend::Sde { state, config }, BackendKind::Sde) => {
                state.y.copy_from_slice(&snapshot.state);
                state.dy.copy_from_slice(&snapshot.state_change);
                if let Some(fitness) = &snapshot.fitness {
                    state.fitness.copy_from_slice(fitness);
                }
                state.time = snapshot.generation;
                config.ode.dt = snapshot.dt;
                config.ode.time_reversed = !snapshot.forward;
                config.ode.adjusted_dynamics = snapshot.adjusted_dynamics;
                config.ode.accuracy = snapshot.accuracy;
            }
            (Backend::Pde { state, config, .. }, BackendKind::Pde) => {
                state.density.copy_from_slice(&snapshot.state);
                state.next.copy_from_slice(&snapshot.state_change);
                state.time = snapshot.generation;
                config.dt = snapshot.dt;
                config.accuracy = snapshot.accuracy;
            }
            (Backend::Ibs { population, clock, .. }, BackendKind::Ibs) => {
                let ibs = snapshot.ibs.as_ref().expect("an IBS snapshot must carry `ibs`");
                population.traits.copy_from_slice(&ibs.strategies);
                population.traits_next.copy_from_slice(&ibs.strategies);
                population.fitness.copy_from_slice(&ibs.fitness);
                population.interactions.copy_from_slice(&ibs.interactions);
                clock.generation = snapshot.generation;
                clock.realtime = snapshot.realtime;
            }
            _ => panic!("backend shape does not match the snapshot's backend kind"),
        }
        Self {
            module,
            backend,
            rng: EvoRng::restore(snapshot.rng_seed, snapshot.rng_words_consumed),
            driver,
            time: snapshot.generation,
            converged: false,
            needs_reset: false,
            pending: VecDeque::new(),
            samples: Vec::new(),
            milestone_listeners: Vec::new(),
            change_listeners: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::module::placeholders::TwoByTwoGame;

    fn snowdrift_model() -> Model<TwoByTwoGame> {
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let state = OdeState::new(&[2]);
        let backend = Backend::Ode { state, config: OdeConfig::default() };
        Model::new(game, backend, 1, 0.1)
    }

    #[test]
    fn an_ode_model_converges_toward_the_snowdrift_mix() {
        let mut model = snowdrift_model();
        model.init_frequencies(&[0.9, 0.1]);
        for _ in 0..2000 {
            if !model.next() {
                break;
            }
        }
        let y = &model.backend().ode_state_for_test().y;
        assert!((y[0] - 2.0 / 3.0).abs() < 0.05, "expected ~2/3 cooperators, got {y:?}");
    }

    #[test]
    fn with_driver_config_starts_in_the_requested_mode() {
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let backend = Backend::Ode { state: OdeState::new(&[2]), config: OdeConfig::default() };
        let driver = DriverConfig::new(0.1).with_mode(Mode::Dynamics);
        let model = Model::with_driver_config(game, backend, 1, driver);
        assert_eq!(model.mode(), Mode::Dynamics);
    }

    #[test]
    fn reset_clears_time_and_convergence_flags() {
        let mut model = snowdrift_model();
        model.init_frequencies(&[0.9, 0.1]);
        for _ in 0..2000 {
            if !model.next() {
                break;
            }
        }
        model.reset();
        assert_eq!(model.time(), 0.0);
        assert!(!model.is_converged());
    }

    #[test]
    fn an_ibs_model_on_a_snowdrift_game_reaches_the_requested_generation_budget() {
        let geo = Geometry::builder().square(6).build().unwrap();
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let population = IbsPopulation::new(geo.size(), 0);
        let backend = Backend::Ibs {
            geometry: geo,
            population,
            config: IbsConfig::default(),
            clock: IbsClock::default(),
        };
        let mut model = Model::new(game, backend, 3, 5.0);
        assert!(model.next());
    }

    fn moran_fixation_model(mode: Mode) -> Model<crate::module::placeholders::MoranConstantSelection> {
        use crate::module::placeholders::MoranConstantSelection;
        let geometry = Geometry::builder().meanfield(6).build().unwrap();
        let moran = MoranConstantSelection::new(3.0);
        let mut population = IbsPopulation::new(geometry.size(), 1);
        population.traits[0] = 0;
        let backend = Backend::Ibs {
            geometry,
            population,
            config: IbsConfig::default(),
            clock: IbsClock::default(),
        };
        let driver = DriverConfig::new(1.0).with_mode(mode);
        Model::with_driver_config(moran, backend, 5, driver)
    }

    #[test]
    fn statistics_sample_mode_resets_and_keeps_running_past_convergence() {
        let mut model = moran_fixation_model(Mode::StatisticsSample);
        let mut kept_running_after_convergence = false;
        for _ in 0..2000 {
            model.next();
            if model.samples().len() >= 2 {
                kept_running_after_convergence = true;
                break;
            }
        }
        assert!(kept_running_after_convergence, "StatisticsSample mode must reset and resample instead of halting");
        assert!(!model.is_converged(), "a resampling run must not be left in the converged state");
    }

    #[test]
    fn statistics_update_mode_collects_a_sample_every_call() {
        let mut model = moran_fixation_model(Mode::StatisticsUpdate);
        for _ in 0..5 {
            model.next();
        }
        assert_eq!(model.samples().len(), 5, "StatisticsUpdate mode collects one sample per next() call");
    }

    #[test]
    fn stop_pending_action_halts_the_model_and_notifies_listeners() {
        let seen_actions = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut model = snowdrift_model();
        model.init_frequencies(&[0.9, 0.1]);
        model.add_change_listener(Box::new(SharedRecordingListener(seen_actions.clone())));
        model.enqueue_pending_action(PendingAction::Stop);
        assert!(!model.next(), "Stop must halt the model on the next call");
        assert!(model.is_converged());
        assert_eq!(*seen_actions.borrow(), vec![PendingAction::Stop]);
    }

    struct ReinitCounter(std::rc::Rc<std::cell::Cell<u32>>);
    impl MilestoneListener for ReinitCounter {
        fn on_did_reinit(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct SharedRecordingListener(std::rc::Rc<std::cell::RefCell<Vec<PendingAction>>>);
    impl ChangeListener for SharedRecordingListener {
        fn on_pending_action(&mut self, action: PendingAction) {
            self.0.borrow_mut().push(action);
        }
    }

    #[test]
    fn init_pending_action_fires_on_did_reinit_not_on_pending_action() {
        let reinit_count = std::rc::Rc::new(std::cell::Cell::new(0));
        let seen_actions = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let mut model = snowdrift_model();
        model.init_frequencies(&[0.9, 0.1]);
        model.add_milestone_listener(Box::new(ReinitCounter(reinit_count.clone())));
        model.add_change_listener(Box::new(SharedRecordingListener(seen_actions.clone())));
        model.enqueue_pending_action(PendingAction::Init);
        model.next();

        assert_eq!(reinit_count.get(), 1, "Init must fire the on_did_reinit milestone");
        assert!(seen_actions.borrow().is_empty(), "Init must not also notify on_pending_action");
    }

    #[test]
    fn reset_pending_action_runs_before_the_next_step() {
        let mut model = snowdrift_model();
        model.init_frequencies(&[0.9, 0.1]);
        for _ in 0..50 {
            model.next();
        }
        let time_before_reset = model.time();
        assert!(time_before_reset > 0.0);

        model.enqueue_pending_action(PendingAction::Reset);
        model.next();
        // The queued reset clears elapsed time before this call's own step runs, so
        // only one step's worth of time should have accumulated since.
        assert!(model.time() < time_before_reset, "Reset must zero time before the following step advances it");
    }
}
