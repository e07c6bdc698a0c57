//! Asynchronous and synchronous steppers (§4.5): focal-site selection, interaction
//! play, trait-update commit, and the homogeneous-population fast path. Multi-species
//! focal-*species* selection (`SIZE | FITNESS | TURNS`, §4.5 step 1) is wired in
//! [`async_event_multi_species`], which picks a species then delegates to the same
//! single-species event machinery [`async_event`] uses.
use crate::geometry::Geometry;
use crate::ibs::migration::{self, MigrationKind};
use crate::ibs::population::IbsPopulation;
use crate::ibs::sampler::GroupSampler;
use crate::module::{Module, PlayerUpdate, PopulationUpdate, ScoreReset};
use crate::rng::EvoRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeciesSelect {
    Size,
    Fitness,
    Turns,
}

#[derive(Clone, Debug)]
pub struct IbsConfig {
    pub interaction_sampler: GroupSampler,
    pub reference_sampler: GroupSampler,
    pub score_reset: ScoreReset,
    pub migration_kind: MigrationKind,
    pub migration_rate: f64,
    pub optimize_homo: bool,
}

impl Default for IbsConfig {
    fn default() -> Self {
        Self {
            interaction_sampler: GroupSampler::All,
            reference_sampler: GroupSampler::All,
            score_reset: ScoreReset::OnChange,
            migration_kind: MigrationKind::None,
            migration_rate: 0.0,
            optimize_homo: true,
        }
    }
}

/// The two clocks every backend exposes (§3): `generation` (updates per population
/// size) and `realtime` (Gillespie-like, §4.5 step 2).
#[derive(Clone, Copy, Debug, Default)]
pub struct IbsClock {
    pub realtime: f64,
    pub generation: f64,
}

fn weighted_index(weights: &[f64], rng: &mut EvoRng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.index(weights.len());
    }
    let mut target = rng.uniform() * total;
    for (i, &w) in weights.iter().enumerate() {
        if target < w {
            return i;
        }
        target -= w;
    }
    weights.len() - 1
}

fn pick_focal(update: PopulationUpdate, population: &IbsPopulation, rng: &mut EvoRng) -> usize {
    match update {
        PopulationUpdate::MoranBirthDeath => weighted_index(&population.fitness, rng),
        _ => rng.index(population.size()),
    }
}

fn raw_score(population: &IbsPopulation, i: usize, score_reset: ScoreReset) -> f64 {
    match score_reset {
        ScoreReset::OnUpdate if population.interactions[i] > 0 => {
            population.score[i] / population.interactions[i] as f64
        }
        _ => population.score[i],
    }
}

/// Dispatch one interaction's scoring to the module's group kernel when it plays in
/// groups larger than a pair (§4.1, §4.5 step 4), falling back to the pairwise kernel
/// otherwise -- `Module::group_scores` already degrades to `pair_scores` by default,
/// but a module that implements both must actually be asked for the one it plays.
fn interaction_scores(module: &dyn Module, my_trait: usize, co_players: &[usize], out_scores: &mut [f64]) -> f64 {
    if module.n_group() > 2 {
        module.group_scores(my_trait, co_players, out_scores)
    } else {
        module.pair_scores(my_trait, co_players, out_scores)
    }
}

/// Compose the species' [`FitnessMap`](crate::fitness_map::FitnessMap) onto its
/// constant per-trait score table (§3 "reset ... re-derives derived tables") and
/// write the result into `site`'s fitness. No-op, returning `false`, for modules
/// without the `static_scores` capability.
fn refresh_static_fitness(module: &dyn Module, population: &mut IbsPopulation, site: usize) -> bool {
    if !module.capability().static_scores {
        return false;
    }
    let Some(table) = module.static_scores() else {
        return false;
    };
    let trait_id = population.traits[site];
    population.fitness[site] = module.fitness_map().to_fitness(table[trait_id]);
    true
}

/// The same composition as [`refresh_static_fitness`], applied to every site --
/// used at `reset`/`init` and by the synchronous steppers, which already recompute
/// the whole population's scores in one pass. Returns `false` (leaving `population`
/// untouched) for modules without the `static_scores` capability.
pub fn apply_static_fitness(module: &dyn Module, population: &mut IbsPopulation) -> bool {
    if !module.capability().static_scores {
        return false;
    }
    let Some(table) = module.static_scores() else {
        return false;
    };
    let map = module.fitness_map();
    for site in 0..population.size() {
        let trait_id = population.traits[site];
        population.fitness[site] = map.to_fitness(table[trait_id]);
    }
    true
}

/// Play one interaction for `node` against its sampled group, updating score(s) and
/// fitness per the species' `ScoreReset` policy (§4.5 step 4). A `static_scores`
/// module never computes a live payoff here; its fitness is always the precomposed
/// table value for its current trait.
fn play_interaction(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, node: usize, rng: &mut EvoRng) {
    if refresh_static_fitness(module, population, node) {
        return;
    }
    let opponents = config.interaction_sampler.sample(geometry, node, rng);
    if opponents.is_empty() {
        return;
    }
    let my_trait = population.traits[node];
    let opp_traits: Vec<usize> = opponents.iter().map(|&o| population.traits[o]).collect();
    let mut opp_scores = vec![0.0; opp_traits.len()];
    let total = interaction_scores(module, my_trait, &opp_traits, &mut opp_scores);
    let map = module.fitness_map();

    match config.score_reset {
        ScoreReset::Ephemeral => {
            population.map_to_fitness(node, total, map);
        }
        ScoreReset::OnChange | ScoreReset::OnUpdate => {
            population.score[node] += total;
            population.interactions[node] += 1;
            for (&o, &s) in opponents.iter().zip(opp_scores.iter()) {
                population.score[o] += s;
                population.interactions[o] += 1;
                let raw = raw_score(population, o, config.score_reset);
                population.map_to_fitness(o, raw, map);
            }
            let raw = raw_score(population, node, config.score_reset);
            population.map_to_fitness(node, raw, map);
        }
    }
}

/// Draw the focal's next trait from its fitness and a randomly chosen role model
/// among `reference` (§4.5 step 5, every policy of §4.2 plus `RANDOM`).
fn choose_next_trait(module: &dyn Module, population: &IbsPopulation, focal: usize, reference: &[usize], noise: f64, rng: &mut EvoRng) -> usize {
    let policy = module.player_update();
    if policy == PlayerUpdate::Random {
        return rng.index(module.trait_count());
    }
    if reference.is_empty() {
        return population.traits[focal];
    }
    if policy == PlayerUpdate::BestResponse {
        let mut counts = vec![0usize; module.trait_count()];
        for &r in reference {
            counts[population.traits[r]] += 1;
        }
        let n = reference.len().max(1) as f64;
        let freqs: Vec<f64> = counts.iter().map(|&c| c as f64 / n).collect();
        let mut avg = vec![0.0; module.trait_count()];
        module.avg_scores(&freqs, &mut avg);
        return avg
            .iter()
            .enumerate()
            .fold((0usize, f64::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0;
    }

    let role_model = reference[rng.index(reference.len())];
    let f_focal = population.fitness[focal];
    let f_model = population.fitness[role_model];

    let p = match policy {
        PlayerUpdate::Thermal => {
            let sigma = if noise <= 0.0 { 1e-12 } else { noise };
            1.0 / (1.0 + (-(f_model - f_focal) / sigma).exp())
        }
        PlayerUpdate::Best => {
            if f_model > f_focal {
                1.0
            } else {
                0.0
            }
        }
        PlayerUpdate::Imitate | PlayerUpdate::ImitateBetter => {
            let halving = if policy == PlayerUpdate::ImitateBetter { 2.0 } else { 1.0 };
            let sigma = (if noise <= 0.0 { 1e-12 } else { noise }) * halving;
            ((f_model - f_focal) / sigma).clamp(0.0, 1.0)
        }
        PlayerUpdate::Proportional => {
            let denom = f_focal + f_model;
            if denom.abs() > f64::EPSILON {
                f_model / denom
            } else {
                0.5
            }
        }
        PlayerUpdate::Random | PlayerUpdate::BestResponse => unreachable!("handled above"),
    };

    if rng.bernoulli(p) {
        population.traits[role_model]
    } else {
        population.traits[focal]
    }
}

/// Steps 3-6 of one asynchronous event (§4.5): pick the focal, play its
/// interaction or ecology event, commit the trait-revision decision, then migrate.
/// Shared by the single-species [`async_event`] and [`async_event_multi_species`],
/// which differ only in how the clocks advance and which species gets the turn.
fn play_one_event(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, noise: f64, rng: &mut EvoRng) {
    let focal = pick_focal(module.population_update(), population, rng);

    if let Some(vacant) = module.vacant() {
        ecology_event(module, geometry, population, config, focal, vacant, module.death_rate(), rng);
    } else {
        play_interaction(module, geometry, population, config, focal, rng);
        let reference = config.reference_sampler.sample(geometry, focal, rng);
        let new_trait = choose_next_trait(module, population, focal, &reference, noise, rng);
        if new_trait != population.traits[focal] {
            population.traits[focal] = new_trait;
            if config.score_reset == ScoreReset::OnChange {
                population.score[focal] = 0.0;
                population.interactions[focal] = 0;
            }
            refresh_static_fitness(module, population, focal);
        }
    }

    migration::apply(config.migration_kind, config.migration_rate, geometry, population, rng);
}

/// One asynchronous event (§4.5 steps 2-6) for a single species.
pub fn async_event(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, update_rate: f64, noise: f64, rng: &mut EvoRng, clock: &mut IbsClock) {
    let n = population.size().max(1) as f64;
    let scaled_fitness = (population.total_fitness() * update_rate).max(f64::EPSILON);
    clock.realtime += 1.0 / (scaled_fitness * scaled_fitness);
    clock.generation += 1.0 / (n * update_rate.max(f64::EPSILON));

    play_one_event(module, geometry, population, config, noise, rng);
}

/// Multi-species focal-*species* selection (§4.5 step 1, `--speciesupdate`): picks
/// which species' turn it is (`SIZE`/`FITNESS` weight by size or total fitness
/// scaled by the species' own update rate; `TURNS` round-robins), then plays one
/// event for that species alone. The two clocks advance using the aggregate
/// `Σ totalFitness·r` / `Σ N·r` across every species, so a multi-species run's
/// realtime and generation clocks stay comparable to the single-species formula
/// they generalise.
#[allow(clippy::too_many_arguments)]
pub fn async_event_multi_species(
    modules: &[&dyn Module],
    geometries: &[&Geometry],
    populations: &mut [IbsPopulation],
    configs: &[IbsConfig],
    select: SpeciesSelect,
    noise: f64,
    rng: &mut EvoRng,
    clock: &mut IbsClock,
    turn: &mut usize,
) {
    let update_rates: Vec<f64> = modules.iter().map(|m| m.update_rate()).collect();

    let total_fitness_rate: f64 = populations
        .iter()
        .zip(&update_rates)
        .map(|(p, &r)| p.total_fitness() * r)
        .sum::<f64>()
        .max(f64::EPSILON);
    let total_size_rate: f64 = populations
        .iter()
        .zip(&update_rates)
        .map(|(p, &r)| p.size() as f64 * r)
        .sum::<f64>()
        .max(f64::EPSILON);
    clock.realtime += 1.0 / (total_fitness_rate * total_fitness_rate);
    clock.generation += 1.0 / total_size_rate;

    let species = pick_focal_species(select, populations, &update_rates, rng, turn);
    play_one_event(modules[species], geometries[species], &mut populations[species], &configs[species], noise, rng);
}

/// Choose which species gets the next turn (§4.5 step 1).
fn pick_focal_species(select: SpeciesSelect, populations: &[IbsPopulation], update_rates: &[f64], rng: &mut EvoRng, turn: &mut usize) -> usize {
    match select {
        SpeciesSelect::Turns => {
            let n = populations.len().max(1);
            let species = *turn % n;
            *turn = (*turn + 1) % n;
            species
        }
        SpeciesSelect::Size => {
            let weights: Vec<f64> = populations.iter().zip(update_rates).map(|(p, &r)| p.size() as f64 * r).collect();
            weighted_index(&weights, rng)
        }
        SpeciesSelect::Fitness => {
            let weights: Vec<f64> = populations.iter().zip(update_rates).map(|(p, &r)| p.total_fitness() * r).collect();
            weighted_index(&weights, rng)
        }
    }
}

/// ECOLOGY population-update (§4.2, §4.5): the focal site either dies (rate `d`) or
/// gives birth into a random neighbour's site proportional to local fitness and the
/// fraction of vacant neighbours, mirroring the ODE ecology derivative at the
/// individual level.
fn ecology_event(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, focal: usize, vacant: usize, death_rate: f64, rng: &mut EvoRng) {
    if population.traits[focal] == vacant {
        return;
    }
    if rng.bernoulli(death_rate.clamp(0.0, 1.0)) {
        population.traits[focal] = vacant;
        refresh_static_fitness(module, population, focal);
        return;
    }
    play_interaction(module, geometry, population, config, focal, rng);
    if let Some(target) = geometry.random_out_neighbour(focal, rng) {
        if population.traits[target] == vacant {
            population.traits[target] = population.traits[focal];
            refresh_static_fitness(module, population, target);
        }
    }
}

/// Synchronous mode (§4.5): every site in a `syncFraction`-sized random subset
/// computes its next trait from the *current* neighbourhood; commits happen only
/// after the whole subset has been evaluated.
pub fn sync_step(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, fraction: f64, noise: f64, rng: &mut EvoRng) {
    recompute_population_scores(module, geometry, population, config, rng);

    let n = population.size();
    let n_updates = ((n as f64) * fraction.clamp(0.0, 1.0)).round().max(1.0) as usize;
    let mut sites: Vec<usize> = (0..n).collect();
    for i in 0..n_updates.min(n) {
        let j = i + rng.index(n - i);
        sites.swap(i, j);
    }
    population.traits_next.copy_from_slice(&population.traits);
    for &site in sites.iter().take(n_updates) {
        let reference = config.reference_sampler.sample(geometry, site, rng);
        population.traits_next[site] = choose_next_trait(module, population, site, &reference, noise, rng);
    }
    population.commit();
    apply_static_fitness(module, population);
    migration::apply(config.migration_kind, config.migration_rate, geometry, population, rng);
}

/// Wright-Fisher (§4.5): a specialisation of synchronous update where every site
/// samples a parent with probability proportional to fitness.
pub fn wright_fisher_step(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, rng: &mut EvoRng) {
    recompute_population_scores(module, geometry, population, config, rng);
    for site in 0..population.size() {
        let parent = weighted_index(&population.fitness, rng);
        population.traits_next[site] = population.traits[parent];
    }
    population.commit();
    apply_static_fitness(module, population);
}

fn recompute_population_scores(module: &dyn Module, geometry: &Geometry, population: &mut IbsPopulation, config: &IbsConfig, rng: &mut EvoRng) {
    if apply_static_fitness(module, population) {
        return;
    }
    population.reset_scores();
    let n = population.size();
    for node in 0..n {
        let opponents = config.interaction_sampler.sample(geometry, node, rng);
        if opponents.is_empty() {
            continue;
        }
        let my_trait = population.traits[node];
        let opp_traits: Vec<usize> = opponents.iter().map(|&o| population.traits[o]).collect();
        let mut opp_scores = vec![0.0; opp_traits.len()];
        let total = interaction_scores(module, my_trait, &opp_traits, &mut opp_scores);
        population.score[node] += total;
        population.interactions[node] += 1;
    }
    let map = module.fitness_map();
    for i in 0..n {
        let raw = raw_score(population, i, config.score_reset);
        population.map_to_fitness(i, raw, map);
    }
}

/// Homogeneous-population fast path (`optimizeHomo`, §4.5): while every site shares
/// a trait and mutation is rare (`< 0.1/N`), skip ahead by a geometrically
/// distributed waiting time to the next mutation event rather than simulating each
/// non-event. Returns the number of generations skipped, or `None` if the
/// optimisation does not apply.
pub fn homogeneous_fast_path(population: &IbsPopulation, mutation_rate: f64, optimize_homo: bool, clock: &mut IbsClock, rng: &mut EvoRng) -> Option<u64> {
    let n = population.size().max(1);
    if !optimize_homo || !population.is_homogeneous() || mutation_rate >= 0.1 / n as f64 {
        return None;
    }
    let skip = rng.geometric(mutation_rate);
    clock.generation += skip as f64 / n as f64;
    Some(skip)
}
