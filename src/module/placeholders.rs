//! Ready-made [`Module`](super::Module) implementations -- enough to exercise and test
//! the core without a caller first writing their own payoff function. None of these
//! are meant to be exhaustive; real studies supply their own [`Module`].
use super::{Capability, MutationKind, PlayerUpdate, PopulationUpdate};
use crate::fitness_map::FitnessMap;

/// A two-trait pairwise game parameterised by the classic `R, S, T, P` payoff matrix.
/// Trait `0` is conventionally "cooperate", trait `1` "defect"; snowdrift, prisoner's
/// dilemma, stag hunt and harmony games are all instances of this one struct (§8 #1-2).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoByTwoGame {
    pub r: f64,
    pub s: f64,
    pub t: f64,
    pub p: f64,
    pub player_update: PlayerUpdate,
    pub mutation: MutationKind,
}

impl TwoByTwoGame {
    pub fn new(r: f64, s: f64, t: f64, p: f64) -> Self {
        Self {
            r,
            s,
            t,
            p,
            player_update: PlayerUpdate::Imitate,
            mutation: MutationKind::None,
        }
    }

    pub fn with_player_update(mut self, player_update: PlayerUpdate) -> Self {
        self.player_update = player_update;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationKind) -> Self {
        self.mutation = mutation;
        self
    }

    fn payoff(&self, my_trait: usize, opp_trait: usize) -> f64 {
        match (my_trait, opp_trait) {
            (0, 0) => self.r,
            (0, 1) => self.s,
            (1, 0) => self.t,
            (1, 1) => self.p,
            _ => unreachable!("TwoByTwoGame has exactly two traits"),
        }
    }
}

impl super::Module for TwoByTwoGame {
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
            d_pairs: true,
            c_pairs: true,
            ..Default::default()
        }
    }
    fn player_update(&self) -> PlayerUpdate {
        self.player_update
    }
    fn mutation(&self) -> MutationKind {
        self.mutation
    }
    fn fitness_map(&self) -> FitnessMap {
        let lo = self.r.min(self.s).min(self.t).min(self.p);
        let hi = self.r.max(self.s).max(self.t).max(self.p);
        FitnessMap::from_range(lo, hi, 0.01, 1.0)
    }

    fn pair_scores(&self, my_trait: usize, opp_traits: &[usize], out_scores: &mut [f64]) -> f64 {
        let mut total = 0.0;
        for (opp, slot) in opp_traits.iter().zip(out_scores.iter_mut()) {
            total += self.payoff(my_trait, *opp);
            *slot = self.payoff(*opp, my_trait);
        }
        total
    }

    fn avg_scores(&self, state: &[f64], out_scores: &mut [f64]) {
        for i in 0..2 {
            out_scores[i] = (0..2).map(|j| state[j] * self.payoff(i, j)).sum();
        }
    }
}

/// A static-fitness module for two traits with a constant relative-fitness ratio,
/// used for the Moran birth-death amplifier scenario (§8 #6): trait `0` is the
/// mutant with relative fitness `r`, trait `1` is the resident with fitness `1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoranConstantSelection {
    pub relative_fitness: f64,
    scores: [f64; 2],
}

impl MoranConstantSelection {
    pub fn new(relative_fitness: f64) -> Self {
        Self {
            relative_fitness,
            scores: [relative_fitness, 1.0],
        }
    }
}

impl super::Module for MoranConstantSelection {
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
            static_scores: true,
            ..Default::default()
        }
    }
    fn player_update(&self) -> PlayerUpdate {
        PlayerUpdate::Imitate
    }
    fn population_update(&self) -> PopulationUpdate {
        PopulationUpdate::MoranBirthDeath
    }
    /// Identity map: the static table already holds the fitness values directly
    /// (§3 lifecycle, `reset` composes this onto `static_scores` at the core level;
    /// here the composition is a no-op by construction).
    fn fitness_map(&self) -> FitnessMap {
        FitnessMap::new(0.0, 1.0)
    }
    fn static_scores(&self) -> Option<&[f64]> {
        Some(&self.scores)
    }
    fn pair_scores(&self, _my_trait: usize, _opp_traits: &[usize], _out_scores: &mut [f64]) -> f64 {
        0.0
    }
    fn avg_scores(&self, _state: &[f64], out_scores: &mut [f64]) {
        out_scores[0] = self.relative_fitness;
        out_scores[1] = 1.0;
    }
}

/// A three-trait cyclic pairwise game (rock-paper-scissors), used for the SDE
/// corner-absorption scenario (§8 #3). Trait `i` beats trait `(i+1) % 3`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RockPaperScissors {
    pub win: f64,
    pub lose: f64,
    pub tie: f64,
}

impl Default for RockPaperScissors {
    fn default() -> Self {
        Self {
            win: 1.0,
            lose: -1.0,
            tie: 0.0,
        }
    }
}

impl RockPaperScissors {
    fn payoff(&self, my_trait: usize, opp_trait: usize) -> f64 {
        if my_trait == opp_trait {
            self.tie
        } else if (my_trait + 1) % 3 == opp_trait {
            self.win
        } else {
            self.lose
        }
    }
}

impl super::Module for RockPaperScissors {
    fn trait_count(&self) -> usize {
        3
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
            d_pairs: true,
            c_pairs: true,
            ..Default::default()
        }
    }
    fn player_update(&self) -> PlayerUpdate {
        PlayerUpdate::Imitate
    }
    fn fitness_map(&self) -> FitnessMap {
        FitnessMap::from_range(self.lose.min(self.tie), self.win.max(self.tie), 0.1, 1.0)
    }
    fn pair_scores(&self, my_trait: usize, opp_traits: &[usize], out_scores: &mut [f64]) -> f64 {
        let mut total = 0.0;
        for (opp, slot) in opp_traits.iter().zip(out_scores.iter_mut()) {
            total += self.payoff(my_trait, *opp);
            *slot = self.payoff(*opp, my_trait);
        }
        total
    }
    fn avg_scores(&self, state: &[f64], out_scores: &mut [f64]) {
        for i in 0..3 {
            out_scores[i] = (0..3).map(|j| state[j] * self.payoff(i, j)).sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use approx::assert_relative_eq;

    #[test]
    fn snowdrift_avg_scores_match_hand_computation() {
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let mut out = [0.0; 2];
        game.avg_scores(&[0.5, 0.5], &mut out);
        assert_relative_eq!(out[0], 0.5 * 3.0 + 0.5 * 1.0);
        assert_relative_eq!(out[1], 0.5 * 4.0 + 0.5 * 0.0);
    }

    #[test]
    fn rock_paper_scissors_is_cyclic() {
        let rps = RockPaperScissors::default();
        assert_relative_eq!(rps.payoff(0, 1), 1.0); // rock beats scissors (trait 1)
        assert_relative_eq!(rps.payoff(1, 0), -1.0);
        assert_relative_eq!(rps.payoff(0, 0), 0.0);
    }
}
