//! Disease progression for a single agent.
//!
//! An agent's death chance is fixed when the agent is created, from its
//! infection status and underlying conditions. At the end of every day each
//! living infected agent rolls once against it: below the chance it dies,
//! otherwise it survives another day with the disease, and after
//! `incubation_period` survived days it becomes immune.
//!
//! The roll is passed in as a plain `f64` so callers decide where randomness
//! comes from; the population manager draws it from a seeded generator.
use std::fmt::{self, Display};

use serde::Serialize;

/// Risk factors that raise the chance of dying from the disease.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Condition {
    Asthma,
    Fever,
    Cough,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Condition::Asthma, Condition::Fever, Condition::Cough];
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Condition::Asthma => "asthma",
            Condition::Fever => "fever",
            Condition::Cough => "cough",
        };
        f.write_str(name)
    }
}

/// Where an agent is in the course of the disease.
///
/// Being infected and being immune are separate variants, so an agent can
/// never be both. `Dead` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DiseaseState {
    #[default]
    Susceptible,
    Infected {
        days_with_disease: u32,
    },
    Immune,
    Dead {
        days_with_disease: u32,
    },
}

impl DiseaseState {
    #[must_use]
    pub fn newly_infected() -> DiseaseState {
        DiseaseState::Infected {
            days_with_disease: 0,
        }
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        matches!(self, DiseaseState::Infected { .. })
    }

    #[must_use]
    pub fn is_immune(&self) -> bool {
        matches!(self, DiseaseState::Immune)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        matches!(self, DiseaseState::Dead { .. })
    }

    #[must_use]
    pub fn days_with_disease(&self) -> u32 {
        match self {
            DiseaseState::Infected { days_with_disease }
            | DiseaseState::Dead { days_with_disease } => *days_with_disease,
            DiseaseState::Susceptible | DiseaseState::Immune => 0,
        }
    }
}

/// What happened to an agent at the end of a day.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DailyOutcome {
    /// Not infected (or already dead); nothing to resolve.
    Unaffected,
    Died,
    /// Survived another day with the disease.
    Survived { days_with_disease: u32 },
    BecameImmune,
}

/// Resolves one day of disease for an agent, given a uniform draw `r` in
/// [0, 1). Death happens only when `r < death_chance`.
pub fn resolve_daily_outcome(
    state: &mut DiseaseState,
    death_chance: f64,
    incubation_period: u32,
    r: f64,
) -> DailyOutcome {
    let DiseaseState::Infected { days_with_disease } = *state else {
        return DailyOutcome::Unaffected;
    };

    if r < death_chance {
        *state = DiseaseState::Dead { days_with_disease };
        return DailyOutcome::Died;
    }

    let days_with_disease = days_with_disease + 1;
    if days_with_disease == incubation_period {
        *state = DiseaseState::Immune;
        DailyOutcome::BecameImmune
    } else {
        *state = DiseaseState::Infected { days_with_disease };
        DailyOutcome::Survived { days_with_disease }
    }
}

/// A strategy for an agent's daily chance of dying while infected.
pub trait DeathChanceModel {
    /// Must return a value in [0, 1].
    fn death_chance(&self, state: &DiseaseState, conditions: &[Condition]) -> f64;
}

/// Base rate plus a fixed risk per underlying condition, clamped to [0, 1].
/// Agents that are not infected get zero.
#[derive(Clone, Debug, PartialEq)]
pub struct AdditiveRisk {
    pub base_rate: f64,
    pub asthma: f64,
    pub fever: f64,
    pub cough: f64,
}

impl Default for AdditiveRisk {
    fn default() -> Self {
        AdditiveRisk {
            base_rate: 0.0,
            asthma: 0.04,
            fever: 0.02,
            cough: 0.01,
        }
    }
}

impl AdditiveRisk {
    fn risk_of(&self, condition: Condition) -> f64 {
        match condition {
            Condition::Asthma => self.asthma,
            Condition::Fever => self.fever,
            Condition::Cough => self.cough,
        }
    }
}

impl DeathChanceModel for AdditiveRisk {
    fn death_chance(&self, state: &DiseaseState, conditions: &[Condition]) -> f64 {
        if !state.is_infected() {
            return 0.0;
        }
        let total = conditions
            .iter()
            .fold(self.base_rate, |risk, condition| risk + self.risk_of(*condition));
        total.clamp(0.0, 1.0)
    }
}

/// Every infected agent has the same chance regardless of conditions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FixedRisk(pub f64);

impl DeathChanceModel for FixedRisk {
    fn death_chance(&self, state: &DiseaseState, _conditions: &[Condition]) -> f64 {
        if state.is_infected() {
            self.0.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn zero_draw_kills_when_chance_is_positive() {
        let mut state = DiseaseState::newly_infected();
        let outcome = resolve_daily_outcome(&mut state, 0.01, 5, 0.0);
        assert_eq!(outcome, DailyOutcome::Died);
        assert!(state.is_dead());
        assert!(!state.is_infected());
    }

    #[test]
    fn high_draw_never_kills() {
        let mut state = DiseaseState::newly_infected();
        let outcome = resolve_daily_outcome(&mut state, 0.99, 5, 0.999_999);
        assert_eq!(
            outcome,
            DailyOutcome::Survived {
                days_with_disease: 1
            }
        );
    }

    #[test]
    fn draw_equal_to_chance_survives() {
        let mut state = DiseaseState::newly_infected();
        let outcome = resolve_daily_outcome(&mut state, 0.25, 5, 0.25);
        assert_ne!(outcome, DailyOutcome::Died);
        assert!(state.is_infected());
    }

    #[test]
    fn immune_after_exactly_the_incubation_period() {
        let incubation_period = 5;
        let mut state = DiseaseState::newly_infected();
        for day in 1..incubation_period {
            let outcome = resolve_daily_outcome(&mut state, 0.0, incubation_period, 0.5);
            assert_eq!(
                outcome,
                DailyOutcome::Survived {
                    days_with_disease: day
                }
            );
            assert!(state.is_infected() && !state.is_immune());
        }
        let outcome = resolve_daily_outcome(&mut state, 0.0, incubation_period, 0.5);
        assert_eq!(outcome, DailyOutcome::BecameImmune);
        assert!(state.is_immune() && !state.is_infected());

        // Immunity is stable.
        assert_eq!(
            resolve_daily_outcome(&mut state, 1.0, incubation_period, 0.0),
            DailyOutcome::Unaffected
        );
        assert!(state.is_immune());
    }

    #[test]
    fn zero_incubation_period_never_grants_immunity() {
        let mut state = DiseaseState::newly_infected();
        for day in 1..=3 {
            assert_eq!(
                resolve_daily_outcome(&mut state, 0.0, 0, 0.5),
                DailyOutcome::Survived {
                    days_with_disease: day
                }
            );
        }
        assert!(state.is_infected());
    }

    #[test]
    fn uninfected_and_dead_agents_are_untouched() {
        for mut state in [
            DiseaseState::Susceptible,
            DiseaseState::Immune,
            DiseaseState::Dead {
                days_with_disease: 2,
            },
        ] {
            let before = state;
            assert_eq!(
                resolve_daily_outcome(&mut state, 1.0, 5, 0.0),
                DailyOutcome::Unaffected
            );
            assert_eq!(state, before);
        }
    }

    #[test]
    fn death_keeps_the_day_count() {
        let mut state = DiseaseState::Infected {
            days_with_disease: 3,
        };
        resolve_daily_outcome(&mut state, 0.5, 5, 0.1);
        assert_eq!(state.days_with_disease(), 3);
    }

    #[test]
    fn additive_risk_sums_conditions() {
        let model = AdditiveRisk::default();
        let infected = DiseaseState::newly_infected();
        assert_approx_eq!(model.death_chance(&infected, &[]), 0.0);
        assert_approx_eq!(
            model.death_chance(&infected, &[Condition::Asthma, Condition::Cough]),
            0.05
        );
        assert_approx_eq!(
            model.death_chance(&DiseaseState::Susceptible, &Condition::ALL),
            0.0
        );
    }

    #[test]
    fn additive_risk_is_clamped() {
        let model = AdditiveRisk {
            base_rate: 0.9,
            asthma: 0.5,
            ..AdditiveRisk::default()
        };
        let infected = DiseaseState::newly_infected();
        assert_approx_eq!(model.death_chance(&infected, &[Condition::Asthma]), 1.0);
    }

    #[test]
    fn fixed_risk_ignores_conditions() {
        let infected = DiseaseState::newly_infected();
        assert_approx_eq!(FixedRisk(0.3).death_chance(&infected, &Condition::ALL), 0.3);
        assert_approx_eq!(FixedRisk(0.3).death_chance(&DiseaseState::Immune, &[]), 0.0);
    }
}
