//! The two CSV reports a run can produce: a census at the end of every day,
//! and one row per agent that dies or becomes immune.
//!
//! Both are optional. Rows for a report that was never added are skipped.
use serde_derive::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::context::Context;
use crate::disease::DailyOutcome;
use crate::error::OutbreakError;
use crate::population::{Census, ContextPopulationExt};
use crate::report::ContextReportExt;
use crate::{define_report, error};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub day: u32,
    pub time: f64,
    pub susceptible: usize,
    pub infected: usize,
    pub immune: usize,
    pub dead: usize,
}

define_report!(DayReport);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Died,
    Immune,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub day: u32,
    pub time: f64,
    pub agent_id: usize,
    pub outcome: Outcome,
}

define_report!(OutcomeReport);

pub trait ContextOutbreakReportsExt {
    /// Adds `day_census.csv` and `outcomes.csv` using the current report
    /// options.
    ///
    /// # Errors
    ///
    /// Any error from [`ContextReportExt::add_report`].
    fn add_outbreak_reports(&mut self) -> Result<(), OutbreakError>;
}

impl ContextOutbreakReportsExt for Context {
    fn add_outbreak_reports(&mut self) -> Result<(), OutbreakError> {
        self.add_report::<DayReport>("day_census")?;
        self.add_report::<OutcomeReport>("outcomes")?;
        Ok(())
    }
}

pub(crate) fn record_day_census(context: &Context, day: u32, census: Census) {
    if !context.has_report::<DayReport>() {
        return;
    }
    let row = DayReport {
        day,
        time: context.get_current_time(),
        susceptible: census.susceptible,
        infected: census.infected,
        immune: census.immune,
        dead: census.dead,
    };
    if let Err(err) = context.send_report(row) {
        error!("failed to write day census: {err}");
    }
}

pub(crate) fn record_outcome(context: &Context, agent: AgentId, outcome: DailyOutcome) {
    let outcome = match outcome {
        DailyOutcome::Died => Outcome::Died,
        DailyOutcome::BecameImmune => Outcome::Immune,
        DailyOutcome::Unaffected | DailyOutcome::Survived { .. } => return,
    };
    if !context.has_report::<OutcomeReport>() {
        return;
    }
    let row = OutcomeReport {
        day: context.current_day(),
        time: context.get_current_time(),
        agent_id: agent.0,
        outcome,
    };
    if let Err(err) = context.send_report(row) {
        error!("failed to write outcome for agent {agent}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::disease::FixedRisk;
    use crate::navigation::{ContextNavigationExt, StraightLineNavigator};
    use crate::parameters::Parameters;
    use crate::random::ContextRandomExt;
    use crate::world::{ContextWorldExt, World};

    fn read_rows<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Vec<T> {
        csv::Reader::from_path(path)
            .unwrap()
            .deserialize()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn census_and_outcomes_are_written() {
        let temp_dir = tempdir().unwrap();
        let world = World::grid_town(2, 3, 10.0);
        let homes = world.homes();

        let mut context = Context::new();
        context.init_random(17);
        context.set_navigator(StraightLineNavigator::new(world.bounds(), 5.0));
        context.set_world(world);
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf());
        context.add_outbreak_reports().unwrap();

        let parameters = Parameters {
            population_size: 4,
            initial_infected: 1,
            tasks_per_day: 2,
            task_duration: 1,
            condition_prevalence: 0.0,
            ..Parameters::default()
        };
        context
            .init_population_with_model(&parameters, &homes, &FixedRisk(1.0))
            .unwrap();
        context.run_days(2).unwrap();
        context.execute();

        let days: Vec<DayReport> = read_rows(&temp_dir.path().join("day_census.csv"));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, 1);
        assert_eq!((days[0].susceptible, days[0].dead), (3, 1));
        assert_eq!(days[1].day, 2);
        assert!(days[1].time >= days[0].time);

        let outcomes: Vec<OutcomeReport> = read_rows(&temp_dir.path().join("outcomes.csv"));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].outcome, Outcome::Died);
        assert_eq!(outcomes[0].day, 1);
    }

    #[test]
    fn nothing_is_recorded_without_reports() {
        let context = Context::new();
        record_outcome(&context, AgentId(0), DailyOutcome::Died);
        record_day_census(&context, 1, Census::default());
        assert!(!context.has_report::<DayReport>());
    }
}
