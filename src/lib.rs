//! A discrete-event simulation of townsfolk running daily errands while a
//! contagious disease works its way through them.
//!
//! The central object of a simulation is the [`Context`], which owns the
//! simulated clock and every piece of model state. Model logic lives in
//! modules that extend the `Context` through traits:
//! * [`ContextWorldExt`] holds the map of homes and errand sites.
//! * [`ContextNavigationExt`] wraps the navigation port that moves agents.
//! * [`ContextAgentsExt`] drives each agent through its
//!   travel / perform / return-home routine.
//! * [`ContextPopulationExt`] builds the roster and holds the day barrier:
//!   a new day only starts once every living agent has reported home.
//!
//! A typical run looks like:
//!
//! ```no_run
//! use outbreak::prelude::*;
//!
//! fn main() -> Result<(), OutbreakError> {
//!     let mut context = Context::new();
//!     let parameters = Parameters::default();
//!     context.init_random(parameters.seed);
//!
//!     let world = World::grid_town(4, 6, 25.0);
//!     let homes = world.homes();
//!     let navigator = StraightLineNavigator::new(world.bounds(), parameters.walk_speed);
//!     context.set_world(world);
//!     context.set_navigator(navigator);
//!
//!     context.init_population(&parameters, &homes)?;
//!     context.run_days(parameters.num_days)?;
//!     context.execute();
//!     Ok(())
//! }
//! ```
pub mod agent;
pub mod context;
pub mod data_plugin;
pub mod disease;
pub mod error;
pub mod hashing;
pub mod log;
pub mod navigation;
pub mod outbreak_reports;
pub mod parameters;
pub mod plan;
pub mod population;
pub mod presentation;
pub mod random;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod task;
pub mod world;

pub use crate::log::{debug, error, info, trace, warn, LevelFilter};
pub use agent::{Agent, AgentId, AgentPhase, ContextAgentsExt};
pub use context::{Context, WaitId};
pub use data_plugin::DataPlugin;
pub use disease::{AdditiveRisk, Condition, DailyOutcome, DeathChanceModel, DiseaseState};
pub use error::OutbreakError;
pub use hashing::{HashMap, HashMapExt, HashSet, HashSetExt};
pub use navigation::{ContextNavigationExt, NavigationPort, StraightLineNavigator};
pub use parameters::{ContextParametersExt, ParameterForm, Parameters};
pub use outbreak_reports::{ContextOutbreakReportsExt, DayReport, Outcome, OutcomeReport};
pub use plan::{ExecutionPhase, PlanId};
pub use population::{Census, ContextPopulationExt, DayComplete, DaySettings};
pub use presentation::{
    AgentStatus, ContextPresentationExt, DisplayInfo, InfectionState, LogPresenter,
    PresentationPort,
};
pub use random::{ContextRandomExt, RngId};
pub use report::{ConfigReportOptions, ContextReportExt, Report};
pub use runner::{run_with_args, run_with_custom_args, BaseArgs};
pub use schedule::{ContextScheduleExt, RandomErrands, ScheduleGenerator};
pub use task::Task;
pub use world::{ContextWorldExt, Location, LocationId, LocationKind, Point, Rect, World};

// Re-exports used by the exported macros.
pub use csv;
pub use paste;
pub use rand;

pub mod prelude {
    pub use crate::agent::{Agent, AgentId, AgentPhase, ContextAgentsExt};
    pub use crate::context::Context;
    pub use crate::disease::{Condition, DiseaseState};
    pub use crate::error::OutbreakError;
    pub use crate::navigation::{ContextNavigationExt, NavigationPort, StraightLineNavigator};
    pub use crate::parameters::{ContextParametersExt, ParameterForm, Parameters};
    pub use crate::outbreak_reports::ContextOutbreakReportsExt;
    pub use crate::plan::ExecutionPhase;
    pub use crate::population::{Census, ContextPopulationExt};
    pub use crate::presentation::{AgentStatus, ContextPresentationExt, PresentationPort};
    pub use crate::random::ContextRandomExt;
    pub use crate::report::ContextReportExt;
    pub use crate::runner::{run_with_args, BaseArgs};
    pub use crate::schedule::{ContextScheduleExt, ScheduleGenerator};
    pub use crate::task::Task;
    pub use crate::world::{ContextWorldExt, LocationId, Point, World};
    pub use crate::{define_data_plugin, define_report, define_rng};
}
