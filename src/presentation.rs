//! Status indicators for whatever is displaying the simulation.
//!
//! Statuses are presentation only; nothing in the simulation reads them
//! back. Without a presenter installed they go to the log at debug level.
use std::fmt::{self, Display};

use serde::Serialize;

use crate::agent::AgentId;
use crate::context::Context;
use crate::disease::{Condition, DiseaseState};
use crate::{debug, define_data_plugin};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AgentStatus {
    TaskEnroute,
    TaskPerforming,
    HeadingHome,
    Cleared,
}

impl Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            AgentStatus::TaskEnroute => "task-enroute",
            AgentStatus::TaskPerforming => "task-performing",
            AgentStatus::HeadingHome => "heading-home",
            AgentStatus::Cleared => "cleared",
        };
        f.write_str(label)
    }
}

/// Coarse infection state shown to the user.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InfectionState {
    Susceptible,
    Infected,
    Immune,
    Dead,
}

impl From<&DiseaseState> for InfectionState {
    fn from(state: &DiseaseState) -> Self {
        match state {
            DiseaseState::Susceptible => InfectionState::Susceptible,
            DiseaseState::Infected { .. } => InfectionState::Infected,
            DiseaseState::Immune => InfectionState::Immune,
            DiseaseState::Dead { .. } => InfectionState::Dead,
        }
    }
}

/// What an inspection panel shows for one agent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayInfo {
    pub name: String,
    pub infection_state: InfectionState,
    pub days_with_disease: u32,
    pub conditions: Vec<Condition>,
}

pub trait PresentationPort {
    fn on_status_changed(&mut self, agent: AgentId, status: AgentStatus);
}

/// Writes status changes to the log.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogPresenter;

impl PresentationPort for LogPresenter {
    fn on_status_changed(&mut self, agent: AgentId, status: AgentStatus) {
        debug!("agent {agent}: {status}");
    }
}

define_data_plugin!(
    PresentationPlugin,
    Box<dyn PresentationPort>,
    Box::new(LogPresenter)
);

pub trait ContextPresentationExt {
    fn set_presenter(&mut self, presenter: impl PresentationPort + 'static);

    fn notify_status(&mut self, agent: AgentId, status: AgentStatus);
}

impl ContextPresentationExt for Context {
    fn set_presenter(&mut self, presenter: impl PresentationPort + 'static) {
        *self.get_data_mut(PresentationPlugin) = Box::new(presenter);
    }

    fn notify_status(&mut self, agent: AgentId, status: AgentStatus) {
        self.get_data_mut(PresentationPlugin)
            .on_status_changed(agent, status);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Recorder(Rc<RefCell<Vec<(AgentId, AgentStatus)>>>);

    impl PresentationPort for Recorder {
        fn on_status_changed(&mut self, agent: AgentId, status: AgentStatus) {
            self.0.borrow_mut().push((agent, status));
        }
    }

    #[test]
    fn statuses_reach_the_installed_presenter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut context = Context::new();
        context.notify_status(AgentId(0), AgentStatus::Cleared);
        context.set_presenter(Recorder(Rc::clone(&seen)));
        context.notify_status(AgentId(1), AgentStatus::HeadingHome);
        assert_eq!(*seen.borrow(), vec![(AgentId(1), AgentStatus::HeadingHome)]);
    }

    #[test]
    fn status_labels() {
        assert_eq!(AgentStatus::TaskEnroute.to_string(), "task-enroute");
        assert_eq!(AgentStatus::Cleared.to_string(), "cleared");
    }

    #[test]
    fn infection_state_from_disease_state() {
        assert_eq!(
            InfectionState::from(&DiseaseState::newly_infected()),
            InfectionState::Infected
        );
        assert_eq!(
            InfectionState::from(&DiseaseState::Dead {
                days_with_disease: 1
            }),
            InfectionState::Dead
        );
    }
}
