//! Agents and the errand state machine that drives them through a day.
//!
//! Each day an agent works through its task queue front to back:
//!
//! ```text
//! Idle -> Traveling -> Performing -> Done -> (next task | HeadingHome) -> AtHome -> Idle
//! ```
//!
//! Travel and performance are suspensions on the simulated clock. Travel polls
//! the navigation port until it reports arrival; performance waits out the
//! task's duration with movement switched off. When the queue is empty the
//! agent walks home, resolves the day's disease outcome and reports the day
//! complete to the population manager.
//!
//! A task whose location has no reachable point is dropped on the spot (no
//! movement is commanded) so that one bad errand can never stall the day.
//!
//! Dead agents stay on the roster but never move or process tasks again.
use std::collections::VecDeque;
use std::fmt::{self, Display};

use serde::Serialize;

use crate::context::{Context, WaitId};
use crate::disease::{resolve_daily_outcome, Condition, DailyOutcome, DiseaseState};
use crate::error::OutbreakError;
use crate::navigation::ContextNavigationExt;
use crate::outbreak_reports::record_outcome;
use crate::population::{signal_day_complete, ContextPopulationExt, DayComplete};
use crate::presentation::{AgentStatus, ContextPresentationExt, DisplayInfo, InfectionState};
use crate::random::ContextRandomExt;
use crate::task::Task;
use crate::world::{ContextWorldExt, LocationId, Point};
use crate::{debug, define_data_plugin, define_rng, trace, warn};

define_rng!(DeathRng);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AgentId(pub usize);

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AgentPhase {
    Idle,
    Traveling,
    Performing,
    /// Finished the front task; moves on to the next one or home.
    Done,
    HeadingHome,
    AtHome,
    Dead,
}

#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    name: String,
    home: LocationId,
    disease: DiseaseState,
    conditions: Vec<Condition>,
    death_chance: f64,
    tasks: VecDeque<Task>,
    heading_home: bool,
    phase: AgentPhase,
    // The travel or performance wait the agent is suspended on, if any.
    pending_wait: Option<WaitId>,
}

impl Agent {
    #[must_use]
    pub fn new(
        id: AgentId,
        name: String,
        home: LocationId,
        disease: DiseaseState,
        conditions: Vec<Condition>,
        death_chance: f64,
    ) -> Agent {
        let phase = if disease.is_dead() {
            AgentPhase::Dead
        } else {
            AgentPhase::Idle
        };
        Agent {
            id,
            name,
            home,
            disease,
            conditions,
            death_chance,
            tasks: VecDeque::new(),
            heading_home: false,
            phase,
            pending_wait: None,
        }
    }

    /// Replaces the task queue wholesale and clears yesterday's trip home.
    pub fn initialize_day(&mut self, tasks: Vec<Task>) {
        self.tasks = VecDeque::from(tasks);
        self.heading_home = false;
        self.phase = AgentPhase::Idle;
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn home(&self) -> LocationId {
        self.home
    }

    #[must_use]
    pub fn disease(&self) -> &DiseaseState {
        &self.disease
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn death_chance(&self) -> f64 {
        self.death_chance
    }

    #[must_use]
    pub fn tasks(&self) -> &VecDeque<Task> {
        &self.tasks
    }

    #[must_use]
    pub fn is_heading_home(&self) -> bool {
        self.heading_home
    }

    #[must_use]
    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.disease.is_infected()
    }

    #[must_use]
    pub fn is_immune(&self) -> bool {
        self.disease.is_immune()
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.disease.is_dead()
    }

    #[must_use]
    pub fn days_with_disease(&self) -> u32 {
        self.disease.days_with_disease()
    }

    #[must_use]
    pub fn display_info(&self) -> DisplayInfo {
        DisplayInfo {
            name: self.name.clone(),
            infection_state: InfectionState::from(&self.disease),
            days_with_disease: self.disease.days_with_disease(),
            conditions: self.conditions.clone(),
        }
    }
}

define_data_plugin!(AgentsPlugin, Vec<Agent>, Vec::new());

/// What the next step of an agent's day is, decided from its current state.
enum NextStep {
    DropFinishedTask,
    StartTask(Task),
    Wait,
    GoHome,
}

pub trait ContextAgentsExt {
    /// Adds an agent to the roster. Its id must be the next free index.
    ///
    /// # Errors
    ///
    /// `StateError` if the id is not the next index.
    fn add_agent(&mut self, agent: Agent) -> Result<AgentId, OutbreakError>;

    fn agent(&self, id: AgentId) -> Option<&Agent>;

    fn agents(&self) -> &[Agent];

    /// Inspection data for a presentation layer.
    fn agent_info(&self, id: AgentId) -> Option<DisplayInfo>;

    /// Loads a fresh task queue and queues the first drive of the day. Dead
    /// agents are left untouched.
    fn start_agent_day(&mut self, id: AgentId, tasks: Vec<Task>);

    /// Advances the agent's state machine until it hits a suspension point.
    fn drive_agent(&mut self, id: AgentId);

    /// Forgets any in-flight waits and returns the agent to `Idle` with an
    /// empty queue.
    fn abandon_agent(&mut self, id: AgentId);
}

impl ContextAgentsExt for Context {
    fn add_agent(&mut self, agent: Agent) -> Result<AgentId, OutbreakError> {
        let agents = self.get_data_mut(AgentsPlugin);
        if agent.id.0 != agents.len() {
            return Err(OutbreakError::StateError(format!(
                "agent id {} is not the next free id {}",
                agent.id,
                agents.len()
            )));
        }
        let id = agent.id;
        agents.push(agent);
        Ok(id)
    }

    fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.get_data(AgentsPlugin)
            .and_then(|agents| agents.get(id.0))
    }

    fn agents(&self) -> &[Agent] {
        self.get_data(AgentsPlugin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn agent_info(&self, id: AgentId) -> Option<DisplayInfo> {
        self.agent(id).map(Agent::display_info)
    }

    fn start_agent_day(&mut self, id: AgentId, tasks: Vec<Task>) {
        let Some(agent) = agent_mut(self, id) else {
            return;
        };
        if agent.is_dead() {
            return;
        }
        trace!("agent {id} starts the day with {} tasks", tasks.len());
        agent.initialize_day(tasks);
        if self.has_navigator() {
            self.set_movement_enabled(id, true);
        }
        self.queue_callback(move |context| context.drive_agent(id));
    }

    fn drive_agent(&mut self, id: AgentId) {
        loop {
            let Some(agent) = self.agent(id) else {
                return;
            };
            if agent.is_dead() {
                return;
            }
            let next_step = match agent.tasks.front() {
                Some(task) if task.is_done => NextStep::DropFinishedTask,
                Some(task) if !task.en_route => NextStep::StartTask(task.clone()),
                Some(_) => NextStep::Wait,
                None if agent.heading_home => NextStep::Wait,
                None => NextStep::GoHome,
            };

            match next_step {
                NextStep::DropFinishedTask => {
                    if let Some(agent) = agent_mut(self, id) {
                        agent.tasks.pop_front();
                    }
                }
                NextStep::StartTask(task) => {
                    if begin_travel(self, id, &task) {
                        return;
                    }
                }
                NextStep::Wait => return,
                NextStep::GoHome => {
                    head_home(self, id);
                    return;
                }
            }
        }
    }

    fn abandon_agent(&mut self, id: AgentId) {
        let Some(agent) = agent_mut(self, id) else {
            return;
        };
        let pending_wait = agent.pending_wait.take();
        agent.tasks.clear();
        agent.heading_home = false;
        if !agent.is_dead() {
            agent.phase = AgentPhase::Idle;
        }
        if let Some(wait) = pending_wait {
            self.cancel_wait(wait);
        }
        trace!("agent {id} abandoned its day");
    }
}

fn agent_mut(context: &mut Context, id: AgentId) -> Option<&mut Agent> {
    context.get_data_mut(AgentsPlugin).get_mut(id.0)
}

/// The living agent, with its finished wait cleared.
fn resumed_agent(context: &mut Context, id: AgentId) -> Option<&mut Agent> {
    let agent = agent_mut(context, id)?;
    agent.pending_wait = None;
    (!agent.is_dead()).then_some(agent)
}

fn suspend_on(context: &mut Context, id: AgentId, wait: WaitId) {
    if let Some(agent) = agent_mut(context, id) {
        agent.pending_wait = Some(wait);
    }
}

fn entry_point(context: &Context, location: LocationId) -> Option<Point> {
    context.world().location(location).map(|location| location.entry)
}

fn reachable_point_near(context: &mut Context, location: LocationId) -> Option<Point> {
    let target = entry_point(context, location)?;
    let search_radius = context.day_settings().search_radius;
    context.find_reachable_point(target, search_radius)
}

/// Commands travel to the task's location. Returns false if the location is
/// unreachable, in which case the task has been dropped.
fn begin_travel(context: &mut Context, id: AgentId, task: &Task) -> bool {
    let Some(point) = reachable_point_near(context, task.location) else {
        let failure = OutbreakError::NavigationFailure {
            agent: id,
            location: task.location,
        };
        warn!("{failure}; skipping task");
        if let Some(task) = agent_mut(context, id).and_then(|agent| agent.tasks.front_mut()) {
            task.abandon();
        }
        return false;
    };

    context.command_move_to(id, point);
    if let Some(agent) = agent_mut(context, id) {
        agent.phase = AgentPhase::Traveling;
        if let Some(task) = agent.tasks.front_mut() {
            task.en_route = true;
        }
    }
    context.notify_status(id, AgentStatus::TaskEnroute);

    let poll_interval = context.day_settings().arrival_poll_interval;
    let wait = context.wait_until(
        poll_interval,
        move |context| context.is_at_destination(id),
        move |context| arrived_at_task(context, id),
    );
    suspend_on(context, id, wait);
    true
}

fn arrived_at_task(context: &mut Context, id: AgentId) {
    let Some(agent) = resumed_agent(context, id) else {
        return;
    };
    let Some(task) = agent.tasks.front_mut() else {
        return;
    };
    task.in_progress = true;
    let duration = task.duration;
    agent.phase = AgentPhase::Performing;
    trace!("agent {id} arrived, performing for {duration}");

    context.set_movement_enabled(id, false);
    context.notify_status(id, AgentStatus::TaskPerforming);
    let wait = context.wait_for(duration, move |context| finished_task(context, id));
    suspend_on(context, id, wait);
}

fn finished_task(context: &mut Context, id: AgentId) {
    let Some(agent) = resumed_agent(context, id) else {
        return;
    };
    if let Some(task) = agent.tasks.front_mut() {
        task.in_progress = false;
        task.is_done = true;
    }
    agent.phase = AgentPhase::Done;
    context.set_movement_enabled(id, true);
    context.drive_agent(id);
}

fn head_home(context: &mut Context, id: AgentId) {
    let Some(agent) = agent_mut(context, id) else {
        return;
    };
    agent.heading_home = true;
    agent.phase = AgentPhase::HeadingHome;
    let home = agent.home;

    context.set_movement_enabled(id, true);
    context.notify_status(id, AgentStatus::HeadingHome);

    let wait = match reachable_point_near(context, home) {
        Some(point) => {
            context.command_move_to(id, point);
            let poll_interval = context.day_settings().arrival_poll_interval;
            context.wait_until(
                poll_interval,
                move |context| context.is_at_destination(id),
                move |context| arrived_home(context, id),
            )
        }
        None => {
            warn!("agent {id} has no reachable point near home {home}; treating it as home");
            context.wait_for(0.0, move |context| arrived_home(context, id))
        }
    };
    suspend_on(context, id, wait);
}

fn arrived_home(context: &mut Context, id: AgentId) {
    if resumed_agent(context, id).is_none() {
        return;
    }
    let incubation_period = context.day_settings().incubation_period;
    let needs_roll = context.agent(id).is_some_and(Agent::is_infected);
    let r = if needs_roll {
        context.sample_unit(DeathRng)
    } else {
        1.0
    };

    let Some(agent) = agent_mut(context, id) else {
        return;
    };
    agent.phase = AgentPhase::AtHome;
    let death_chance = agent.death_chance;
    let outcome = resolve_daily_outcome(&mut agent.disease, death_chance, incubation_period, r);
    let died = outcome == DailyOutcome::Died;
    agent.phase = if died {
        AgentPhase::Dead
    } else {
        AgentPhase::Idle
    };

    match outcome {
        DailyOutcome::Died => debug!("agent {id} died"),
        DailyOutcome::BecameImmune => debug!("agent {id} is now immune"),
        DailyOutcome::Survived { days_with_disease } => {
            trace!("agent {id} has been sick for {days_with_disease} days");
        }
        DailyOutcome::Unaffected => {}
    }
    if died {
        context.set_movement_enabled(id, false);
    }
    record_outcome(context, id, outcome);
    context.notify_status(id, AgentStatus::Cleared);
    signal_day_complete(context, DayComplete { agent: id, died });
}
