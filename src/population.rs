//! The population manager: creates the agents and runs the day cycle.
//!
//! A day starts with [`ContextPopulationExt::advance_day`], which hands every
//! living agent a fresh schedule. Agents report back over a channel once they
//! are home and their disease has been resolved. The day is complete when
//! every agent that was alive at its start has reported, including agents
//! that died on the way home. A new day cannot start before that.
//!
//! A day is closed in the `Last` execution phase of the instant the final
//! agent reports, after everything else scheduled for that time. Closing
//! records the census. `run_days` chains days together: each closed day
//! starts the next at the same simulated time until the requested number of
//! days has run, then shuts the context down.
use std::fmt::{self, Display};
use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::agent::{Agent, AgentId, ContextAgentsExt};
use crate::context::Context;
use crate::disease::{AdditiveRisk, Condition, DeathChanceModel, DiseaseState};
use crate::error::OutbreakError;
use crate::navigation::ContextNavigationExt;
use crate::outbreak_reports::record_day_census;
use crate::plan::ExecutionPhase;
use crate::parameters::{Parameters, DEFAULT_INCUBATION_PERIOD, DEFAULT_SEARCH_RADIUS};
use crate::random::ContextRandomExt;
use crate::schedule::ContextScheduleExt;
use crate::world::{ContextWorldExt, LocationId};
use crate::{
    debug, define_data_plugin, define_rng, error, info, trace, warn, HashSet, HashSetExt,
};

define_rng!(PopulationRng);
define_rng!(ConditionRng);
define_rng!(NameRng);

const GIVEN_NAMES: [&str; 24] = [
    "Ada", "Bea", "Cal", "Dora", "Eli", "Fay", "Gus", "Hana", "Ivo", "June", "Kit", "Lena",
    "Milo", "Nia", "Otto", "Pia", "Quin", "Rosa", "Sami", "Tess", "Uma", "Vic", "Wren", "Yara",
];

const FAMILY_NAMES: [&str; 16] = [
    "Abbott", "Baker", "Castillo", "Dunn", "Ellison", "Fischer", "Garcia", "Holm", "Ibarra",
    "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
];

/// An agent's report that it is home for the day.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DayComplete {
    pub agent: AgentId,
    /// The agent died while resolving this day.
    pub died: bool,
}

/// Head counts by disease state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Census {
    pub susceptible: usize,
    pub infected: usize,
    pub immune: usize,
    pub dead: usize,
}

impl Census {
    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.immune + self.dead
    }
}

impl Display for Census {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "susceptible={} infected={} immune={} dead={}",
            self.susceptible, self.infected, self.immune, self.dead
        )
    }
}

/// The per-day settings agents need while running their errands.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DaySettings {
    pub tasks_per_day: u32,
    pub task_duration: u32,
    pub incubation_period: u32,
    pub search_radius: f64,
    pub arrival_poll_interval: f64,
}

impl From<&Parameters> for DaySettings {
    fn from(parameters: &Parameters) -> Self {
        DaySettings {
            tasks_per_day: parameters.tasks_per_day,
            task_duration: parameters.task_duration,
            incubation_period: parameters.incubation_period,
            search_radius: parameters.search_radius,
            arrival_poll_interval: parameters.arrival_poll_interval,
        }
    }
}

impl Default for DaySettings {
    fn default() -> Self {
        DaySettings {
            tasks_per_day: 0,
            task_duration: 0,
            incubation_period: DEFAULT_INCUBATION_PERIOD,
            search_radius: DEFAULT_SEARCH_RADIUS,
            arrival_poll_interval: 1.0,
        }
    }
}

struct PopulationData {
    settings: Option<DaySettings>,
    homes: Vec<LocationId>,
    day: u32,
    last_completed_day: u32,
    day_in_progress: bool,
    // Agents alive when the current day started.
    required: usize,
    completed: HashSet<AgentId>,
    sender: Sender<DayComplete>,
    receiver: Receiver<DayComplete>,
    // Set by `run_days`; the day after which to stop chaining.
    final_day: Option<u32>,
}

impl PopulationData {
    fn new() -> PopulationData {
        let (sender, receiver) = mpsc::channel();
        PopulationData {
            settings: None,
            homes: Vec::new(),
            day: 0,
            last_completed_day: 0,
            day_in_progress: false,
            required: 0,
            completed: HashSet::new(),
            sender,
            receiver,
            final_day: None,
        }
    }
}

define_data_plugin!(PopulationPlugin, PopulationData, PopulationData::new());

pub trait ContextPopulationExt {
    /// Creates `population_size` agents with the default death-chance model.
    ///
    /// # Errors
    ///
    /// See [`ContextPopulationExt::init_population_with_model`].
    fn init_population(
        &mut self,
        parameters: &Parameters,
        homes: &[LocationId],
    ) -> Result<(), OutbreakError>;

    /// Creates `population_size` agents, each living in a random home.
    /// Exactly `initial_infected` of them start out infected. Each agent has
    /// each underlying condition with probability `condition_prevalence`,
    /// and its death chance is computed once, here, by `model`.
    ///
    /// If a navigator is installed every agent is placed at a reachable
    /// point near its home.
    ///
    /// # Errors
    ///
    /// `ConfigError` for invalid parameters or an empty home list,
    /// `StateError` if the population already exists.
    fn init_population_with_model(
        &mut self,
        parameters: &Parameters,
        homes: &[LocationId],
        model: &dyn DeathChanceModel,
    ) -> Result<(), OutbreakError>;

    /// Starts the next day and returns its number (the first day is 1).
    ///
    /// # Errors
    ///
    /// `StateError` if the population has not been created, some living
    /// agent has not finished the current day, or living agents exist but no
    /// world or navigator is installed.
    fn advance_day(&mut self) -> Result<u32, OutbreakError>;

    /// Starts the next day and keeps starting new ones as each completes,
    /// for `num_days` days in all. Call `execute` afterwards.
    ///
    /// # Errors
    ///
    /// `ConfigError` if `num_days` is zero, otherwise as `advance_day`.
    fn run_days(&mut self, num_days: u32) -> Result<(), OutbreakError>;

    /// Stops the current day. Every agent forgets its queue and in-flight
    /// waits, and the day will never be marked complete.
    fn abandon_day(&mut self);

    #[must_use]
    fn census(&self) -> Census;

    /// The number of the most recently started day, 0 before the first.
    #[must_use]
    fn current_day(&self) -> u32;

    #[must_use]
    fn living_count(&self) -> usize;

    /// True once every agent required for the current day has reported.
    #[must_use]
    fn is_day_complete(&self) -> bool;

    #[must_use]
    fn day_settings(&self) -> DaySettings;

    #[must_use]
    fn homes(&self) -> &[LocationId];
}

impl ContextPopulationExt for Context {
    fn init_population(
        &mut self,
        parameters: &Parameters,
        homes: &[LocationId],
    ) -> Result<(), OutbreakError> {
        self.init_population_with_model(parameters, homes, &AdditiveRisk::default())
    }

    fn init_population_with_model(
        &mut self,
        parameters: &Parameters,
        homes: &[LocationId],
        model: &dyn DeathChanceModel,
    ) -> Result<(), OutbreakError> {
        parameters.validate()?;
        if homes.is_empty() {
            return Err(OutbreakError::config(
                "homes",
                "at least one home is required",
            ));
        }
        if self.get_data_mut(PopulationPlugin).settings.is_some() {
            return Err(OutbreakError::StateError(
                "population has already been created".to_string(),
            ));
        }

        let population_size = parameters.population_size as usize;
        let infected: HashSet<usize> = self
            .sample_indices(
                PopulationRng,
                population_size,
                parameters.initial_infected as usize,
            )
            .into_iter()
            .collect();

        for index in 0..population_size {
            let home = homes[self.sample_range(PopulationRng, 0..homes.len())];
            let disease = if infected.contains(&index) {
                DiseaseState::newly_infected()
            } else {
                DiseaseState::Susceptible
            };
            let conditions: Vec<Condition> = Condition::ALL
                .into_iter()
                .filter(|_| self.sample_bool(ConditionRng, parameters.condition_prevalence))
                .collect();
            let death_chance = model.death_chance(&disease, &conditions);
            let name = generate_name(self);
            trace!("agent {index}: {name}, home {home}, {disease:?}, {conditions:?}");

            let id = self.add_agent(Agent::new(
                AgentId(index),
                name,
                home,
                disease,
                conditions,
                death_chance,
            ))?;
            spawn_near_home(self, id, home, parameters.search_radius);
        }

        let data = self.get_data_mut(PopulationPlugin);
        data.settings = Some(DaySettings::from(parameters));
        data.homes = homes.to_vec();
        info!(
            "created {population_size} agents across {} homes, {} infected",
            homes.len(),
            parameters.initial_infected
        );
        Ok(())
    }

    fn advance_day(&mut self) -> Result<u32, OutbreakError> {
        collect_day_completions(self);
        let data = self.get_data_mut(PopulationPlugin);
        let Some(settings) = data.settings else {
            return Err(OutbreakError::StateError(
                "population has not been created".to_string(),
            ));
        };
        if data.day_in_progress {
            return Err(OutbreakError::StateError(format!(
                "day {} is still in progress: {} of {} agents are home",
                data.day,
                data.completed.len(),
                data.required
            )));
        }

        let living: Vec<AgentId> = self
            .agents()
            .iter()
            .filter(|agent| !agent.is_dead())
            .map(Agent::id)
            .collect();
        if !living.is_empty() {
            if self.try_world().is_none() {
                return Err(OutbreakError::StateError("no world installed".to_string()));
            }
            if !self.has_navigator() {
                return Err(OutbreakError::StateError("no navigator installed".to_string()));
            }
        }

        let data = self.get_data_mut(PopulationPlugin);
        data.day += 1;
        data.day_in_progress = true;
        data.required = living.len();
        data.completed.clear();
        let day = data.day;
        info!("day {day} begins with {} living agents", living.len());

        for id in living {
            let Some(agent) = self.agent(id) else {
                continue;
            };
            let tasks =
                self.generate_day_schedule(agent, settings.tasks_per_day, settings.task_duration);
            self.start_agent_day(id, tasks);
        }

        // Nobody left alive to wait for.
        if self.get_data_mut(PopulationPlugin).required == 0 {
            schedule_finish_day(self);
        }
        Ok(day)
    }

    fn run_days(&mut self, num_days: u32) -> Result<(), OutbreakError> {
        if num_days == 0 {
            return Err(OutbreakError::config("num_days", "must be greater than zero"));
        }
        let final_day = self.current_day() + num_days;
        self.advance_day()?;
        self.get_data_mut(PopulationPlugin).final_day = Some(final_day);
        Ok(())
    }

    fn abandon_day(&mut self) {
        let ids: Vec<AgentId> = self.agents().iter().map(Agent::id).collect();
        for id in ids {
            self.abandon_agent(id);
        }
        let data = self.get_data_mut(PopulationPlugin);
        while data.receiver.try_recv().is_ok() {}
        data.day_in_progress = false;
        data.required = 0;
        data.completed.clear();
        data.final_day = None;
        warn!("day {} abandoned", data.day);
    }

    fn census(&self) -> Census {
        self.agents()
            .iter()
            .fold(Census::default(), |mut census, agent| {
                match agent.disease() {
                    DiseaseState::Susceptible => census.susceptible += 1,
                    DiseaseState::Infected { .. } => census.infected += 1,
                    DiseaseState::Immune => census.immune += 1,
                    DiseaseState::Dead { .. } => census.dead += 1,
                }
                census
            })
    }

    fn current_day(&self) -> u32 {
        self.get_data(PopulationPlugin).map_or(0, |data| data.day)
    }

    fn living_count(&self) -> usize {
        self.agents().iter().filter(|agent| !agent.is_dead()).count()
    }

    fn is_day_complete(&self) -> bool {
        self.get_data(PopulationPlugin)
            .is_some_and(|data| data.day > 0 && data.last_completed_day == data.day)
    }

    fn day_settings(&self) -> DaySettings {
        self.get_data(PopulationPlugin)
            .and_then(|data| data.settings)
            .unwrap_or_default()
    }

    fn homes(&self) -> &[LocationId] {
        self.get_data(PopulationPlugin)
            .map(|data| data.homes.as_slice())
            .unwrap_or_default()
    }
}

/// Called by an agent once it is home and its day has been resolved.
pub(crate) fn signal_day_complete(context: &mut Context, message: DayComplete) {
    let sent = context.get_data_mut(PopulationPlugin).sender.send(message);
    if let Err(err) = sent {
        error!("dropped day completion for agent {}: {err}", message.agent);
        return;
    }
    collect_day_completions(context);
}

fn collect_day_completions(context: &mut Context) {
    let data = context.get_data_mut(PopulationPlugin);
    while let Ok(message) = data.receiver.try_recv() {
        if !data.day_in_progress {
            debug!("ignoring late completion from agent {}", message.agent);
            continue;
        }
        if message.died {
            debug!("agent {} died on day {}", message.agent, data.day);
        }
        if !data.completed.insert(message.agent) {
            warn!("agent {} reported day {} twice", message.agent, data.day);
        }
    }
    if data.day_in_progress && data.completed.len() >= data.required {
        schedule_finish_day(context);
    }
}

fn schedule_finish_day(context: &mut Context) {
    let now = context.get_current_time();
    context.add_plan_with_phase(now, finish_day, ExecutionPhase::Last);
}

fn finish_day(context: &mut Context) {
    let data = context.get_data_mut(PopulationPlugin);
    if !data.day_in_progress {
        return;
    }
    data.day_in_progress = false;
    data.last_completed_day = data.day;
    let day = data.day;
    let final_day = data.final_day;

    let census = context.census();
    info!("day {day} complete: {census}");
    record_day_census(context, day, census);

    match final_day {
        Some(final_day) if day < final_day => {
            context.queue_callback(|context| {
                if let Err(err) = context.advance_day() {
                    error!("could not start the next day: {err}");
                }
            });
        }
        Some(_) => {
            info!("finished after {day} days");
            context.get_data_mut(PopulationPlugin).final_day = None;
            context.shutdown();
        }
        None => {}
    }
}

fn spawn_near_home(context: &mut Context, id: AgentId, home: LocationId, search_radius: f64) {
    if !context.has_navigator() {
        return;
    }
    let Some(entry) = context
        .try_world()
        .and_then(|world| world.location(home))
        .map(|location| location.entry)
    else {
        warn!("agent {id} lives in unknown location {home}; not placed");
        return;
    };
    match context.find_reachable_point(entry, search_radius) {
        Some(point) => context.with_navigator(|navigator| navigator.place(id, point)),
        None => warn!("no reachable point near home {home} for agent {id}"),
    }
}

fn generate_name(context: &Context) -> String {
    let given = GIVEN_NAMES[context.sample_range(NameRng, 0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[context.sample_range(NameRng, 0..FAMILY_NAMES.len())];
    format!("{given} {family}")
}
