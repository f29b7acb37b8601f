//! Day schedules: which errands each agent runs on a given day.
//!
//! The population manager asks for a fresh schedule for every living agent at
//! the start of each day. The policy is pluggable; [`RandomErrands`] is used
//! when nothing else is installed.
use crate::agent::Agent;
use crate::context::Context;
use crate::random::ContextRandomExt;
use crate::task::Task;
use crate::world::{ContextWorldExt, LocationId};
use crate::{define_data_plugin, define_rng};

define_rng!(ScheduleRng);

pub trait ScheduleGenerator {
    /// An ordered list of tasks for `agent`'s next day.
    fn generate_day_schedule(
        &self,
        context: &Context,
        agent: &Agent,
        tasks_per_day: u32,
        task_duration: u32,
    ) -> Vec<Task>;
}

/// Each errand goes to a site picked uniformly at random from the world.
/// Sites may repeat, including back to back.
#[derive(Copy, Clone, Debug, Default)]
pub struct RandomErrands;

impl ScheduleGenerator for RandomErrands {
    fn generate_day_schedule(
        &self,
        context: &Context,
        _agent: &Agent,
        tasks_per_day: u32,
        task_duration: u32,
    ) -> Vec<Task> {
        let sites = context.world().sites();
        if sites.is_empty() {
            return Vec::new();
        }
        (0..tasks_per_day)
            .map(|_| {
                let site = sites[context.sample_range(ScheduleRng, 0..sites.len())];
                Task::new(site, f64::from(task_duration))
            })
            .collect()
    }
}

/// The same route every day for every agent, truncated to `tasks_per_day`.
#[derive(Clone, Debug, Default)]
pub struct FixedRoute(pub Vec<LocationId>);

impl ScheduleGenerator for FixedRoute {
    fn generate_day_schedule(
        &self,
        _context: &Context,
        _agent: &Agent,
        tasks_per_day: u32,
        task_duration: u32,
    ) -> Vec<Task> {
        self.0
            .iter()
            .take(tasks_per_day as usize)
            .map(|location| Task::new(*location, f64::from(task_duration)))
            .collect()
    }
}

define_data_plugin!(
    SchedulePlugin,
    Option<Box<dyn ScheduleGenerator>>,
    None
);

pub trait ContextScheduleExt {
    fn set_schedule_generator(&mut self, generator: impl ScheduleGenerator + 'static);

    /// Asks the installed generator (or [`RandomErrands`]) for a day's tasks.
    fn generate_day_schedule(&self, agent: &Agent, tasks_per_day: u32, task_duration: u32)
        -> Vec<Task>;
}

impl ContextScheduleExt for Context {
    fn set_schedule_generator(&mut self, generator: impl ScheduleGenerator + 'static) {
        *self.get_data_mut(SchedulePlugin) = Some(Box::new(generator));
    }

    fn generate_day_schedule(
        &self,
        agent: &Agent,
        tasks_per_day: u32,
        task_duration: u32,
    ) -> Vec<Task> {
        match self.get_data(SchedulePlugin).and_then(Option::as_ref) {
            Some(generator) => {
                generator.generate_day_schedule(self, agent, tasks_per_day, task_duration)
            }
            None => RandomErrands.generate_day_schedule(self, agent, tasks_per_day, task_duration),
        }
    }
}
