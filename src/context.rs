//! The `Context` owns the simulated clock and every module's state.
//!
//! Work is expressed as callbacks. A callback either runs as soon as the
//! current one returns (`queue_callback`) or at a point in simulated time
//! (`add_plan`). `execute` drains queued callbacks first, then advances the
//! clock to the earliest plan, until nothing is left or `shutdown` is called.
//!
//! Agents suspend themselves with the two wait helpers:
//! * [`Context::wait_for`] resumes after a fixed amount of simulated time.
//! * [`Context::wait_until`] polls a condition at a fixed interval and resumes
//!   once it holds.
//!
//! Both return a [`WaitId`] that [`Context::cancel_wait`] accepts, so an agent
//! that gives up on its day can drop whatever it was waiting for.
use std::any::{Any, TypeId};
use std::collections::VecDeque;

use crate::data_plugin::DataPlugin;
use crate::plan::{ExecutionPhase, PlanId, Queue};
use crate::{trace, HashMap, HashMapExt};

type Callback = dyn FnOnce(&mut Context);
type Condition = dyn Fn(&mut Context) -> bool;

/// Identifies a pending [`Context::wait_for`] or [`Context::wait_until`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WaitId(u64);

pub struct Context {
    plan_queue: Queue<Box<Callback>>,
    callback_queue: VecDeque<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    // The plan currently standing in for each unfinished wait.
    pending_waits: HashMap<WaitId, PlanId>,
    wait_counter: u64,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            callback_queue: VecDeque::new(),
            data_plugins: HashMap::new(),
            pending_waits: HashMap::new(),
            wait_counter: 0,
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Add a plan to run at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
    ) -> PlanId {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// Add a plan to run at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) -> PlanId {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Time is invalid"
        );
        trace!("adding plan at {time}");
        self.plan_queue.add_plan(time, Box::new(callback), phase)
    }

    /// Cancel a pending plan. Returns `false` if it already ran.
    pub fn cancel_plan(&mut self, id: PlanId) -> bool {
        trace!("cancelling plan {id:?}");
        self.plan_queue.cancel_plan(id)
    }

    /// Run `callback` once the current callback returns, before the clock
    /// moves.
    pub fn queue_callback(&mut self, callback: impl FnOnce(&mut Context) + 'static) {
        self.callback_queue.push_back(Box::new(callback));
    }

    /// Resume `callback` after `duration` units of simulated time.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is negative or not finite.
    pub fn wait_for(
        &mut self,
        duration: f64,
        callback: impl FnOnce(&mut Context) + 'static,
    ) -> WaitId {
        let wait_id = self.next_wait_id();
        let resume_at = self.current_time + duration;
        let plan_id = self.add_plan(resume_at, move |context| {
            context.pending_waits.remove(&wait_id);
            callback(context);
        });
        self.pending_waits.insert(wait_id, plan_id);
        wait_id
    }

    /// Check `condition` every `poll_interval` units of simulated time and
    /// run `callback` at the first poll where it holds.
    ///
    /// The first check happens one interval from now.
    ///
    /// # Panics
    ///
    /// Panics if `poll_interval` is not positive.
    pub fn wait_until(
        &mut self,
        poll_interval: f64,
        condition: impl Fn(&mut Context) -> bool + 'static,
        callback: impl FnOnce(&mut Context) + 'static,
    ) -> WaitId {
        assert!(poll_interval > 0.0, "Poll interval must be positive");
        let wait_id = self.next_wait_id();
        schedule_poll(
            self,
            wait_id,
            poll_interval,
            Box::new(condition),
            Box::new(callback),
        );
        wait_id
    }

    /// Drop a pending wait so its callback never runs. Returns `false` if the
    /// wait already resumed or was cancelled before.
    pub fn cancel_wait(&mut self, id: WaitId) -> bool {
        match self.pending_waits.remove(&id) {
            Some(plan_id) => self.cancel_plan(plan_id),
            None => false,
        }
    }

    fn next_wait_id(&mut self) -> WaitId {
        let id = WaitId(self.wait_counter);
        self.wait_counter += 1;
        id
    }

    /// Retrieve a module's data container, creating it on first use.
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::init()))
            .downcast_mut::<T::DataContainer>()
            .expect("data plugin container has the wrong type")
    }

    /// Retrieve a module's data container if it has been created.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stop the simulation after the current callback. Remaining plans and
    /// callbacks are discarded.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at {}", self.current_time);
        self.shutdown_requested = true;
    }

    /// True while any plan is waiting to run.
    #[must_use]
    pub fn more_plans(&self) -> bool {
        !self.plan_queue.is_empty()
    }

    /// Execute the simulation until no callbacks or plans remain or
    /// `shutdown` is requested.
    pub fn execute(&mut self) {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.shutdown_requested = false;
                self.callback_queue.clear();
                self.plan_queue.clear();
                self.pending_waits.clear();
                break;
            }

            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            match self.plan_queue.get_next_plan() {
                Some(plan) => {
                    self.current_time = plan.time;
                    (plan.data)(self);
                }
                None => break,
            }
        }
        trace!("event loop finished at {}", self.current_time);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn schedule_poll(
    context: &mut Context,
    wait_id: WaitId,
    poll_interval: f64,
    condition: Box<Condition>,
    callback: Box<Callback>,
) {
    let poll_at = context.get_current_time() + poll_interval;
    let plan_id = context.add_plan(poll_at, move |context| {
        if condition(context) {
            context.pending_waits.remove(&wait_id);
            callback(context);
        } else {
            schedule_poll(context, wait_id, poll_interval, condition, callback);
        }
    });
    context.pending_waits.insert(wait_id, plan_id);
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::define_data_plugin;

    define_data_plugin!(ComponentA, Vec<u32>, vec![]);

    fn add_plan(context: &mut Context, time: f64, value: u32) -> PlanId {
        context.add_plan(time, move |context| {
            context.get_data_mut(ComponentA).push(value);
        })
    }

    #[test]
    #[should_panic(expected = "Time is invalid")]
    fn negative_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, -1.0, 0);
    }

    #[test]
    #[should_panic(expected = "Time is invalid")]
    fn nan_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, f64::NAN, 0);
    }

    #[test]
    fn empty_context() {
        let mut context = Context::new();
        context.execute();
        assert_eq!(context.get_current_time(), 0.0);
        assert!(context.get_data(ComponentA).is_none());
    }

    #[test]
    fn timed_plan_only() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.execute();
        assert_eq!(context.get_current_time(), 1.0);
        assert_eq!(*context.get_data_mut(ComponentA), vec![1]);
    }

    #[test]
    fn callbacks_run_before_the_clock_moves() {
        let mut context = Context::new();
        context.add_plan(1.0, |context| {
            context.get_data_mut(ComponentA).push(1);
            add_plan(context, 2.0, 3);
            context.queue_callback(|context| {
                context.get_data_mut(ComponentA).push(2);
            });
        });
        context.execute();
        assert_eq!(context.get_current_time(), 2.0);
        assert_eq!(*context.get_data_mut(ComponentA), vec![1, 2, 3]);
    }

    #[test]
    fn cancel_plan() {
        let mut context = Context::new();
        let to_cancel = add_plan(&mut context, 2.0, 1);
        context.add_plan(1.0, move |context| {
            assert!(context.cancel_plan(to_cancel));
        });
        context.execute();
        assert_eq!(context.get_current_time(), 1.0);
        assert!(context.get_data_mut(ComponentA).is_empty());
    }

    #[test]
    fn last_phase_runs_after_normal_at_same_time() {
        let mut context = Context::new();
        context.add_plan_with_phase(
            1.0,
            |context| context.get_data_mut(ComponentA).push(2),
            ExecutionPhase::Last,
        );
        add_plan(&mut context, 1.0, 1);
        context.execute();
        assert_eq!(*context.get_data_mut(ComponentA), vec![1, 2]);
    }

    #[test]
    fn wait_for_resumes_after_duration() {
        let mut context = Context::new();
        context.add_plan(2.0, |context| {
            context.wait_for(5.0, |context| {
                let now = context.get_current_time();
                context.get_data_mut(ComponentA).push(now as u32);
            });
        });
        context.execute();
        assert_eq!(*context.get_data_mut(ComponentA), vec![7]);
    }

    #[test]
    fn wait_until_polls_until_condition_holds() {
        let mut context = Context::new();
        let polls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&polls);
        context.wait_until(
            0.5,
            move |context| {
                counter.set(counter.get() + 1);
                context.get_current_time() >= 2.0
            },
            |context| {
                let now = context.get_current_time();
                context.get_data_mut(ComponentA).push(now as u32);
            },
        );
        context.execute();
        assert_eq!(polls.get(), 4);
        assert_eq!(*context.get_data_mut(ComponentA), vec![2]);
    }

    #[test]
    fn cancelled_wait_for_never_resumes() {
        let mut context = Context::new();
        let wait = context.wait_for(3.0, |context| context.get_data_mut(ComponentA).push(1));
        context.add_plan(1.0, move |context| {
            assert!(context.cancel_wait(wait));
            assert!(!context.cancel_wait(wait));
        });
        context.execute();
        assert!(context.get_data_mut(ComponentA).is_empty());
    }

    #[test]
    fn cancelling_a_wait_until_stops_later_polls() {
        let mut context = Context::new();
        let polls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&polls);
        let wait = context.wait_until(
            1.0,
            move |_| {
                counter.set(counter.get() + 1);
                false
            },
            |context| context.get_data_mut(ComponentA).push(1),
        );
        context.add_plan(2.5, move |context| {
            assert!(context.cancel_wait(wait));
        });
        context.execute();
        assert_eq!(polls.get(), 2);
        assert_eq!(context.get_current_time(), 2.5);
        assert!(context.get_data_mut(ComponentA).is_empty());
    }

    #[test]
    fn a_finished_wait_cannot_be_cancelled() {
        let mut context = Context::new();
        let wait = context.wait_until(1.0, |_| true, |_| {});
        context.execute();
        assert!(!context.cancel_wait(wait));
    }

    #[test]
    fn shutdown_discards_remaining_plans() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.add_plan(1.5, Context::shutdown);
        add_plan(&mut context, 2.0, 2);
        context.execute();
        assert_eq!(context.get_current_time(), 1.5);
        assert_eq!(*context.get_data_mut(ComponentA), vec![1]);
        assert!(!context.more_plans());
    }
}
