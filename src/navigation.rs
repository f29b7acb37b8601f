//! The navigation port: how agents find walkable points and move.
//!
//! Pathfinding itself is outside this crate. The simulation only needs the
//! four capabilities of [`NavigationPort`]. [`StraightLineNavigator`] is a
//! headless implementation that walks agents in straight lines across a
//! rectangular area, avoiding nothing but refusing to target blocked zones.
//!
//! Movement is continuous in simulated time. Before any query or command the
//! `Context` brings the navigator up to the current time with `advance_to`,
//! so a navigator never needs its own clock.
use crate::agent::AgentId;
use crate::context::Context;
use crate::world::{Point, Rect};
use crate::{define_data_plugin, trace, HashMap, HashMapExt};

pub trait NavigationPort {
    /// A walkable point within `search_radius` of `target`, or `None`.
    fn find_reachable_point(&self, target: Point, search_radius: f64) -> Option<Point>;

    /// Place an agent without travelling, e.g. when it is first spawned.
    fn place(&mut self, agent: AgentId, point: Point);

    /// Start travelling toward `point`.
    fn command_move_to(&mut self, agent: AgentId, point: Point);

    /// True once the agent stands on its last commanded destination.
    fn is_at_destination(&self, agent: AgentId) -> bool;

    /// Pause or resume the agent's travel.
    fn set_movement_enabled(&mut self, agent: AgentId, enabled: bool);

    /// Move every enabled agent forward to simulated time `now`.
    fn advance_to(&mut self, now: f64);

    fn position(&self, agent: AgentId) -> Option<Point>;
}

#[derive(Clone, Debug)]
struct Walker {
    position: Point,
    destination: Option<Point>,
    enabled: bool,
}

/// Walks agents in straight lines at a constant speed.
#[derive(Clone, Debug)]
pub struct StraightLineNavigator {
    walkable: Rect,
    blocked: Vec<Rect>,
    speed: f64,
    walkers: HashMap<AgentId, Walker>,
    last_update: f64,
}

impl StraightLineNavigator {
    #[must_use]
    pub fn new(walkable: Rect, speed: f64) -> StraightLineNavigator {
        StraightLineNavigator {
            walkable,
            blocked: Vec::new(),
            speed,
            walkers: HashMap::new(),
            last_update: 0.0,
        }
    }

    /// Marks an area as unwalkable; points inside it are never returned.
    #[must_use]
    pub fn with_blocked(mut self, area: Rect) -> StraightLineNavigator {
        self.blocked.push(area);
        self
    }

    fn is_walkable(&self, point: &Point) -> bool {
        self.walkable.contains(point) && !self.blocked.iter().any(|area| area.contains(point))
    }
}

impl NavigationPort for StraightLineNavigator {
    fn find_reachable_point(&self, target: Point, search_radius: f64) -> Option<Point> {
        let candidate = self.walkable.clamp(&target);
        if self.is_walkable(&candidate) && candidate.distance(&target) <= search_radius {
            return Some(candidate);
        }
        // Inside a blocked zone: try the nearest edge of each zone.
        self.blocked
            .iter()
            .filter(|area| area.contains(&candidate))
            .flat_map(|area| {
                let nudge = 1e-6;
                [
                    Point::new(area.min.x - nudge, candidate.y),
                    Point::new(area.max.x + nudge, candidate.y),
                    Point::new(candidate.x, area.min.y - nudge),
                    Point::new(candidate.x, area.max.y + nudge),
                ]
            })
            .filter(|point| self.is_walkable(point) && point.distance(&target) <= search_radius)
            .min_by(|a, b| a.distance(&target).total_cmp(&b.distance(&target)))
    }

    fn place(&mut self, agent: AgentId, point: Point) {
        self.walkers.insert(
            agent,
            Walker {
                position: point,
                destination: None,
                enabled: true,
            },
        );
    }

    fn command_move_to(&mut self, agent: AgentId, point: Point) {
        trace!("agent {agent} moving to ({:.1}, {:.1})", point.x, point.y);
        let walker = self.walkers.entry(agent).or_insert(Walker {
            position: point,
            destination: None,
            enabled: true,
        });
        walker.destination = Some(point);
    }

    fn is_at_destination(&self, agent: AgentId) -> bool {
        self.walkers.get(&agent).is_some_and(|walker| {
            walker
                .destination
                .is_some_and(|destination| destination == walker.position)
        })
    }

    fn set_movement_enabled(&mut self, agent: AgentId, enabled: bool) {
        if let Some(walker) = self.walkers.get_mut(&agent) {
            walker.enabled = enabled;
        }
    }

    fn advance_to(&mut self, now: f64) {
        let elapsed = now - self.last_update;
        if elapsed <= 0.0 {
            return;
        }
        self.last_update = now;
        let max_step = elapsed * self.speed;
        for walker in self.walkers.values_mut().filter(|walker| walker.enabled) {
            if let Some(destination) = walker.destination {
                walker.position = walker.position.step_toward(&destination, max_step);
            }
        }
    }

    fn position(&self, agent: AgentId) -> Option<Point> {
        self.walkers.get(&agent).map(|walker| walker.position)
    }
}

define_data_plugin!(
    NavigationPlugin,
    Option<Box<dyn NavigationPort>>,
    None
);

/// Access to the navigation port. Every method first advances the port to the
/// current simulated time.
pub trait ContextNavigationExt {
    fn set_navigator(&mut self, navigator: impl NavigationPort + 'static);

    fn has_navigator(&self) -> bool;

    /// Runs `f` against the port, synchronised to the current time.
    ///
    /// # Panics
    ///
    /// Panics if no navigator has been set.
    fn with_navigator<T>(&mut self, f: impl FnOnce(&mut dyn NavigationPort) -> T) -> T;

    fn find_reachable_point(&mut self, target: Point, search_radius: f64) -> Option<Point> {
        self.with_navigator(|navigator| navigator.find_reachable_point(target, search_radius))
    }

    fn command_move_to(&mut self, agent: AgentId, point: Point) {
        self.with_navigator(|navigator| navigator.command_move_to(agent, point));
    }

    fn is_at_destination(&mut self, agent: AgentId) -> bool {
        self.with_navigator(|navigator| navigator.is_at_destination(agent))
    }

    fn set_movement_enabled(&mut self, agent: AgentId, enabled: bool) {
        self.with_navigator(|navigator| navigator.set_movement_enabled(agent, enabled));
    }

    fn agent_position(&mut self, agent: AgentId) -> Option<Point> {
        self.with_navigator(|navigator| navigator.position(agent))
    }
}

impl ContextNavigationExt for Context {
    fn set_navigator(&mut self, navigator: impl NavigationPort + 'static) {
        *self.get_data_mut(NavigationPlugin) = Some(Box::new(navigator));
    }

    fn has_navigator(&self) -> bool {
        self.get_data(NavigationPlugin).is_some_and(Option::is_some)
    }

    fn with_navigator<T>(&mut self, f: impl FnOnce(&mut dyn NavigationPort) -> T) -> T {
        let now = self.get_current_time();
        let navigator = self
            .get_data_mut(NavigationPlugin)
            .as_deref_mut()
            .expect("a navigator must be set before agents can move");
        navigator.advance_to(now);
        f(navigator)
    }
}
