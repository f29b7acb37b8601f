//! The map: homes, errand sites, and the walkable area they sit in.
//!
//! Agents never hold a location directly; they hold a [`LocationId`] and ask
//! the world for its position when they need to travel there.
use std::fmt::{self, Display};

use serde::Serialize;

use crate::context::Context;
use crate::define_data_plugin;

#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Moves up to `max_step` toward `target`, stopping on it.
    #[must_use]
    pub fn step_toward(&self, target: &Point, max_step: f64) -> Point {
        let distance = self.distance(target);
        if distance <= max_step {
            return *target;
        }
        let ratio = max_step / distance;
        Point::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }
}

/// An axis-aligned rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    #[must_use]
    pub fn new(min: Point, max: Point) -> Rect {
        Rect {
            min: Point::new(min.x.min(max.x), min.y.min(max.y)),
            max: Point::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }

    /// The point of the rectangle closest to `point`.
    #[must_use]
    pub fn clamp(&self, point: &Point) -> Point {
        Point::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LocationId(pub usize);

impl Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LocationKind {
    Home,
    Site,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub kind: LocationKind,
    pub name: String,
    pub position: Point,
    /// Where agents head to enter the building. Defaults to `position`.
    pub entry: Point,
}

#[derive(Clone, Debug)]
pub struct World {
    bounds: Rect,
    locations: Vec<Location>,
}

impl World {
    #[must_use]
    pub fn new(bounds: Rect) -> World {
        World {
            bounds,
            locations: Vec::new(),
        }
    }

    /// A town laid out on a square grid: homes fill the first cells in
    /// row-major order, errand sites the rest. Each home's entry sits half a
    /// cell in front of it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn grid_town(homes: usize, sites: usize, spacing: f64) -> World {
        let cells = homes + sites;
        let columns = (cells as f64).sqrt().ceil().max(1.0) as usize;
        let rows = cells.div_ceil(columns).max(1);
        let bounds = Rect::new(
            Point::new(0.0, 0.0),
            Point::new(columns as f64 * spacing, rows as f64 * spacing),
        );
        let mut world = World::new(bounds);
        for cell in 0..cells {
            let (column, row) = (cell % columns, cell / columns);
            let position = Point::new(
                (column as f64 + 0.5) * spacing,
                (row as f64 + 0.5) * spacing,
            );
            if cell < homes {
                let entry = Point::new(position.x, position.y - spacing / 2.0);
                world.add_location(
                    LocationKind::Home,
                    format!("House {}", cell + 1),
                    position,
                    entry,
                );
            } else {
                let number = cell - homes + 1;
                world.add_location(
                    LocationKind::Site,
                    format!("Site {number}"),
                    position,
                    position,
                );
            }
        }
        world
    }

    pub fn add_home(&mut self, name: impl Into<String>, position: Point) -> LocationId {
        self.add_location(LocationKind::Home, name, position, position)
    }

    pub fn add_site(&mut self, name: impl Into<String>, position: Point) -> LocationId {
        self.add_location(LocationKind::Site, name, position, position)
    }

    pub fn add_location(
        &mut self,
        kind: LocationKind,
        name: impl Into<String>,
        position: Point,
        entry: Point,
    ) -> LocationId {
        let id = LocationId(self.locations.len());
        self.locations.push(Location {
            id,
            kind,
            name: name.into(),
            position,
            entry,
        });
        id
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id.0)
    }

    #[must_use]
    pub fn homes(&self) -> Vec<LocationId> {
        self.ids_of(LocationKind::Home)
    }

    #[must_use]
    pub fn sites(&self) -> Vec<LocationId> {
        self.ids_of(LocationKind::Site)
    }

    fn ids_of(&self, kind: LocationKind) -> Vec<LocationId> {
        self.locations
            .iter()
            .filter(|location| location.kind == kind)
            .map(|location| location.id)
            .collect()
    }
}

define_data_plugin!(WorldPlugin, Option<World>, None);

pub trait ContextWorldExt {
    fn set_world(&mut self, world: World);

    /// # Panics
    ///
    /// Panics if no world has been set.
    fn world(&self) -> &World;

    fn try_world(&self) -> Option<&World>;
}

impl ContextWorldExt for Context {
    fn set_world(&mut self, world: World) {
        *self.get_data_mut(WorldPlugin) = Some(world);
    }

    fn world(&self) -> &World {
        self.try_world()
            .expect("a world must be set before agents can move")
    }

    fn try_world(&self) -> Option<&World> {
        self.get_data(WorldPlugin).and_then(Option::as_ref)
    }
}
