use serde::Serialize;

use crate::world::LocationId;

/// One errand: go to `location`, spend `duration` there.
///
/// A task carries no logic. Its owning agent flips the flags as it moves
/// through travel, performance and completion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Task {
    pub location: LocationId,
    pub duration: f64,
    /// A destination has been commanded for this task.
    pub en_route: bool,
    /// The agent has arrived and is waiting out `duration`.
    pub in_progress: bool,
    pub is_done: bool,
}

impl Task {
    #[must_use]
    pub fn new(location: LocationId, duration: f64) -> Task {
        Task {
            location,
            duration,
            en_route: false,
            in_progress: false,
            is_done: false,
        }
    }

    pub(crate) fn abandon(&mut self) {
        self.in_progress = false;
        self.is_done = true;
    }
}
