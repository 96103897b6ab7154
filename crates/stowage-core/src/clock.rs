//! Clock information passed to per-tick update callbacks.

use crate::id::TickId;

/// Snapshot of the driving clock at the moment an update runs.
///
/// All times are in seconds. `dt` is the step since the previous tick of
/// the same clock; `time` is the accumulated clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClockInfo {
    /// Tick counter of the driving clock.
    pub tick: TickId,
    /// Elapsed time since the previous tick, in seconds.
    pub dt: f64,
    /// Accumulated clock time, in seconds.
    pub time: f64,
}

impl ClockInfo {
    /// Create clock info for the given tick.
    pub fn new(tick: TickId, dt: f64, time: f64) -> Self {
        Self { tick, dt, time }
    }

    /// Clock info for the tick that follows this one, `dt` seconds later.
    pub fn advance(&self, dt: f64) -> Self {
        Self {
            tick: TickId(self.tick.0 + 1),
            dt,
            time: self.time + dt,
        }
    }
}
