//! Position state machine for the active line.
//!
//! [`PositionMachine`] is the only writer of [`RuntimeState`]. Every operation
//! is synchronous and infallible once the machine holds a non-empty line;
//! handing it an out-of-range index is a caller bug and panics.

use shared::{
    domain::{DirType, Line, LineMode, Phase, RuntimeState},
    error::ModelError,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionMachine {
    line: Line,
    state: RuntimeState,
}

impl PositionMachine {
    pub fn new(line: Line) -> Result<Self, ModelError> {
        line.validate()?;
        Ok(Self {
            line,
            state: RuntimeState::default(),
        })
    }

    pub fn line(&self) -> &Line {
        &self.line
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Swaps the active line and parks at its first station.
    pub fn set_line(&mut self, line: Line) -> Result<(), ModelError> {
        line.validate()?;
        self.line = line;
        self.state = RuntimeState::default();
        Ok(())
    }

    /// Operator direction flip. The index stays where it is.
    pub fn set_direction(&mut self, dir: DirType) {
        self.line.meta.dir_type = dir;
    }

    /// `-1` for loop/inner and linear/down, `+1` otherwise.
    pub fn step(&self) -> i64 {
        match (self.line.meta.mode, self.line.meta.dir_type) {
            (LineMode::Loop, DirType::Inner) | (LineMode::Linear, DirType::Down) => -1,
            _ => 1,
        }
    }

    /// Inclusive short-turn range. Loops always span the whole line.
    pub fn bounds(&self) -> (usize, usize) {
        let last = self.last_idx();
        if self.line.meta.mode == LineMode::Loop {
            return (0, last);
        }
        let min = self.line.resolve_bound(self.line.meta.start_idx).unwrap_or(0);
        let max = self.line.resolve_bound(self.line.meta.term_idx).unwrap_or(last);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }

    /// Next index a train at `current` may stop at, moving one station in the
    /// sign of `step`.
    ///
    /// Linear lines clamp at the short-turn bounds, which are legal resting
    /// points even when skipped but not when docked for the other direction;
    /// such a bound leaves the train at `current`. Stations flagged `skip`, or
    /// docked for the other direction, are passed over. Gives up after one lap
    /// and returns the last candidate when nothing qualifies.
    pub fn next_valid_index(&self, current: usize, step: i64) -> usize {
        self.assert_index(current);
        let len = self.line.len();
        let looped = self.line.meta.mode == LineMode::Loop;
        let (min, max) = self.bounds();
        let delta: i64 = if step < 0 { -1 } else { 1 };

        let mut candidate = current;
        for _ in 0..len {
            if looped {
                candidate = wrap(candidate, delta, len);
            } else {
                let moved = candidate as i64 + delta;
                let far_bound = if delta > 0 && moved >= max as i64 {
                    Some(max)
                } else if delta < 0 && moved <= min as i64 {
                    Some(min)
                } else {
                    None
                };
                if let Some(bound) = far_bound {
                    return if self.docks_at(bound) { bound } else { current };
                }
                // Entering the short-turn range from outside lands on its edge.
                let edge = if moved < min as i64 {
                    Some(min)
                } else if moved > max as i64 {
                    Some(max)
                } else {
                    None
                };
                match edge {
                    Some(bound) if self.docks_at(bound) => return bound,
                    Some(bound) => {
                        candidate = bound;
                        continue;
                    }
                    None => candidate = moved as usize,
                }
            }

            if self.docks_at(candidate) && !self.line.stations[candidate].skip {
                return candidate;
            }
        }

        warn!(
            line = %self.line.meta.line_name,
            current,
            parked = candidate,
            "no stoppable station in range; parking"
        );
        candidate
    }

    /// Arrived -> Departed. No-op when already departed.
    pub fn depart(&mut self) {
        self.state.state = Phase::Departed;
    }

    /// Departed -> Arrived, advancing one legal step in the travel direction.
    /// No-op when already arrived.
    pub fn arrive(&mut self) {
        if self.state.state == Phase::Arrived {
            return;
        }
        self.state.idx = self.next_valid_index(self.state.idx, self.step());
        self.state.state = Phase::Arrived;
    }

    /// Alternates between [`depart`](Self::depart) and [`arrive`](Self::arrive).
    pub fn next(&mut self) {
        match self.state.state {
            Phase::Arrived => self.depart(),
            Phase::Departed => self.arrive(),
        }
        debug!(idx = self.state.idx, state = ?self.state.state, "next");
    }

    /// Manual override: jumps `delta` legal stops (by index sign, not travel
    /// direction) and parks as arrived.
    pub fn move_by(&mut self, delta: i64) {
        let mut idx = self.state.idx;
        let mut remaining = delta.unsigned_abs();
        let mut lapped = false;
        while remaining > 0 {
            let moved = self.next_valid_index(idx, delta);
            remaining -= 1;
            // A clamped or fully blocked line stays put from here on.
            if moved == idx {
                break;
            }
            idx = moved;
            // Once on a stoppable station a loop cycles through all of them.
            if self.line.meta.mode == LineMode::Loop && !lapped {
                remaining %= self.stoppable_count().max(1);
                lapped = true;
            }
        }
        self.state = RuntimeState::arrived_at(idx);
    }

    pub fn jump_to(&mut self, idx: usize) {
        self.assert_index(idx);
        self.state = RuntimeState::arrived_at(idx);
    }

    /// Forces the phase without moving.
    pub fn set_arrived(&mut self) {
        self.state.state = Phase::Arrived;
    }

    pub fn set_departed(&mut self) {
        self.depart();
    }

    /// Arrived at the bound a linear line runs towards. Loops never end.
    pub fn at_terminal(&self) -> bool {
        if self.line.meta.mode == LineMode::Loop || self.state.state != Phase::Arrived {
            return false;
        }
        let (min, max) = self.bounds();
        let terminal = if self.step() > 0 { max } else { min };
        self.state.idx == terminal
    }

    fn docks_at(&self, idx: usize) -> bool {
        self.line.stations[idx].dock.serves(self.line.meta.dir_type)
    }

    fn stoppable_count(&self) -> u64 {
        self.line
            .stations
            .iter()
            .filter(|s| !s.skip && s.dock.serves(self.line.meta.dir_type))
            .count() as u64
    }

    fn last_idx(&self) -> usize {
        self.line.last_idx().unwrap_or(0)
    }

    fn assert_index(&self, idx: usize) {
        assert!(
            idx < self.line.len(),
            "{}",
            ModelError::InvalidIndex {
                idx,
                len: self.line.len()
            }
        );
    }
}

fn wrap(idx: usize, delta: i64, len: usize) -> usize {
    (idx as i64 + delta).rem_euclid(len as i64) as usize
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
