//! Scheduled continuations on explicit clocks
//!
//! Every delayed action in the game (spawn cadences, warnings, lifetimes,
//! effect ends) is a timer entry owned by the subsystem that scheduled it.
//! Clearing a list cancels everything it owns, so nothing fires after stop.

use serde::{Deserialize, Serialize};

/// Which clock a timer counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    /// Game time, slowed by the time scale
    Scaled,
    /// Real time, unaffected by slow motion
    Unscaled,
}

/// Scaled and unscaled time plus the current time scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameClock {
    pub time_scale: f32,
    pub scaled: f32,
    pub unscaled: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            scaled: 0.0,
            unscaled: 0.0,
        }
    }
}

impl GameClock {
    /// Advance by one real-time step; returns `(scaled_dt, unscaled_dt)`
    pub fn advance(&mut self, dt: f32) -> (f32, f32) {
        let scaled_dt = dt * self.time_scale;
        self.scaled += scaled_dt;
        self.unscaled += dt;
        (scaled_dt, dt)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct TimerEntry<T> {
    id: TimerId,
    clock: Clock,
    remaining: f32,
    payload: T,
}

/// Cancelable one-shot timers carrying a payload
#[derive(Debug, Clone)]
pub struct TimerList<T> {
    entries: Vec<TimerEntry<T>>,
    next_id: u64,
}

impl<T> Default for TimerList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T> TimerList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, clock: Clock, delay: f32, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            clock,
            remaining: delay.max(0.0),
            payload,
        });
        id
    }

    /// Returns true if the timer was still pending
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every timer whose payload matches
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.payload));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn any(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.payload))
    }

    pub fn count(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.payload)).count()
    }

    /// Count down every timer and return the payloads that came due,
    /// earliest deadline first (ties in scheduling order)
    pub fn advance(&mut self, scaled_dt: f32, unscaled_dt: f32) -> Vec<T> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            let entry = &mut self.entries[i];
            entry.remaining -= match entry.clock {
                Clock::Scaled => scaled_dt,
                Clock::Unscaled => unscaled_dt,
            };
            if entry.remaining <= 0.0 {
                due.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.remaining.total_cmp(&b.remaining).then(a.id.cmp(&b.id)));
        due.into_iter().map(|e| e.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_when_due() {
        let mut timers = TimerList::new();
        timers.schedule(Clock::Scaled, 1.0, "spawn");
        assert!(timers.advance(0.5, 0.5).is_empty());
        assert_eq!(timers.advance(0.5, 0.5), vec!["spawn"]);
        assert!(timers.advance(1.0, 1.0).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_clock_selection() {
        let mut timers = TimerList::new();
        timers.schedule(Clock::Scaled, 1.0, 'a');
        timers.schedule(Clock::Unscaled, 1.0, 'b');
        // Half-speed game time
        assert_eq!(timers.advance(0.5, 1.0), vec!['b']);
        assert_eq!(timers.advance(0.5, 1.0), vec!['a']);
    }

    #[test]
    fn test_due_order_is_earliest_first() {
        let mut timers = TimerList::new();
        timers.schedule(Clock::Scaled, 0.3, 1);
        timers.schedule(Clock::Scaled, 0.1, 2);
        timers.schedule(Clock::Scaled, 0.1, 3);
        assert_eq!(timers.advance(1.0, 1.0), vec![2, 3, 1]);
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let mut timers = TimerList::new();
        let id = timers.schedule(Clock::Scaled, 1.0, 1);
        timers.schedule(Clock::Scaled, 1.0, 2);
        timers.schedule(Clock::Scaled, 1.0, 3);
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(timers.cancel_where(|&p| p == 2), 1);
        assert_eq!(timers.advance(2.0, 2.0), vec![3]);

        timers.schedule(Clock::Unscaled, 1.0, 4);
        timers.clear();
        assert!(timers.advance(5.0, 5.0).is_empty());
    }

    #[test]
    fn test_game_clock_scales() {
        let mut clock = GameClock::default();
        clock.time_scale = 0.5;
        assert_eq!(clock.advance(1.0), (0.5, 1.0));
        assert_eq!(clock.scaled, 0.5);
        assert_eq!(clock.unscaled, 1.0);
    }
}
