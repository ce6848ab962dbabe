//! One-shot score thresholds
//!
//! Each threshold fires exactly once when the score first reaches it, no
//! matter how many thresholds a single score jump crosses or how often the
//! gate is polled. Several subsystems each own an independent gate.

use crate::error::ConfigError;
use crate::tuning::ascending;

#[derive(Debug, Clone)]
pub struct ThresholdGate {
    thresholds: Vec<u32>,
    /// Thresholds are ascending and fire in order, so the fired set is a prefix
    fired: usize,
}

impl ThresholdGate {
    /// Gate over a non-empty, strictly ascending threshold list
    pub fn new(name: &'static str, thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        ascending(name, &thresholds, false)?;
        Ok(Self {
            thresholds,
            fired: 0,
        })
    }

    /// Like [`ThresholdGate::new`] but an empty list is allowed (never fires)
    pub fn optional(name: &'static str, thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        ascending(name, &thresholds, true)?;
        Ok(Self {
            thresholds,
            fired: 0,
        })
    }

    /// Every `every` points, `count` times: `every, 2*every, ...`
    pub fn periodic(every: u32, count: u32) -> Self {
        let thresholds = if every == 0 {
            Vec::new()
        } else {
            (1..=count).map(|i| i * every).collect()
        };
        Self {
            thresholds,
            fired: 0,
        }
    }

    /// Fire every pending threshold at or below `score`, ascending
    pub fn update(&mut self, score: u32) -> Vec<u32> {
        let start = self.fired;
        while self.fired < self.thresholds.len() && self.thresholds[self.fired] <= score {
            self.fired += 1;
        }
        let crossed = self.thresholds[start..self.fired].to_vec();
        debug_assert!(
            crossed.windows(2).all(|w| w[0] < w[1]),
            "threshold fired twice"
        );
        crossed
    }

    pub fn reset(&mut self) {
        self.fired = 0;
    }

    pub fn next_threshold(&self) -> Option<u32> {
        self.thresholds.get(self.fired).copied()
    }

    pub fn is_fired(&self, threshold: u32) -> bool {
        self.thresholds[..self.fired].contains(&threshold)
    }

    pub fn fired_count(&self) -> usize {
        self.fired
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }
}
