//! Two-cadence tick scheduler.
//!
//! Each cadence is a plain counter that fires when it reaches its interval
//! and then resets to zero. There is no drift correction and no catch-up:
//! a paused host simply stops calling [`Scheduler::tick`].

use crate::config::EngineConfig;

/// Which cadences fired on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceFire {
    pub urgent: bool,
    pub normal: bool,
}

impl CadenceFire {
    pub fn any(self) -> bool {
        self.urgent || self.normal
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    urgent_interval: u64,
    normal_interval: u64,
    urgent_counter: u64,
    normal_counter: u64,
}

impl Scheduler {
    pub fn new(urgent_interval: u64, normal_interval: u64) -> Self {
        Self {
            urgent_interval: urgent_interval.max(1),
            normal_interval: normal_interval.max(1),
            urgent_counter: 0,
            normal_counter: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.urgent_interval_ticks, config.normal_interval_ticks)
    }

    /// Advance both counters by one tick.
    pub fn tick(&mut self) -> CadenceFire {
        self.urgent_counter += 1;
        self.normal_counter += 1;
        let mut fire = CadenceFire::default();
        if self.urgent_counter >= self.urgent_interval {
            self.urgent_counter = 0;
            fire.urgent = true;
        }
        if self.normal_counter >= self.normal_interval {
            self.normal_counter = 0;
            fire.normal = true;
        }
        fire
    }

    /// Ticks until the next normal cycle.
    pub fn ticks_until_normal(&self) -> u64 {
        self.normal_interval - self.normal_counter
    }
}
