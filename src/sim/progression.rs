/// Level progression: current level, its time budget, and the countdown.
///
/// Remaining time is always derived from the clock passed in, never
/// decremented per tick, so it does not depend on the tick rate.
/// The clock keeps running through pause and settings; the caller only
/// checks for expiry while the level is being played.

use tracing::info;

use crate::config::TimingConfig;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Advance {
    Next(u32),
    GameComplete,
}

#[derive(Clone, Debug)]
pub struct LevelProgression {
    base_secs: u64,
    step_secs: u64,
    max_level: u32,

    level: u32,
    time_limit_ms: u64,
    started_ms: u64,
    timer_active: bool,
}

impl LevelProgression {
    pub fn new(timing: &TimingConfig) -> Self {
        let mut p = LevelProgression {
            base_secs: timing.level_base_secs,
            step_secs: timing.level_step_secs,
            max_level: timing.max_level.max(1),
            level: 1,
            time_limit_ms: 0,
            started_ms: 0,
            timer_active: false,
        };
        p.time_limit_ms = p.budget_ms(1);
        p
    }

    /// Time budget for level `n`, saturating at zero.
    pub fn budget_ms(&self, level: u32) -> u64 {
        let steps = u64::from(level.saturating_sub(1));
        self.base_secs.saturating_sub(steps * self.step_secs) * 1000
    }

    pub fn start_level(&mut self, level: u32, now_ms: u64) {
        self.level = level.clamp(1, self.max_level);
        self.time_limit_ms = self.budget_ms(self.level);
        self.started_ms = now_ms;
        self.timer_active = true;
        info!(level = self.level, limit_ms = self.time_limit_ms, "level started");
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.time_limit_ms.saturating_sub(now_ms.saturating_sub(self.started_ms))
    }

    /// True exactly once: on the first tick at which the countdown is zero.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if !self.timer_active {
            return false;
        }
        if self.remaining_ms(now_ms) == 0 {
            self.timer_active = false;
            info!(level = self.level, "level timer expired");
            return true;
        }
        false
    }

    /// Stop the countdown without firing it (level finished).
    pub fn stop(&mut self) {
        self.timer_active = false;
    }

    /// Move to the next level, or report that the last one is done.
    pub fn advance(&mut self, now_ms: u64) -> Advance {
        if self.level >= self.max_level {
            self.timer_active = false;
            return Advance::GameComplete;
        }
        let next = self.level + 1;
        self.start_level(next, now_ms);
        Advance::Next(next)
    }
}
