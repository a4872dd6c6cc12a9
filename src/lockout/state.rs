use serde::Serialize;

use crate::error::StatusBanner;

pub const LOCK_DURATION_SECS: u32 = 30;

/// Client-side rendering of a server-declared lockout.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub locked: bool,
    pub remaining_seconds: u32,
    pub total_duration: u32,
    /// Bumped on every arm/clear so a ticker can tell it has been replaced.
    #[serde(skip)]
    pub epoch: u64,
}

impl Default for LockState {
    fn default() -> Self {
        Self::new(LOCK_DURATION_SECS)
    }
}

impl LockState {
    pub fn new(total_duration: u32) -> Self {
        Self {
            locked: false,
            remaining_seconds: 0,
            total_duration: total_duration.max(1),
            epoch: 0,
        }
    }

    pub fn arm(&mut self) -> u64 {
        self.epoch += 1;
        self.remaining_seconds = self.total_duration;
        self.locked = true;
        self.epoch
    }

    pub fn clear(&mut self) -> u64 {
        self.epoch += 1;
        self.remaining_seconds = 0;
        self.locked = false;
        self.epoch
    }

    /// One second elapsed. Returns whether the lock still holds.
    pub fn tick(&mut self) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.locked = self.remaining_seconds > 0;
        self.locked
    }

    pub fn progress(&self) -> f64 {
        f64::from(self.remaining_seconds) / f64::from(self.total_duration)
    }

    pub fn banner(&self) -> Option<StatusBanner> {
        self.locked.then(|| {
            StatusBanner::new(
                format!(
                    "Account locked. Please wait {}s to retry.",
                    self.remaining_seconds
                ),
                false,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_down_and_unlocks_at_zero() {
        let mut state = LockState::default();
        state.arm();
        assert_eq!(state.remaining_seconds, 30);
        assert_eq!(state.progress(), 1.0);

        for _ in 0..15 {
            state.tick();
        }
        assert_eq!(state.progress(), 0.5);

        for _ in 0..14 {
            assert!(state.tick());
        }
        assert!(!state.tick());
        assert!(!state.locked);

        state.tick();
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.banner(), None);
    }

    #[test]
    fn arm_and_clear_move_the_epoch() {
        let mut state = LockState::default();
        let first = state.arm();
        let second = state.clear();
        assert!(second > first);
        assert_eq!(state.arm(), second + 1);
        assert!(state.banner().unwrap().message.contains("30s"));
    }
}
