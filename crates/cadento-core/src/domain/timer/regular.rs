//! Regular timer state machine.
//!
//! State transitions:
//! - Inactive -> Running (start)
//! - Running -> Paused (pause)
//! - Paused -> Running (start / resume)
//! - Running | Paused -> Inactive (stop, keeps accumulated time)
//! - any -> Inactive (reset, discards accumulated time)
//!
//! 経過時間は保存しない。保存するのはスナップショットの時刻だけで、
//! 経過時間は読み出し時に `elapsed(now)` で導出する。

use chrono::{DateTime, Duration, Utc};

use super::TimerKind;
use crate::domain::errors::InvalidTransition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegularTimerState {
    Inactive {
        since: DateTime<Utc>,
        accumulated: Option<Duration>,
    },
    Running {
        started_at: DateTime<Utc>,
        accumulated_before_start: Duration,
    },
    Paused {
        paused_at: DateTime<Utc>,
        accumulated: Duration,
    },
}

impl RegularTimerState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        RegularTimerState::Inactive {
            since: now,
            accumulated: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegularTimerState::Inactive { .. } => "inactive",
            RegularTimerState::Running { .. } => "running",
            RegularTimerState::Paused { .. } => "paused",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RegularTimerState::Running { .. })
    }

    /// `accumulated + (running ? now - started_at : 0)`
    ///
    /// `now` が `started_at` より前なら実行中の分は 0 とみなす。
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self {
            RegularTimerState::Inactive { accumulated, .. } => {
                accumulated.unwrap_or_else(Duration::zero)
            }
            RegularTimerState::Running {
                started_at,
                accumulated_before_start,
            } => *accumulated_before_start + (now - *started_at).max(Duration::zero()),
            RegularTimerState::Paused { accumulated, .. } => *accumulated,
        }
    }

    /// Inactive | Paused -> Running. Accumulated time is carried forward.
    pub fn start(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            RegularTimerState::Inactive { accumulated, .. } => Ok(RegularTimerState::Running {
                started_at: now,
                accumulated_before_start: accumulated.unwrap_or_else(Duration::zero),
            }),
            RegularTimerState::Paused { accumulated, .. } => Ok(RegularTimerState::Running {
                started_at: now,
                accumulated_before_start: *accumulated,
            }),
            RegularTimerState::Running { .. } => Err(self.reject("start")),
        }
    }

    /// Paused -> Running.
    pub fn resume(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            RegularTimerState::Paused { .. } => self.start(now),
            _ => Err(self.reject("resume")),
        }
    }

    /// Running -> Paused. The running slice is realized into the total here.
    pub fn pause(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            RegularTimerState::Running { .. } => Ok(RegularTimerState::Paused {
                paused_at: now,
                accumulated: self.elapsed(now),
            }),
            _ => Err(self.reject("pause")),
        }
    }

    /// Running | Paused -> Inactive, keeping the accumulated total.
    pub fn stop(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            RegularTimerState::Running { .. } | RegularTimerState::Paused { .. } => {
                Ok(RegularTimerState::Inactive {
                    since: now,
                    accumulated: Some(self.elapsed(now)),
                })
            }
            RegularTimerState::Inactive { .. } => Err(self.reject("stop")),
        }
    }

    /// any -> Inactive, discarding the accumulated total.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        RegularTimerState::initial(now)
    }

    fn reject(&self, operation: &'static str) -> InvalidTransition {
        InvalidTransition::new(TimerKind::Regular, operation, self.name())
    }
}
