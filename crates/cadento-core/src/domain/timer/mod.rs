//! Timer - 3 種類のタイマー状態機械と Timer 集約
//!
//! - **regular**: 普通のストップウォッチ
//! - **pomodoro**: Focus / ShortBreak / LongBreak のサイクル
//! - **focus_dividend**: 集中時間を休憩クレジットに換える
//! - **entity**: 状態機械を所有する Timer 集約
//!
//! 状態機械はすべて `(State, Settings, now) -> State` の純粋関数です。
//! 内部にタイマーやスケジューラは持たず、時間の進行は呼び出し側が新しい `now` で
//! 再評価することで駆動します。

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod entity;
pub mod focus_dividend;
pub mod linked_task;
pub mod pomodoro;
pub mod regular;

pub use self::entity::{FocusDividendTimer, NewTimer, PomodoroTimer, RegularTimer, Timer, TimerEvent};
pub use self::focus_dividend::{FocusDividendTimerSettings, FocusDividendTimerState};
pub use self::linked_task::LinkedTimerTask;
pub use self::pomodoro::{PomodoroPhase, PomodoroTimerSettings, PomodoroTimerState};
pub use self::regular::RegularTimerState;

/// Timer の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Regular,
    Pomodoro,
    FocusDividend,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Regular => write!(f, "regular"),
            TimerKind::Pomodoro => write!(f, "pomodoro"),
            TimerKind::FocusDividend => write!(f, "focus_dividend"),
        }
    }
}
