//! Timer aggregates.
//!
//! Timer は種類ごとの struct（RegularTimer, PomodoroTimer, FocusDividendTimer）を
//! `Timer` enum で包んだ閉じた階層です。各 struct は自分の種類の状態しか持てないので、
//! 「Pomodoro timer の状態は常に Pomodoro の状態」という不変条件は型で保証されます。
//!
//! 操作はすべて新しい値を返し、元の値は変更しません。

use chrono::{DateTime, Utc};

use super::focus_dividend::{FocusDividendTimerSettings, FocusDividendTimerState};
use super::linked_task::LinkedTimerTask;
use super::pomodoro::{PomodoroTimerSettings, PomodoroTimerState};
use super::regular::RegularTimerState;
use super::TimerKind;
use crate::domain::errors::{InvalidTransition, TimerError};
use crate::domain::ids::TimerId;
use crate::domain::names::TimerName;

/// Timer に対する明示的な操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    Skip,
    SwitchToDividend,
}

impl TimerEvent {
    pub fn name(self) -> &'static str {
        match self {
            TimerEvent::Start => "start",
            TimerEvent::Pause => "pause",
            TimerEvent::Resume => "resume",
            TimerEvent::Stop => "stop",
            TimerEvent::Reset => "reset",
            TimerEvent::Skip => "skip",
            TimerEvent::SwitchToDividend => "switch_to_dividend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularTimer {
    pub id: TimerId,
    pub name: TimerName,
    pub created_at: DateTime<Utc>,
    pub state: RegularTimerState,
    pub linked_task: Option<LinkedTimerTask>,
}

impl RegularTimer {
    pub fn new(id: TimerId, name: TimerName, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            created_at: now,
            state: RegularTimerState::initial(now),
            linked_task: None,
        }
    }

    pub fn apply(&self, event: TimerEvent, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        let state = match event {
            TimerEvent::Start => self.state.start(now)?,
            TimerEvent::Pause => self.state.pause(now)?,
            TimerEvent::Resume => self.state.resume(now)?,
            TimerEvent::Stop => self.state.stop(now)?,
            TimerEvent::Reset => self.state.reset(now),
            TimerEvent::Skip | TimerEvent::SwitchToDividend => {
                return Err(InvalidTransition::new(
                    TimerKind::Regular,
                    event.name(),
                    self.state.name(),
                ));
            }
        };
        Ok(Self {
            state,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    pub id: TimerId,
    pub name: TimerName,
    pub created_at: DateTime<Utc>,
    pub state: PomodoroTimerState,
    pub settings: PomodoroTimerSettings,
    pub linked_task: Option<LinkedTimerTask>,
}

impl PomodoroTimer {
    pub fn new(
        id: TimerId,
        name: TimerName,
        settings: PomodoroTimerSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            created_at: now,
            state: PomodoroTimerState::initial(now),
            settings,
            linked_task: None,
        }
    }

    pub fn apply(&self, event: TimerEvent, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        let state = match event {
            TimerEvent::Start => self.state.start(now)?,
            TimerEvent::Pause => self.state.pause(&self.settings, now)?,
            TimerEvent::Resume => self.state.resume(&self.settings, now)?,
            TimerEvent::Stop => self.state.stop(now)?,
            TimerEvent::Reset => PomodoroTimerState::initial(now),
            TimerEvent::Skip => self.state.skip(&self.settings, now)?,
            TimerEvent::SwitchToDividend => {
                return Err(InvalidTransition::new(
                    TimerKind::Pomodoro,
                    event.name(),
                    self.state.name(),
                ));
            }
        };
        Ok(Self {
            state,
            ..self.clone()
        })
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> Self {
        Self {
            state: self.state.evaluate(&self.settings, now),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusDividendTimer {
    pub id: TimerId,
    pub name: TimerName,
    pub created_at: DateTime<Utc>,
    pub state: FocusDividendTimerState,
    pub settings: FocusDividendTimerSettings,
    pub linked_task: Option<LinkedTimerTask>,
}

impl FocusDividendTimer {
    pub fn new(
        id: TimerId,
        name: TimerName,
        settings: FocusDividendTimerSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            created_at: now,
            state: FocusDividendTimerState::initial(now),
            settings,
            linked_task: None,
        }
    }

    pub fn apply(&self, event: TimerEvent, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        let state = match event {
            TimerEvent::Start => self.state.start(now)?,
            TimerEvent::Stop => self.state.stop(now)?,
            TimerEvent::SwitchToDividend => self.state.switch_to_dividend(&self.settings, now)?,
            TimerEvent::Reset => FocusDividendTimerState::initial(now),
            TimerEvent::Pause | TimerEvent::Resume | TimerEvent::Skip => {
                return Err(InvalidTransition::new(
                    TimerKind::FocusDividend,
                    event.name(),
                    self.state.name(),
                ));
            }
        };
        Ok(Self {
            state,
            ..self.clone()
        })
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> Self {
        Self {
            state: self.state.evaluate(now),
            ..self.clone()
        }
    }
}

/// Timer（種類は閉じている）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    Regular(RegularTimer),
    Pomodoro(PomodoroTimer),
    FocusDividend(FocusDividendTimer),
}

impl Timer {
    pub fn id(&self) -> TimerId {
        match self {
            Timer::Regular(t) => t.id,
            Timer::Pomodoro(t) => t.id,
            Timer::FocusDividend(t) => t.id,
        }
    }

    pub fn name(&self) -> &TimerName {
        match self {
            Timer::Regular(t) => &t.name,
            Timer::Pomodoro(t) => &t.name,
            Timer::FocusDividend(t) => &t.name,
        }
    }

    pub fn kind(&self) -> TimerKind {
        match self {
            Timer::Regular(_) => TimerKind::Regular,
            Timer::Pomodoro(_) => TimerKind::Pomodoro,
            Timer::FocusDividend(_) => TimerKind::FocusDividend,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Timer::Regular(t) => t.created_at,
            Timer::Pomodoro(t) => t.created_at,
            Timer::FocusDividend(t) => t.created_at,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Timer::Regular(t) => t.state.name(),
            Timer::Pomodoro(t) => t.state.name(),
            Timer::FocusDividend(t) => t.state.name(),
        }
    }

    /// 時間が進んでいる状態か（Running / Focus / 休憩中 / Focusing / SpendingDividend）
    pub fn is_active(&self) -> bool {
        match self {
            Timer::Regular(t) => t.state.is_running(),
            Timer::Pomodoro(t) => t.state.active_phase().is_some(),
            Timer::FocusDividend(t) => !matches!(
                t.state,
                FocusDividendTimerState::Terminated { .. }
            ),
        }
    }

    pub fn linked_task(&self) -> Option<&LinkedTimerTask> {
        match self {
            Timer::Regular(t) => t.linked_task.as_ref(),
            Timer::Pomodoro(t) => t.linked_task.as_ref(),
            Timer::FocusDividend(t) => t.linked_task.as_ref(),
        }
    }

    pub fn apply(&self, event: TimerEvent, now: DateTime<Utc>) -> Result<Self, TimerError> {
        Ok(match self {
            Timer::Regular(t) => Timer::Regular(t.apply(event, now)?),
            Timer::Pomodoro(t) => Timer::Pomodoro(t.apply(event, now)?),
            Timer::FocusDividend(t) => Timer::FocusDividend(t.apply(event, now)?),
        })
    }

    /// 時刻駆動の遷移を評価する。Regular timer は時間で遷移しない。
    pub fn evaluate(&self, now: DateTime<Utc>) -> Self {
        match self {
            Timer::Regular(_) => self.clone(),
            Timer::Pomodoro(t) => Timer::Pomodoro(t.evaluate(now)),
            Timer::FocusDividend(t) => Timer::FocusDividend(t.evaluate(now)),
        }
    }

    /// タスクを紐づける（既存のリンクは置き換える）
    pub fn link_task(&self, task: LinkedTimerTask) -> Self {
        self.with_linked_task(Some(task))
    }

    /// タスクの紐づけを外す。紐づいていなければ `TimerError::NoLinkedTask`。
    pub fn unlink_task(&self) -> Result<Self, TimerError> {
        if self.linked_task().is_none() {
            return Err(TimerError::NoLinkedTask);
        }
        Ok(self.with_linked_task(None))
    }

    fn with_linked_task(&self, linked_task: Option<LinkedTimerTask>) -> Self {
        match self {
            Timer::Regular(t) => Timer::Regular(RegularTimer {
                linked_task,
                ..t.clone()
            }),
            Timer::Pomodoro(t) => Timer::Pomodoro(PomodoroTimer {
                linked_task,
                ..t.clone()
            }),
            Timer::FocusDividend(t) => Timer::FocusDividend(FocusDividendTimer {
                linked_task,
                ..t.clone()
            }),
        }
    }
}

impl From<RegularTimer> for Timer {
    fn from(timer: RegularTimer) -> Self {
        Timer::Regular(timer)
    }
}

impl From<PomodoroTimer> for Timer {
    fn from(timer: PomodoroTimer) -> Self {
        Timer::Pomodoro(timer)
    }
}

impl From<FocusDividendTimer> for Timer {
    fn from(timer: FocusDividendTimer) -> Self {
        Timer::FocusDividend(timer)
    }
}

/// 作成時の入力（id と作成時刻は use case 側で割り当てる）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewTimer {
    Regular {
        name: TimerName,
    },
    Pomodoro {
        name: TimerName,
        settings: PomodoroTimerSettings,
    },
    FocusDividend {
        name: TimerName,
        settings: FocusDividendTimerSettings,
    },
}

impl NewTimer {
    pub fn into_timer(self, id: TimerId, now: DateTime<Utc>) -> Timer {
        match self {
            NewTimer::Regular { name } => RegularTimer::new(id, name, now).into(),
            NewTimer::Pomodoro { name, settings } => {
                PomodoroTimer::new(id, name, settings, now).into()
            }
            NewTimer::FocusDividend { name, settings } => {
                FocusDividendTimer::new(id, name, settings, now).into()
            }
        }
    }
}
