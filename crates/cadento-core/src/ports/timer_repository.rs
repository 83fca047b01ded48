//! TimerRepository port - タイマーの永続化

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::RepositoryError;
use crate::domain::{
    FocusDividendTimer, PomodoroTimer, RegularTimer, Timer, TimerId, TimerKind,
};

pub type TimerStream = BoxStream<'static, Result<Option<Timer>, RepositoryError>>;
pub type TimerListStream = BoxStream<'static, Result<Vec<Timer>, RepositoryError>>;

/// 一覧の絞り込み条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerFilter {
    pub kind: Option<TimerKind>,
    pub active_only: bool,
}

impl TimerFilter {
    pub fn matches(&self, timer: &Timer) -> bool {
        self.kind.is_none_or(|kind| timer.kind() == kind) && (!self.active_only || timer.is_active())
    }
}

/// 一覧の並び順
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerSort {
    #[default]
    CreatedAtAscending,
    CreatedAtDescending,
    NameAscending,
}

impl TimerSort {
    pub fn sort(&self, timers: &mut [Timer]) {
        match self {
            TimerSort::CreatedAtAscending => timers.sort_by_key(|t| t.created_at()),
            TimerSort::CreatedAtDescending => {
                timers.sort_by_key(|t| std::cmp::Reverse(t.created_at()))
            }
            TimerSort::NameAscending => {
                timers.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()))
            }
        }
    }
}

#[async_trait]
pub trait TimerRepository: Send + Sync + 'static {
    async fn create_timer(&self, timer: Timer) -> Result<(), RepositoryError>;

    async fn update_timer(&self, timer: Timer) -> Result<(), RepositoryError>;

    async fn delete_timer(&self, id: TimerId) -> Result<(), RepositoryError>;

    async fn get_timer(&self, id: TimerId) -> Result<Option<Timer>, RepositoryError>;

    /// 現在値を流し、以後は変更のたびに流す。削除されたら `None`。
    fn observe_timer(&self, id: TimerId) -> TimerStream;

    fn observe_timers(&self, filter: TimerFilter, sort: TimerSort) -> TimerListStream;

    async fn get_regular_timer(&self, id: TimerId) -> Result<Option<RegularTimer>, RepositoryError> {
        Ok(match self.get_timer(id).await? {
            Some(Timer::Regular(timer)) => Some(timer),
            _ => None,
        })
    }

    async fn get_pomodoro_timer(
        &self,
        id: TimerId,
    ) -> Result<Option<PomodoroTimer>, RepositoryError> {
        Ok(match self.get_timer(id).await? {
            Some(Timer::Pomodoro(timer)) => Some(timer),
            _ => None,
        })
    }

    async fn get_focus_dividend_timer(
        &self,
        id: TimerId,
    ) -> Result<Option<FocusDividendTimer>, RepositoryError> {
        Ok(match self.get_timer(id).await? {
            Some(Timer::FocusDividend(timer)) => Some(timer),
            _ => None,
        })
    }
}
