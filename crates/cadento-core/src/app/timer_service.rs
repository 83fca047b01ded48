//! TimerService - タイマーのユースケース
//!
//! どの操作も同じ流れです：
//! 1. id でタイマーを読む（無ければ `NotFound`）
//! 2. `clock.now()` で時刻駆動の遷移を評価してから、要求された遷移を適用する
//! 3. リポジトリに保存して、新しい値を返す
//!
//! 同じ id への同時操作は直列化しない（後に書いた方が勝つ）。

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{
    LinkedTimerTask, NewTimer, Timer, TimerError, TimerEvent, TimerId,
};
use crate::ports::{
    Clock, IdGenerator, RepositoryError, TimerFilter, TimerListStream, TimerRepository,
    TimerSort, TimerStream,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerServiceError {
    #[error("timer not found: {0}")]
    NotFound(TimerId),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct TimerService<R: ?Sized> {
    timers: Arc<R>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: ?Sized> Clone for TimerService<R> {
    fn clone(&self) -> Self {
        Self {
            timers: Arc::clone(&self.timers),
            clock: Arc::clone(&self.clock),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<R> TimerService<R>
where
    R: TimerRepository + ?Sized,
{
    pub fn new(timers: Arc<R>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { timers, clock, ids }
    }

    pub async fn create(&self, new_timer: NewTimer) -> Result<Timer, TimerServiceError> {
        let timer = new_timer.into_timer(self.ids.generate_timer_id(), self.clock.now());
        self.timers.create_timer(timer.clone()).await?;
        debug!(timer_id = %timer.id(), kind = %timer.kind(), "timer created");
        Ok(timer)
    }

    pub async fn start(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Start).await
    }

    pub async fn pause(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Pause).await
    }

    pub async fn resume(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Resume).await
    }

    pub async fn stop(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Stop).await
    }

    pub async fn reset(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Reset).await
    }

    /// Pomodoro: 現在のフェーズを飛ばす
    pub async fn skip(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::Skip).await
    }

    /// FocusDividend: 集中時間を休憩クレジットに換える
    pub async fn switch_to_dividend(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.transition(id, TimerEvent::SwitchToDividend).await
    }

    /// 時刻駆動の遷移だけを評価する。変化があったときだけ保存する。
    pub async fn evaluate(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        let timer = self.load(id).await?;
        let evaluated = timer.evaluate(self.clock.now());
        if evaluated != timer {
            self.save(&evaluated).await?;
            debug!(
                timer_id = %id,
                kind = %evaluated.kind(),
                from = timer.state_name(),
                to = evaluated.state_name(),
                "timer advanced"
            );
        }
        Ok(evaluated)
    }

    pub async fn link_task(
        &self,
        id: TimerId,
        task: LinkedTimerTask,
    ) -> Result<Timer, TimerServiceError> {
        let task_id = task.task_id;
        let linked = self.load(id).await?.link_task(task);
        self.save(&linked).await?;
        debug!(timer_id = %id, task_id = %task_id, "task linked");
        Ok(linked)
    }

    pub async fn unlink_task(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        let unlinked = self.load(id).await?.unlink_task()?;
        self.save(&unlinked).await?;
        debug!(timer_id = %id, "task unlinked");
        Ok(unlinked)
    }

    pub async fn delete(&self, id: TimerId) -> Result<(), TimerServiceError> {
        self.timers
            .delete_timer(id)
            .await
            .map_err(|e| not_found_or(e, id))?;
        debug!(timer_id = %id, "timer deleted");
        Ok(())
    }

    pub async fn get(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.load(id).await
    }

    pub fn observe(&self, id: TimerId) -> TimerStream {
        self.timers.observe_timer(id)
    }

    pub fn list(&self, filter: TimerFilter, sort: TimerSort) -> TimerListStream {
        self.timers.observe_timers(filter, sort)
    }

    async fn load(&self, id: TimerId) -> Result<Timer, TimerServiceError> {
        self.timers
            .get_timer(id)
            .await?
            .ok_or(TimerServiceError::NotFound(id))
    }

    /// 読んだ後に消されていたら `NotFound`
    async fn save(&self, timer: &Timer) -> Result<(), TimerServiceError> {
        self.timers
            .update_timer(timer.clone())
            .await
            .map_err(|e| not_found_or(e, timer.id()))
    }

    async fn transition(&self, id: TimerId, event: TimerEvent) -> Result<Timer, TimerServiceError> {
        let timer = self.load(id).await?;
        let now = self.clock.now();
        let next = timer.evaluate(now).apply(event, now)?;
        self.save(&next).await?;
        debug!(
            timer_id = %id,
            kind = %next.kind(),
            event = event.name(),
            from = timer.state_name(),
            to = next.state_name(),
            "timer transition"
        );
        Ok(next)
    }
}

fn not_found_or(error: RepositoryError, id: TimerId) -> TimerServiceError {
    match error {
        RepositoryError::NotFound(_) => TimerServiceError::NotFound(id),
        other => TimerServiceError::Repository(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        FocusDividendTimerState, InvalidTransition, PomodoroPhase, PomodoroTimerSettings, PomodoroTimerState,
        RegularTimerState, TaskId, TaskName, TimerKind, TimerName,
    };
    use crate::impls::InMemoryTimerRepository;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use futures::StreamExt;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn service() -> (TimerService<InMemoryTimerRepository>, FixedClock) {
        let clock = FixedClock::new(t0());
        let service = TimerService::new(
            Arc::new(InMemoryTimerRepository::new()),
            Arc::new(clock.clone()),
            Arc::new(UlidGenerator::new(clock.clone())),
        );
        (service, clock)
    }

    fn name(value: &str) -> TimerName {
        TimerName::new(value).unwrap()
    }

    fn linked(task_name: &str) -> LinkedTimerTask {
        LinkedTimerTask {
            task_id: TaskId::from_ulid(Ulid::new()),
            name: TaskName::new(task_name).unwrap(),
            created_at: t0(),
            due_at: None,
        }
    }

    #[tokio::test]
    async fn regular_timer_accumulates_across_pause() {
        let (service, clock) = service();
        let timer = service
            .create(NewTimer::Regular { name: name("Reading") })
            .await
            .unwrap();

        service.start(timer.id()).await.unwrap();
        clock.advance(Duration::minutes(10));
        service.pause(timer.id()).await.unwrap();
        clock.advance(Duration::minutes(30));
        service.resume(timer.id()).await.unwrap();
        clock.advance(Duration::minutes(5));
        let stopped = service.stop(timer.id()).await.unwrap();

        let Timer::Regular(regular) = stopped else {
            panic!("expected a regular timer");
        };
        assert_eq!(
            regular.state,
            RegularTimerState::Inactive {
                since: clock.now(),
                accumulated: Some(Duration::minutes(15)),
            }
        );
    }

    #[tokio::test]
    async fn pomodoro_catches_up_before_applying_events() {
        let (service, clock) = service();
        let timer = service
            .create(NewTimer::Pomodoro {
                name: name("Deep work"),
                settings: PomodoroTimerSettings::default(),
            })
            .await
            .unwrap();
        service.start(timer.id()).await.unwrap();

        // focus 25 分を過ぎてからの pause は、いま始まった short break に対して行われる
        clock.advance(Duration::minutes(26));
        let paused = service.pause(timer.id()).await.unwrap();
        let Timer::Pomodoro(pomodoro) = paused else {
            panic!("expected a pomodoro timer");
        };
        match pomodoro.state {
            PomodoroTimerState::Paused {
                prior, remaining, ..
            } => {
                assert_eq!(prior, PomodoroPhase::ShortBreak { short_breaks_count: 1 });
                assert_eq!(remaining, Duration::minutes(5));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn evaluate_persists_only_when_state_changes() {
        let (service, clock) = service();
        let timer = service
            .create(NewTimer::FocusDividend {
                name: name("Focus"),
                settings: Default::default(),
            })
            .await
            .unwrap();
        service.start(timer.id()).await.unwrap();
        clock.advance(Duration::minutes(25));
        service.switch_to_dividend(timer.id()).await.unwrap();

        clock.advance(Duration::minutes(4));
        let still_spending = service.evaluate(timer.id()).await.unwrap();
        assert_eq!(still_spending.state_name(), "spending_dividend");

        clock.advance(Duration::minutes(1));
        let terminated = service.evaluate(timer.id()).await.unwrap();
        let Timer::FocusDividend(dividend) = service.get(timer.id()).await.unwrap() else {
            panic!("expected a focus dividend timer");
        };
        assert_eq!(terminated, Timer::FocusDividend(dividend.clone()));
        assert!(matches!(
            dividend.state,
            FocusDividendTimerState::Terminated {
                last_focus_earned: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn invalid_transition_is_reported_and_not_saved() {
        let (service, _clock) = service();
        let timer = service
            .create(NewTimer::Regular { name: name("Reading") })
            .await
            .unwrap();

        let err = service.pause(timer.id()).await.unwrap_err();
        assert_eq!(
            err,
            TimerServiceError::Timer(TimerError::InvalidTransition(InvalidTransition {
                kind: TimerKind::Regular,
                operation: "pause",
                state: "inactive",
            }))
        );
        assert_eq!(service.get(timer.id()).await.unwrap(), timer);
    }

    #[tokio::test]
    async fn link_and_unlink_task() {
        let (service, _clock) = service();
        let timer = service
            .create(NewTimer::Regular { name: name("Reading") })
            .await
            .unwrap();

        assert_eq!(
            service.unlink_task(timer.id()).await.unwrap_err(),
            TimerServiceError::Timer(TimerError::NoLinkedTask)
        );

        let task = linked("Write report");
        let with_task = service.link_task(timer.id(), task.clone()).await.unwrap();
        assert_eq!(with_task.linked_task(), Some(&task));

        let replaced = service
            .link_task(timer.id(), linked("Review PR"))
            .await
            .unwrap();
        assert_eq!(replaced.linked_task().unwrap().name.as_str(), "Review PR");

        let without = service.unlink_task(timer.id()).await.unwrap();
        assert_eq!(without.linked_task(), None);
    }

    #[tokio::test]
    async fn missing_timer_is_not_found() {
        let (service, _clock) = service();
        let missing = TimerId::from_ulid(Ulid::new());
        assert_eq!(
            service.start(missing).await.unwrap_err(),
            TimerServiceError::NotFound(missing)
        );
        assert_eq!(
            service.delete(missing).await.unwrap_err(),
            TimerServiceError::NotFound(missing)
        );
    }

    /// 読んだ直後に別の誰かが消したように振る舞うリポジトリ
    struct DeletedAfterRead(InMemoryTimerRepository);

    #[async_trait::async_trait]
    impl TimerRepository for DeletedAfterRead {
        async fn create_timer(&self, timer: Timer) -> Result<(), RepositoryError> {
            self.0.create_timer(timer).await
        }

        async fn update_timer(&self, timer: Timer) -> Result<(), RepositoryError> {
            self.0.update_timer(timer).await
        }

        async fn delete_timer(&self, id: TimerId) -> Result<(), RepositoryError> {
            self.0.delete_timer(id).await
        }

        async fn get_timer(&self, id: TimerId) -> Result<Option<Timer>, RepositoryError> {
            let found = self.0.get_timer(id).await?;
            if found.is_some() {
                self.0.delete_timer(id).await?;
            }
            Ok(found)
        }

        fn observe_timer(&self, id: TimerId) -> TimerStream {
            self.0.observe_timer(id)
        }

        fn observe_timers(&self, filter: TimerFilter, sort: TimerSort) -> TimerListStream {
            self.0.observe_timers(filter, sort)
        }
    }

    #[tokio::test]
    async fn timer_deleted_between_read_and_save_is_not_found() {
        let clock = FixedClock::new(t0());
        let service = TimerService::new(
            Arc::new(DeletedAfterRead(InMemoryTimerRepository::new())),
            Arc::new(clock.clone()),
            Arc::new(UlidGenerator::new(clock.clone())),
        );

        let started = service
            .create(NewTimer::Regular { name: name("Reading") })
            .await
            .unwrap();
        assert_eq!(
            service.start(started.id()).await.unwrap_err(),
            TimerServiceError::NotFound(started.id())
        );

        let linked_later = service
            .create(NewTimer::Regular { name: name("Writing") })
            .await
            .unwrap();
        assert_eq!(
            service
                .link_task(linked_later.id(), linked("Write report"))
                .await
                .unwrap_err(),
            TimerServiceError::NotFound(linked_later.id())
        );
    }

    #[tokio::test]
    async fn observe_follows_transitions_until_deleted() {
        let (service, _clock) = service();
        let timer = service
            .create(NewTimer::Regular { name: name("Reading") })
            .await
            .unwrap();
        let mut updates = service.observe(timer.id());
        assert_eq!(updates.next().await.unwrap().unwrap(), Some(timer.clone()));

        let started = service.start(timer.id()).await.unwrap();
        assert_eq!(updates.next().await.unwrap().unwrap(), Some(started));

        service.delete(timer.id()).await.unwrap();
        assert_eq!(updates.next().await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn list_only_active_timers() {
        let (service, _clock) = service();
        let idle = service
            .create(NewTimer::Regular { name: name("Idle") })
            .await
            .unwrap();
        let busy = service
            .create(NewTimer::Regular { name: name("Busy") })
            .await
            .unwrap();
        service.start(busy.id()).await.unwrap();

        let filter = TimerFilter {
            kind: None,
            active_only: true,
        };
        let mut list = service.list(filter, TimerSort::default());
        let active = list.next().await.unwrap().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), busy.id());
        assert_ne!(active[0].id(), idle.id());
    }
}
