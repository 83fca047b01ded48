//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定は `build()` 時に検証する（不正なら `BuildError::Config`）
//! - 必須の ports（TimerRepository, TaskRepository, TimeZoneProvider）が
//!   揃っていなければ `BuildError::MissingComponents`
//! - Clock と IdGenerator は省略可能（SystemClock, UlidGenerator）

use std::sync::Arc;

use chrono::TimeZone;
use thiserror::Error;

use super::soon_due_tasks::SoonDueTasksEngine;
use super::task_service::TaskService;
use super::timer_service::TimerService;
use crate::config::{ConfigError, CoreConfig, CoreSettings};
use crate::domain::{NewTimer, TimerName};
use crate::ports::{
    Clock, IdGenerator, SystemClock, TaskRepository, TimeZoneProvider, TimerRepository,
    UlidGenerator,
};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These ports must be provided before build().")]
    MissingComponents(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(CoreConfig::from_toml_str(&text)?)
///     .timer_repository(Arc::new(InMemoryTimerRepository::new()))
///     .task_repository(Arc::new(InMemoryTaskRepository::new()))
///     .time_zone(Arc::new(WatchTimeZoneProvider::new(Utc)))
///     .build()?;
/// ```
pub struct AppBuilder<Tz: TimeZone> {
    config: CoreConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    timers: Option<Arc<dyn TimerRepository>>,
    tasks: Option<Arc<dyn TaskRepository>>,
    time_zone: Option<Arc<dyn TimeZoneProvider<Tz>>>,
}

impl<Tz> AppBuilder<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
            clock: None,
            ids: None,
            timers: None,
            tasks: None,
            time_zone: None,
        }
    }

    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn timer_repository(mut self, timers: Arc<dyn TimerRepository>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn task_repository(mut self, tasks: Arc<dyn TaskRepository>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn time_zone(mut self, time_zone: Arc<dyn TimeZoneProvider<Tz>>) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - 必須の ports が全て設定されているか
    /// - 設定値が範囲内か
    pub fn build(self) -> Result<App<Tz>, BuildError> {
        let mut missing = Vec::new();
        if self.timers.is_none() {
            missing.push("timer_repository");
        }
        if self.tasks.is_none() {
            missing.push("task_repository");
        }
        if self.time_zone.is_none() {
            missing.push("time_zone");
        }
        let (Some(timers), Some(tasks), Some(time_zone)) =
            (self.timers, self.tasks, self.time_zone)
        else {
            return Err(BuildError::MissingComponents(missing));
        };

        let settings = self.config.validate()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(App {
            settings,
            timers: TimerService::new(timers, Arc::clone(&clock), Arc::clone(&ids)),
            tasks: TaskService::new(Arc::clone(&tasks), Arc::clone(&clock), ids),
            soon_due: SoonDueTasksEngine::new(tasks, clock, time_zone, settings.soon_due),
        })
    }
}

impl<Tz> Default for AppBuilder<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// App はワイヤリング済みのユースケース一式
pub struct App<Tz: TimeZone> {
    pub settings: CoreSettings,
    pub timers: TimerService<dyn TimerRepository>,
    pub tasks: TaskService<dyn TaskRepository>,
    pub soon_due: SoonDueTasksEngine<Tz>,
}

impl<Tz: TimeZone> App<Tz> {
    /// 設定済みの Pomodoro 設定でタイマーを作る入力
    pub fn new_pomodoro_timer(&self, name: TimerName) -> NewTimer {
        NewTimer::Pomodoro {
            name,
            settings: self.settings.pomodoro,
        }
    }

    pub fn new_focus_dividend_timer(&self, name: TimerName) -> NewTimer {
        NewTimer::FocusDividend {
            name,
            settings: self.settings.focus_dividend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PomodoroTimerState, Timer};
    use crate::impls::{InMemoryTaskRepository, InMemoryTimerRepository, WatchTimeZoneProvider};
    use crate::ports::FixedClock;
    use chrono::{Duration, Utc};

    #[test]
    fn build_fails_with_missing_components() {
        let result = AppBuilder::<Utc>::new()
            .timer_repository(Arc::new(InMemoryTimerRepository::new()))
            .build();

        match result {
            Err(BuildError::MissingComponents(missing)) => {
                assert_eq!(missing, vec!["task_repository", "time_zone"]);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected build to fail"),
        }
    }

    #[test]
    fn build_fails_with_invalid_config() {
        let config = CoreConfig::from_toml_str("[focus_dividend]\nfocus_per_dividend_ratio = 99")
            .unwrap();
        let result = AppBuilder::<Utc>::new()
            .config(config)
            .timer_repository(Arc::new(InMemoryTimerRepository::new()))
            .task_repository(Arc::new(InMemoryTaskRepository::new()))
            .time_zone(Arc::new(WatchTimeZoneProvider::new(Utc)))
            .build();

        assert!(matches!(result, Err(BuildError::Config(ConfigError::Invalid(_)))));
    }

    #[tokio::test]
    async fn configured_pomodoro_settings_reach_new_timers() {
        let config = CoreConfig::from_toml_str("[pomodoro]\nfocus_minutes = 50").unwrap();
        let clock = FixedClock::new(Utc::now());
        let app = AppBuilder::<Utc>::new()
            .config(config)
            .clock(Arc::new(clock.clone()))
            .timer_repository(Arc::new(InMemoryTimerRepository::new()))
            .task_repository(Arc::new(InMemoryTaskRepository::new()))
            .time_zone(Arc::new(WatchTimeZoneProvider::new(Utc)))
            .build()
            .unwrap();

        let new_timer = app.new_pomodoro_timer(TimerName::new("Deep work").unwrap());
        let timer = app.timers.create(new_timer).await.unwrap();
        app.timers.start(timer.id()).await.unwrap();

        // 25 分では終わらない
        clock.advance(Duration::minutes(30));
        let Timer::Pomodoro(pomodoro) = app.timers.evaluate(timer.id()).await.unwrap() else {
            panic!("expected a pomodoro timer");
        };
        assert!(matches!(pomodoro.state, PomodoroTimerState::Focus { .. }));
    }
}
