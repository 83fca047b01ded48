//! InMemoryTimerRepository - 開発・テスト用のタイマー保存先

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::watch;

use super::watch_stream::watch_stream;
use crate::domain::{Timer, TimerId};
use crate::ports::{
    RepositoryError, TimerFilter, TimerListStream, TimerRepository, TimerSort, TimerStream,
};

pub struct InMemoryTimerRepository {
    timers: watch::Sender<HashMap<TimerId, Timer>>,
}

impl InMemoryTimerRepository {
    pub fn new() -> Self {
        let (timers, _) = watch::channel(HashMap::new());
        Self { timers }
    }

    pub fn len(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.borrow().is_empty()
    }
}

impl Default for InMemoryTimerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimerRepository for InMemoryTimerRepository {
    async fn create_timer(&self, timer: Timer) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.timers.send_if_modified(|timers| {
            let id = timer.id();
            if timers.contains_key(&id) {
                result = Err(RepositoryError::AlreadyExists(id.to_string()));
                return false;
            }
            timers.insert(id, timer);
            true
        });
        result
    }

    async fn update_timer(&self, timer: Timer) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.timers.send_if_modified(|timers| match timers.get_mut(&timer.id()) {
            Some(existing) if *existing == timer => false,
            Some(existing) => {
                *existing = timer;
                true
            }
            None => {
                result = Err(RepositoryError::NotFound(timer.id().to_string()));
                false
            }
        });
        result
    }

    async fn delete_timer(&self, id: TimerId) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.timers.send_if_modified(|timers| {
            if timers.remove(&id).is_none() {
                result = Err(RepositoryError::NotFound(id.to_string()));
                return false;
            }
            true
        });
        result
    }

    async fn get_timer(&self, id: TimerId) -> Result<Option<Timer>, RepositoryError> {
        Ok(self.timers.borrow().get(&id).cloned())
    }

    fn observe_timer(&self, id: TimerId) -> TimerStream {
        watch_stream(self.timers.subscribe(), move |timers: &HashMap<TimerId, Timer>| {
            timers.get(&id).cloned()
        })
    }

    fn observe_timers(&self, filter: TimerFilter, sort: TimerSort) -> TimerListStream {
        watch_stream(self.timers.subscribe(), move |timers: &HashMap<TimerId, Timer>| {
            let mut matching: Vec<Timer> =
                timers.values().filter(|t| filter.matches(t)).cloned().collect();
            sort.sort(&mut matching);
            matching
        })
    }
}
