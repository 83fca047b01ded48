//! SoonDueTasksEngine - 期限の近いタスクを分類して流し続けるループ
//!
//! # サイクル
//! 1. `now` を取り、`calculate_date_ranges(now, tz)` で範囲を計算する
//! 2. リポジトリの 5 本のストリーム（overdue, today, next_day, later_in_week, next_week）を開く
//! 3. 全ストリームが 1 回ずつ値を出したら `SoonDueTasks::Success` を流し、
//!    以後はどれかが更新されるたびに流し直す（combine-latest）
//! 4. 流すたびに次の起床時刻を計算し、`max(next_trigger - now, min_delay) + wake_padding` 後に 1 へ戻る
//!
//! タイムゾーンが変わったとき・`refresh()` が呼ばれたときも即座に 1 へ戻る。
//! ストリームがエラーを出したら `SoonDueTasks::Error` を 1 回だけ流して止まる（自動再試行はしない）。
//! 受け手のバッファが一杯の間は最新の値だけを持って待つ。この待ちも停止・タイムゾーン変更で中断される。
//!
//! # 停止
//! - `shutdown_and_join()` を呼ぶ
//! - subscription を drop する
//!
//! どちらの場合もストリームとスリープはすぐに破棄され、それ以降は何も流れない。

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::stream::{self, BoxStream, SelectAll, Stream, StreamExt};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{DateRanges, DueBucket, Task, calculate_date_ranges};
use crate::ports::{Clock, RepositoryError, TaskRepository, TimeZoneProvider};

/// エンジンが流す値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoonDueTasks {
    Success {
        overdue: Vec<Task>,
        today: Vec<Task>,
        next_day: Vec<Task>,
        later_in_week: Vec<Task>,
        next_week: Vec<Task>,
    },
    /// 終端。これ以降は何も流れない。
    Error(RepositoryError),
}

impl SoonDueTasks {
    /// 5 つのリストすべて（Error なら空）
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        let lists: [&[Task]; 5] = match self {
            SoonDueTasks::Success {
                overdue,
                today,
                next_day,
                later_in_week,
                next_week,
            } => [
                overdue.as_slice(),
                today.as_slice(),
                next_day.as_slice(),
                later_in_week.as_slice(),
                next_week.as_slice(),
            ],
            SoonDueTasks::Error(_) => [&[] as &[Task]; 5],
        };
        lists.into_iter().flatten()
    }

    /// バケットひとつ分のタスク（Error なら空）
    pub fn tasks_in(&self, bucket: DueBucket) -> &[Task] {
        let SoonDueTasks::Success {
            overdue,
            today,
            next_day,
            later_in_week,
            next_week,
        } = self
        else {
            return &[];
        };
        match bucket {
            DueBucket::Overdue => overdue,
            DueBucket::Today => today,
            DueBucket::NextDay => next_day,
            DueBucket::LaterInWeek => later_in_week,
            DueBucket::NextWeek => next_week,
        }
    }
}

/// 起床タイミングの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoonDueSettings {
    /// 起床までの最短待ち時間
    pub min_delay: Duration,
    /// 期限ちょうどではなく少し後に起きるための余白
    pub wake_padding: Duration,
    /// 未来の期限が無いときの起床間隔
    pub fallback_horizon: Duration,
}

impl Default for SoonDueSettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::seconds(1),
            wake_padding: Duration::milliseconds(100),
            fallback_horizon: Duration::days(1),
        }
    }
}

/// `now` より後で最も早い期限。無ければ `now + fallback_horizon`。
pub fn next_trigger<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    now: DateTime<Utc>,
    fallback_horizon: Duration,
) -> DateTime<Utc> {
    tasks
        .into_iter()
        .filter(|task| task.is_due_after(now))
        .filter_map(|task| task.due_at)
        .min()
        .unwrap_or(now + fallback_horizon)
}

/// 次の起床までの待ち時間
pub fn wake_delay(
    trigger: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &SoonDueSettings,
) -> std::time::Duration {
    let delay = (trigger - now).max(settings.min_delay) + settings.wake_padding;
    delay.to_std().unwrap_or_default()
}

/// 受け取られていない値をいくつまで溜めるか
pub const SUBSCRIPTION_BUFFER: usize = 16;

pub struct SoonDueTasksEngine<Tz: TimeZone> {
    tasks: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
    time_zone: Arc<dyn TimeZoneProvider<Tz>>,
    settings: SoonDueSettings,
}

impl<Tz> SoonDueTasksEngine<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        clock: Arc<dyn Clock>,
        time_zone: Arc<dyn TimeZoneProvider<Tz>>,
        settings: SoonDueSettings,
    ) -> Self {
        Self {
            tasks,
            clock,
            time_zone,
            settings,
        }
    }

    /// ループを起動する。tokio ランタイムの中で呼ぶこと。
    pub fn subscribe(&self) -> SoonDueTasksSubscription {
        let (updates_tx, updates) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());

        let cycle = EngineLoop {
            tasks: Arc::clone(&self.tasks),
            clock: Arc::clone(&self.clock),
            time_zone: self.time_zone.subscribe(),
            settings: self.settings,
            refresh: Arc::clone(&refresh),
            shutdown_rx,
            updates: updates_tx,
        };
        let join = tokio::spawn(cycle.run());

        SoonDueTasksSubscription {
            updates,
            refresh,
            shutdown_tx,
            join,
        }
    }
}

/// 購読ハンドル
/// - `next()` / `Stream` で値を受け取る
/// - drop するとループも止まる
/// - `shutdown_and_join()` で停止を待てる
pub struct SoonDueTasksSubscription {
    updates: mpsc::Receiver<SoonDueTasks>,
    refresh: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SoonDueTasksSubscription {
    /// 次の値。ループが止まったら None。
    pub async fn next(&mut self) -> Option<SoonDueTasks> {
        self.updates.recv().await
    }

    /// 今のサイクルを捨てて、すぐに範囲を計算し直す
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn request_shutdown(&self) {
        // receiver はすでに止まっているかもしれない
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let Self { updates, join, .. } = self;
        drop(updates);
        let _ = join.await;
    }
}

impl Stream for SoonDueTasksSubscription {
    type Item = SoonDueTasks;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.updates.poll_recv(cx)
    }
}

type IndexedTaskStream = BoxStream<'static, (usize, Result<Vec<Task>, RepositoryError>)>;

/// 5 本のストリームの combine-latest
struct LatestDueTasks {
    streams: SelectAll<IndexedTaskStream>,
    latest: [Option<Vec<Task>>; 5],
}

impl LatestDueTasks {
    fn open(tasks: &dyn TaskRepository, ranges: &DateRanges) -> Self {
        let sources = [
            tasks.observe_tasks_due_before(ranges.overdue_before),
            tasks.observe_tasks_due_between(ranges.today),
            tasks.observe_tasks_due_between(ranges.next_day),
            tasks.observe_tasks_due_between(ranges.later_in_week),
            tasks.observe_tasks_due_between(ranges.next_week),
        ];
        let streams = stream::select_all(
            sources
                .into_iter()
                .enumerate()
                .map(|(index, source)| source.map(move |item| (index, item)).boxed()),
        );
        Self {
            streams,
            latest: Default::default(),
        }
    }

    /// 次の Success か Error。全ストリームが終わったら None。
    ///
    /// キャンセルされても受け取り済みの値は失われない。
    async fn next(&mut self) -> Option<SoonDueTasks> {
        while let Some((index, item)) = self.streams.next().await {
            match item {
                Ok(tasks) => {
                    self.latest[index] = Some(tasks);
                    if let Some(snapshot) = self.snapshot() {
                        return Some(snapshot);
                    }
                }
                Err(e) => return Some(SoonDueTasks::Error(e)),
            }
        }
        None
    }

    fn snapshot(&self) -> Option<SoonDueTasks> {
        let [overdue, today, next_day, later_in_week, next_week] = &self.latest;
        Some(SoonDueTasks::Success {
            overdue: overdue.clone()?,
            today: today.clone()?,
            next_day: next_day.clone()?,
            later_in_week: later_in_week.clone()?,
            next_week: next_week.clone()?,
        })
    }
}

struct EngineLoop<Tz: TimeZone> {
    tasks: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
    time_zone: watch::Receiver<Tz>,
    settings: SoonDueSettings,
    refresh: Arc<Notify>,
    shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<SoonDueTasks>,
}

/// ループ 1 周の終わり方
enum CycleEnd {
    Restart,
    Stop,
}

impl<Tz> EngineLoop<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    async fn run(mut self) {
        let mut time_zone_open = true;
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }
            match self.cycle(&mut time_zone_open).await {
                CycleEnd::Restart => continue,
                CycleEnd::Stop => break,
            }
        }
        debug!("soon-due engine stopped");
    }

    async fn cycle(&mut self, time_zone_open: &mut bool) -> CycleEnd {
        let tz = self.time_zone.borrow_and_update().clone();
        let now = self.clock.now();
        let ranges = calculate_date_ranges(now, &tz);
        debug!(%now, next_week_end = %ranges.next_week.end, "soon-due cycle started");

        let mut latest = LatestDueTasks::open(self.tasks.as_ref(), &ranges);
        let mut streams_open = true;
        let mut wake_at: Option<Instant> = None;
        // 受け手の空きを待っている値。新しい snapshot が来たら置き換える。
        let mut pending: Option<SoonDueTasks> = None;
        let mut failed = false;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => return CycleEnd::Stop,
                _ = self.updates.closed() => return CycleEnd::Stop,
                changed = self.time_zone.changed(), if *time_zone_open && !failed => {
                    if changed.is_err() {
                        // provider が消えた。最後の値を使い続ける。
                        *time_zone_open = false;
                        continue;
                    }
                    info!("time zone changed, restarting soon-due cycle");
                    return CycleEnd::Restart;
                }
                _ = self.refresh.notified(), if !failed => {
                    debug!("soon-due refresh requested");
                    return CycleEnd::Restart;
                }
                _ = sleep_until(wake_at), if !failed => {
                    debug!("soon-due wake-up");
                    return CycleEnd::Restart;
                }
                permit = self.updates.reserve(), if pending.is_some() => {
                    let Ok(permit) = permit else {
                        return CycleEnd::Stop;
                    };
                    if let Some(item) = pending.take() {
                        let terminal = matches!(item, SoonDueTasks::Error(_));
                        permit.send(item);
                        if terminal {
                            return CycleEnd::Stop;
                        }
                    }
                }
                item = latest.next(), if streams_open && !failed => match item {
                    Some(SoonDueTasks::Error(e)) => {
                        warn!(error = %e, "soon-due stream failed");
                        pending = Some(SoonDueTasks::Error(e));
                        failed = true;
                    }
                    Some(snapshot) => {
                        let trigger = next_trigger(
                            snapshot.all_tasks(),
                            now,
                            self.settings.fallback_horizon,
                        );
                        let delay = wake_delay(trigger, self.clock.now(), &self.settings);
                        wake_at = Some(Instant::now() + delay);
                        debug!(%trigger, delay_ms = delay.as_millis() as u64, "soon-due wake-up scheduled");
                        pending = Some(snapshot);
                    }
                    None => streams_open = false,
                },
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
