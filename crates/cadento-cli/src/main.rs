use std::env;
use std::sync::Arc;

use anyhow::Context;
use cadento_core::app::{App, AppBuilder, SoonDueTasks};
use cadento_core::domain::{
    DueBucket, LinkedTimerTask, NewTask, Task, TaskName, Timer, TimerName, calculate_date_ranges,
};
use cadento_core::impls::{InMemoryTaskRepository, InMemoryTimerRepository, WatchTimeZoneProvider};
use cadento_core::CoreConfig;
use chrono::{Duration, FixedOffset, Local, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 設定ファイルのパス（省略時はデフォルト設定）
const CONFIG_ENV: &str = "CADENTO_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) 設定を読む
    let config = match env::var(CONFIG_ENV) {
        Ok(path) => CoreConfig::load(&path).with_context(|| format!("loading {path}"))?,
        Err(_) => CoreConfig::default(),
    };

    // (B) in-memory の ports でワイヤリング
    let local_offset = *Local::now().offset();
    let time_zone = Arc::new(WatchTimeZoneProvider::new(local_offset));
    let app = AppBuilder::<FixedOffset>::new()
        .config(config)
        .timer_repository(Arc::new(InMemoryTimerRepository::new()))
        .task_repository(Arc::new(InMemoryTaskRepository::new()))
        .time_zone(time_zone)
        .build()?;
    info!(offset = %local_offset, "cadento ready");

    // (C) タスクを投入
    let now = Utc::now();
    let zone = &local_offset;
    let report = create_task(&app, zone, "Write weekly report", now + Duration::hours(3)).await?;
    create_task(&app, zone, "Pay rent", now - Duration::hours(1)).await?;
    create_task(&app, zone, "Dentist", now + Duration::days(1)).await?;
    create_task(&app, zone, "Quarterly review", now + Duration::days(8)).await?;

    // (D) 期限の近いタスクを購読
    let mut soon_due = app.soon_due.subscribe();
    if let Some(snapshot) = soon_due.next().await {
        print_snapshot(&snapshot);
    }

    // (E) Pomodoro を動かす
    let new_timer = app.new_pomodoro_timer(TimerName::new("Deep work")?);
    let timer = app.timers.create(new_timer).await?;
    app.timers
        .link_task(timer.id(), LinkedTimerTask::from(&report))
        .await?;
    let timer = app.timers.start(timer.id()).await?;
    print_timer(&timer);
    let timer = app.timers.skip(timer.id()).await?;
    print_timer(&timer);

    // (F) タスクを削除すると、次の値が流れる
    app.tasks.delete(report.id).await?;
    if let Some(snapshot) = soon_due.next().await {
        print_snapshot(&snapshot);
    }

    soon_due.shutdown_and_join().await;
    Ok(())
}

async fn create_task(
    app: &App<FixedOffset>,
    zone: &FixedOffset,
    name: &str,
    due_at: chrono::DateTime<Utc>,
) -> anyhow::Result<Task> {
    let task = app
        .tasks
        .create(NewTask::new(TaskName::new(name)?).with_due_at(due_at))
        .await?;
    let bucket = calculate_date_ranges(Utc::now(), zone)
        .bucket_of(due_at)
        .map_or("later", DueBucket::label);
    info!(task = name, bucket, "task created");
    Ok(task)
}

fn print_snapshot(snapshot: &SoonDueTasks) {
    if let SoonDueTasks::Error(e) = snapshot {
        println!("soon-due tasks unavailable: {e}");
        return;
    }
    for bucket in DueBucket::ALL {
        let names: Vec<&str> = snapshot
            .tasks_in(bucket)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        println!("{:>16}: {}", bucket.label(), names.join(", "));
    }
}

fn print_timer(timer: &Timer) {
    let linked = timer
        .linked_task()
        .map(|task| task.name.as_str())
        .unwrap_or("-");
    println!(
        "{} [{}] state={} task={}",
        timer.name(),
        timer.kind(),
        timer.state_name(),
        linked
    );
}
