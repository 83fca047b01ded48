//! App - ユースケースとワイヤリング
//!
//! # 含まれるモジュール
//! - **timer_service**: タイマーの作成・遷移・リンク・購読
//! - **task_service**: タスクの CRUD とステータス変更
//! - **soon_due_tasks**: 期限の近いタスクを流し続けるエンジン
//! - **builder**: AppBuilder（起動時検証付きのワイヤリング）

pub mod builder;
pub mod soon_due_tasks;
pub mod task_service;
pub mod timer_service;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::soon_due_tasks::{
    SoonDueSettings, SoonDueTasks, SoonDueTasksEngine, SoonDueTasksSubscription, next_trigger,
    wake_delay,
};
pub use self::task_service::{TaskService, TaskServiceError};
pub use self::timer_service::{TimerService, TimerServiceError};
