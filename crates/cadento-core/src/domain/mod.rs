//! Domain model (ids, value objects, tasks, timers, due policy).
//!
//! ここには I/O を持たない純粋なロジックだけを置きます。
//! - ids: TimerId / TaskId（ULID）
//! - names: 検証済みの文字列 value object
//! - task: Task エンティティとステータス
//! - timer: 3 種類の状態機械と Timer 集約
//! - due_policy: 期限の近いタスクを分類する時間範囲
//! - errors: ValidationError / InvalidTransition / TimerError

pub mod due_policy;
pub mod errors;
pub mod ids;
pub mod names;
pub mod task;
pub mod timer;

pub use due_policy::{DateRanges, DueBucket, InstantRange, calculate_date_ranges};
pub use errors::{InvalidTransition, TimerError, ValidationError};
pub use ids::{TaskId, TimerId};
pub use names::{TaskDescription, TaskName, TaskTag, TimerName};
pub use task::{BuiltinTaskStatus, NewTask, Task, TaskStatus, TaskStatusId};
pub use timer::{
    FocusDividendTimer, FocusDividendTimerSettings, FocusDividendTimerState, LinkedTimerTask,
    NewTimer, PomodoroPhase, PomodoroTimer, PomodoroTimerSettings, PomodoroTimerState,
    RegularTimer, RegularTimerState, Timer, TimerEvent, TimerKind,
};
