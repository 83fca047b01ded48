//! Ports - 外部への抽象化レイヤー
//!
//! 永続化・時刻・タイムゾーン・ID 生成は core の外側の関心事です。
//! 各 trait が境界になり、実装（SQL、OS の時計など）は差し替えられます。
//! 開発・テスト用の実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod repository_error;
pub mod task_repository;
pub mod time_zone;
pub mod timer_repository;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::repository_error::RepositoryError;
pub use self::task_repository::{TaskListStream, TaskRepository};
pub use self::time_zone::TimeZoneProvider;
pub use self::timer_repository::{
    TimerFilter, TimerListStream, TimerRepository, TimerSort, TimerStream,
};
