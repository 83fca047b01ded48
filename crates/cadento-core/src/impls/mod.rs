//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskRepository**: 開発用のタスク保存先
//! - **InMemoryTimerRepository**: 開発用のタイマー保存先
//! - **WatchTimeZoneProvider**: ホストから更新できるタイムゾーン
//!
//! # 本番用実装
//! SQL などの永続化はホストアプリ側のクレートに配置します。

pub mod inmem_task_repository;
pub mod inmem_timer_repository;
pub mod time_zone;
mod watch_stream;

pub use self::inmem_task_repository::InMemoryTaskRepository;
pub use self::inmem_timer_repository::InMemoryTimerRepository;
pub use self::time_zone::WatchTimeZoneProvider;
