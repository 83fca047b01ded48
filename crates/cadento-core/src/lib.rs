//! cadento-core
//!
//! Core of the Cadento focus timer and task planner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, names, task, timer の状態機械, due_policy, errors）
//! - **ports**: 抽象化レイヤー（TimerRepository, TaskRepository, Clock, TimeZoneProvider, IdGenerator）
//! - **app**: ユースケース（TimerService, TaskService, SoonDueTasksEngine, AppBuilder）
//! - **impls**: 実装（InMemoryTimerRepository など開発用）
//! - **config**: CoreConfig（TOML）
//!
//! 状態機械と `calculate_date_ranges` は純粋関数で、時刻は必ず引数で受け取ります。
//! I/O を持つのは ports の実装と SoonDueTasksEngine のループだけです。

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use config::{ConfigError, CoreConfig, CoreSettings};
