//! Domain identifiers (strongly-typed IDs).
//!
//! Timer と Task の ID は ULID（128-bit）で表現します。
//! `Id<T>` というジェネリック型で共通実装を提供し、`T` は PhantomData の
//! マーカー型としてコンパイル時にだけ使います。
//!
//! - TimerId と TaskId は異なる型なので混同できない
//! - 比較は等値のみが意味を持つ（順序に意味はない）
//! - 生成は `IdGenerator` port 経由で行い、再利用はしない

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"timer-", "task-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Timer のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {}

impl IdMarker for Timer {
    fn prefix() -> &'static str {
        "timer-"
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Identifier of a timer (any kind).
pub type TimerId = Id<Timer>;

/// Identifier of a task.
pub type TaskId = Id<Task>;
