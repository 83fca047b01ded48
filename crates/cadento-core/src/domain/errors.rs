//! Errors - ドメインエラー型
//!
//! - ValidationError: value object の生成失敗（生成時に同期的に返す）
//! - InvalidTransition: 状態機械が現在の状態では受け付けない操作
//! - TimerError: Timer 集約の操作エラー

use thiserror::Error;

use super::timer::TimerKind;

/// ValidationError は value object の範囲・長さ制約違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max} characters (got {actual})")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("{field} is out of range: {message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },

    #[error("{field} is malformed: {message}")]
    Malformed {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub(crate) fn out_of_range(field: &'static str, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            message: message.into(),
        }
    }
}

/// 状態機械が受け付けなかった遷移
///
/// 3 種類の状態機械はすべて同じ方針をとります：
/// 現在の状態で無効な操作は `Err(InvalidTransition)` を返し、状態は変えない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} a {kind} timer in state {state}")]
pub struct InvalidTransition {
    pub kind: TimerKind,
    pub operation: &'static str,
    pub state: &'static str,
}

impl InvalidTransition {
    pub(crate) fn new(kind: TimerKind, operation: &'static str, state: &'static str) -> Self {
        Self {
            kind,
            operation,
            state,
        }
    }
}

/// TimerError は Timer 集約の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("timer has no linked task")]
    NoLinkedTask,
}
