//! RepositoryError - 永続化層のエラー

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// 下層のストレージ障害（原因は文字列で保持する）
    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn storage(cause: impl std::fmt::Display) -> Self {
        RepositoryError::Storage(cause.to_string())
    }
}
