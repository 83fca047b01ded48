//! 文字列の value object（TimerName, TaskName, TaskDescription, TaskTag）
//!
//! コンストラクタは private で、`new()` は `Result` を返します。
//! 検証を通らない値は型として存在できません。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

/// Timer の表示名（trim 後 1..=50 文字）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimerName(String);

impl TimerName {
    pub const MIN_LENGTH: usize = 1;
    pub const MAX_LENGTH: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        check_length("timer name", &value, Self::MIN_LENGTH, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task の名前（trim 後 1..=200 文字）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    pub const MIN_LENGTH: usize = 1;
    pub const MAX_LENGTH: usize = 200;

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        check_length("task name", &value, Self::MIN_LENGTH, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task の説明（0..=2000 文字、空でもよい）
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskDescription(String);

impl TaskDescription {
    pub const MAX_LENGTH: usize = 2000;

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        check_length("task description", &value, 0, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task のタグ（trim 後 1..=32 文字、内部に空白を含まない）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskTag(String);

impl TaskTag {
    pub const MIN_LENGTH: usize = 1;
    pub const MAX_LENGTH: usize = 32;

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        check_length("task tag", &value, Self::MIN_LENGTH, Self::MAX_LENGTH)?;
        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::Malformed {
                field: "task tag",
                message: format!("'{value}' contains whitespace"),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_value_conversions {
    ($($ty:ident),* $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ValidationError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::new(value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_value_conversions!(TimerName, TaskName, TaskDescription, TaskTag);
