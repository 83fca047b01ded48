//! Focus-dividend timer state machine.
//!
//! 集中した時間に比例して「休憩クレジット（dividend）」を獲得し、それを消費する。
//!
//! ```text
//! Terminated --start--> Focusing
//! Focusing --stop--> Terminated(last_focus_earned = now - started_at)
//! Focusing --switch_to_dividend--> SpendingDividend(budget = focus / ratio)
//! Terminated(Some(earned)) --switch_to_dividend--> SpendingDividend(budget = earned / ratio)
//! SpendingDividend --budget elapsed / stop--> Terminated(None)
//! ```

use chrono::{DateTime, Duration, Utc};

use super::TimerKind;
use crate::domain::errors::{InvalidTransition, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusDividendTimerSettings {
    focus_per_dividend_ratio: u32,
}

impl FocusDividendTimerSettings {
    pub const MIN_RATIO: u32 = 1;
    pub const MAX_RATIO: u32 = 20;

    pub fn new(focus_per_dividend_ratio: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN_RATIO..=Self::MAX_RATIO).contains(&focus_per_dividend_ratio) {
            return Err(ValidationError::out_of_range(
                "focus per dividend ratio",
                format!(
                    "{focus_per_dividend_ratio} is not within {}..={}",
                    Self::MIN_RATIO,
                    Self::MAX_RATIO
                ),
            ));
        }
        Ok(Self {
            focus_per_dividend_ratio,
        })
    }

    pub fn focus_per_dividend_ratio(&self) -> u32 {
        self.focus_per_dividend_ratio
    }

    /// 集中時間から獲得できる休憩時間
    pub fn dividend_for(&self, focus: Duration) -> Duration {
        // ratio は MAX_RATIO 以下なので i32 に収まる
        focus.max(Duration::zero()) / self.focus_per_dividend_ratio as i32
    }
}

impl Default for FocusDividendTimerSettings {
    fn default() -> Self {
        Self {
            focus_per_dividend_ratio: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusDividendTimerState {
    Terminated {
        since: DateTime<Utc>,
        last_focus_earned: Option<Duration>,
    },
    Focusing {
        started_at: DateTime<Utc>,
    },
    SpendingDividend {
        started_at: DateTime<Utc>,
        dividend_budget: Duration,
    },
}

impl FocusDividendTimerState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        FocusDividendTimerState::Terminated {
            since: now,
            last_focus_earned: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FocusDividendTimerState::Terminated { .. } => "terminated",
            FocusDividendTimerState::Focusing { .. } => "focusing",
            FocusDividendTimerState::SpendingDividend { .. } => "spending_dividend",
        }
    }

    /// 現在の集中時間（Focusing のみ）
    pub fn focus_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            FocusDividendTimerState::Focusing { started_at } => {
                Some((now - *started_at).max(Duration::zero()))
            }
            _ => None,
        }
    }

    /// 残りの休憩クレジット（SpendingDividend のみ）
    pub fn remaining_dividend(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            FocusDividendTimerState::SpendingDividend {
                started_at,
                dividend_budget,
            } => {
                let spent = (now - *started_at).max(Duration::zero());
                Some((*dividend_budget - spent).max(Duration::zero()))
            }
            _ => None,
        }
    }

    /// Terminated -> Focusing(now)
    pub fn start(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            FocusDividendTimerState::Terminated { .. } => {
                Ok(FocusDividendTimerState::Focusing { started_at: now })
            }
            _ => Err(self.reject("start")),
        }
    }

    /// Focusing -> Terminated(earned) / SpendingDividend -> Terminated(None)
    pub fn stop(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            FocusDividendTimerState::Focusing { .. } => Ok(FocusDividendTimerState::Terminated {
                since: now,
                last_focus_earned: self.focus_elapsed(now),
            }),
            FocusDividendTimerState::SpendingDividend { .. } => {
                Ok(FocusDividendTimerState::Terminated {
                    since: now,
                    last_focus_earned: None,
                })
            }
            FocusDividendTimerState::Terminated { .. } => Err(self.reject("stop")),
        }
    }

    /// 集中時間を休憩クレジットに換えて消費を始める。
    pub fn switch_to_dividend(
        &self,
        settings: &FocusDividendTimerSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, InvalidTransition> {
        let focus = match self {
            FocusDividendTimerState::Focusing { started_at } => {
                (now - *started_at).max(Duration::zero())
            }
            FocusDividendTimerState::Terminated {
                last_focus_earned: Some(earned),
                ..
            } => *earned,
            _ => return Err(self.reject("switch_to_dividend")),
        };
        Ok(FocusDividendTimerState::SpendingDividend {
            started_at: now,
            dividend_budget: settings.dividend_for(focus),
        })
    }

    /// クレジットを使い切ったら Terminated(None)。それ以外は変化なし。
    pub fn evaluate(&self, now: DateTime<Utc>) -> Self {
        match self {
            FocusDividendTimerState::SpendingDividend {
                started_at,
                dividend_budget,
            } if now - *started_at >= *dividend_budget => FocusDividendTimerState::Terminated {
                since: now,
                last_focus_earned: None,
            },
            _ => self.clone(),
        }
    }

    fn reject(&self, operation: &'static str) -> InvalidTransition {
        InvalidTransition::new(TimerKind::FocusDividend, operation, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[rstest]
    #[case::zero(0, false)]
    #[case::one(1, true)]
    #[case::twenty(20, true)]
    #[case::twenty_one(21, false)]
    fn ratio_is_validated(#[case] ratio: u32, #[case] ok: bool) {
        assert_eq!(FocusDividendTimerSettings::new(ratio).is_ok(), ok);
    }

    #[test]
    fn stop_while_focusing_records_earned_focus() {
        let focusing = FocusDividendTimerState::initial(t0()).start(t0()).unwrap();
        let now = t0() + Duration::minutes(50);
        assert_eq!(
            focusing.stop(now).unwrap(),
            FocusDividendTimerState::Terminated {
                since: now,
                last_focus_earned: Some(Duration::minutes(50)),
            }
        );
    }

    #[test]
    fn switch_converts_focus_into_budget() {
        let settings = FocusDividendTimerSettings::default();
        let focusing = FocusDividendTimerState::Focusing { started_at: t0() };
        let now = t0() + Duration::minutes(50);
        let spending = focusing.switch_to_dividend(&settings, now).unwrap();
        assert_eq!(
            spending,
            FocusDividendTimerState::SpendingDividend {
                started_at: now,
                dividend_budget: Duration::minutes(10),
            }
        );
        assert_eq!(
            spending.remaining_dividend(now + Duration::minutes(4)),
            Some(Duration::minutes(6))
        );
    }

    #[test]
    fn earned_focus_can_be_spent_later() {
        let settings = FocusDividendTimerSettings::new(2).unwrap();
        let terminated = FocusDividendTimerState::Terminated {
            since: t0(),
            last_focus_earned: Some(Duration::minutes(30)),
        };
        let later = t0() + Duration::hours(2);
        let spending = terminated.switch_to_dividend(&settings, later).unwrap();
        assert_eq!(
            spending,
            FocusDividendTimerState::SpendingDividend {
                started_at: later,
                dividend_budget: Duration::minutes(15),
            }
        );

        let nothing_earned = FocusDividendTimerState::initial(t0());
        assert!(nothing_earned.switch_to_dividend(&settings, later).is_err());
    }

    #[test]
    fn dividend_exhaustion_terminates() {
        let spending = FocusDividendTimerState::SpendingDividend {
            started_at: t0(),
            dividend_budget: Duration::minutes(5),
        };
        let before = t0() + Duration::minutes(4);
        let at = t0() + Duration::minutes(5);
        assert_eq!(spending.evaluate(before), spending);
        assert_eq!(
            spending.evaluate(at),
            FocusDividendTimerState::Terminated {
                since: at,
                last_focus_earned: None,
            }
        );
    }

    #[test]
    fn spending_can_be_interrupted_early() {
        let spending = FocusDividendTimerState::SpendingDividend {
            started_at: t0(),
            dividend_budget: Duration::minutes(5),
        };
        let now = t0() + Duration::minutes(1);
        assert_eq!(
            spending.stop(now).unwrap(),
            FocusDividendTimerState::Terminated {
                since: now,
                last_focus_earned: None,
            }
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let terminated = FocusDividendTimerState::initial(t0());
        let focusing = terminated.start(t0()).unwrap();

        let err = terminated.stop(t0()).unwrap_err();
        assert_eq!((err.kind, err.operation, err.state), (TimerKind::FocusDividend, "stop", "terminated"));
        assert_eq!(focusing.start(t0()).unwrap_err().state, "focusing");
    }
}
