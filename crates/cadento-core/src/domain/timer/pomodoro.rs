//! Pomodoro timer state machine.
//!
//! ```text
//! Inactive --start--> Focus(0)
//! Focus(n)      --focus elapsed-->       ShortBreak(n + 1)   (n <  N)
//! Focus(n)      --focus elapsed-->       LongBreak           (n >= N, counter reset)
//! ShortBreak(n) --short break elapsed--> Focus(n)
//! LongBreak     --long break elapsed-->  Focus(0)
//! Focus | ShortBreak | LongBreak --pause--> Paused(prior, remaining)
//! Paused --resume--> prior phase, remaining time preserved
//! ```
//!
//! N = `long_break_per_short_breaks`。N 回の short break を終えた次の休憩が long break。
//!
//! # 時刻による遷移
//! 遷移はタイマーやコールバックではなく、`evaluate(now)` が経過時間と設定値を
//! 比較して決める。1 回の呼び出しで進むのは最大 1 フェーズで、新しいフェーズは
//! `now` から始まる。同じ `now`（またはそれより前）で何度呼んでも二重に進まない。
//! 長時間スリープ後に呼ばれた場合も、次のフェーズへ 1 つだけ進む。

use chrono::{DateTime, Duration, Utc};

use super::TimerKind;
use crate::domain::errors::{InvalidTransition, ValidationError};

/// Pomodoro の設定値
///
/// フィールドは private。`new()` で範囲を検証する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PomodoroTimerSettings {
    focus: Duration,
    short_break: Duration,
    long_break: Duration,
    long_break_per_short_breaks: u32,
}

impl PomodoroTimerSettings {
    pub const MIN_FOCUS_MINUTES: i64 = 10;
    pub const MAX_FOCUS_MINUTES: i64 = 60;
    pub const MIN_SHORT_BREAK_MINUTES: i64 = 2;
    pub const MAX_SHORT_BREAK_MINUTES: i64 = 30;
    pub const MIN_LONG_BREAK_MINUTES: i64 = 5;
    pub const MAX_LONG_BREAK_MINUTES: i64 = 60;
    pub const MIN_LONG_BREAK_PER_SHORT_BREAKS: u32 = 2;
    pub const MAX_LONG_BREAK_PER_SHORT_BREAKS: u32 = 12;

    pub fn new(
        focus: Duration,
        short_break: Duration,
        long_break: Duration,
        long_break_per_short_breaks: u32,
    ) -> Result<Self, ValidationError> {
        check_minutes(
            "pomodoro focus",
            focus,
            Self::MIN_FOCUS_MINUTES,
            Self::MAX_FOCUS_MINUTES,
        )?;
        check_minutes(
            "pomodoro short break",
            short_break,
            Self::MIN_SHORT_BREAK_MINUTES,
            Self::MAX_SHORT_BREAK_MINUTES,
        )?;
        check_minutes(
            "pomodoro long break",
            long_break,
            Self::MIN_LONG_BREAK_MINUTES,
            Self::MAX_LONG_BREAK_MINUTES,
        )?;
        if !(Self::MIN_LONG_BREAK_PER_SHORT_BREAKS..=Self::MAX_LONG_BREAK_PER_SHORT_BREAKS)
            .contains(&long_break_per_short_breaks)
        {
            return Err(ValidationError::out_of_range(
                "long break per short breaks",
                format!(
                    "{long_break_per_short_breaks} is not within {}..={}",
                    Self::MIN_LONG_BREAK_PER_SHORT_BREAKS,
                    Self::MAX_LONG_BREAK_PER_SHORT_BREAKS
                ),
            ));
        }
        Ok(Self {
            focus,
            short_break,
            long_break,
            long_break_per_short_breaks,
        })
    }

    pub fn focus(&self) -> Duration {
        self.focus
    }

    pub fn short_break(&self) -> Duration {
        self.short_break
    }

    pub fn long_break(&self) -> Duration {
        self.long_break
    }

    pub fn long_break_per_short_breaks(&self) -> u32 {
        self.long_break_per_short_breaks
    }

    /// 各フェーズの設定時間
    pub fn duration_of(&self, phase: PomodoroPhase) -> Duration {
        match phase {
            PomodoroPhase::Focus { .. } => self.focus,
            PomodoroPhase::ShortBreak { .. } => self.short_break,
            PomodoroPhase::LongBreak => self.long_break,
        }
    }

    /// `phase` が満了したときの次のフェーズ
    pub fn next_phase(&self, phase: PomodoroPhase) -> PomodoroPhase {
        match phase {
            PomodoroPhase::Focus { short_breaks_count }
                if short_breaks_count >= self.long_break_per_short_breaks =>
            {
                PomodoroPhase::LongBreak
            }
            PomodoroPhase::Focus { short_breaks_count } => PomodoroPhase::ShortBreak {
                short_breaks_count: short_breaks_count + 1,
            },
            PomodoroPhase::ShortBreak { short_breaks_count } => {
                PomodoroPhase::Focus { short_breaks_count }
            }
            PomodoroPhase::LongBreak => PomodoroPhase::Focus {
                short_breaks_count: 0,
            },
        }
    }
}

impl Default for PomodoroTimerSettings {
    fn default() -> Self {
        Self {
            focus: Duration::minutes(25),
            short_break: Duration::minutes(5),
            long_break: Duration::minutes(15),
            long_break_per_short_breaks: 4,
        }
    }
}

fn check_minutes(
    field: &'static str,
    value: Duration,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < Duration::minutes(min) || value > Duration::minutes(max) {
        return Err(ValidationError::out_of_range(
            field,
            format!("{}s is not within {min}..={max} minutes", value.num_seconds()),
        ));
    }
    Ok(())
}

/// 実行中フェーズ（開始時刻を除いた部分）
///
/// `Paused` が「どのフェーズを止めたか」を保持するのに使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroPhase {
    Focus { short_breaks_count: u32 },
    ShortBreak { short_breaks_count: u32 },
    LongBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PomodoroTimerState {
    Inactive {
        since: DateTime<Utc>,
    },
    Focus {
        started_at: DateTime<Utc>,
        short_breaks_count: u32,
    },
    ShortBreak {
        started_at: DateTime<Utc>,
        short_breaks_count: u32,
    },
    LongBreak {
        started_at: DateTime<Utc>,
    },
    Paused {
        paused_at: DateTime<Utc>,
        prior: PomodoroPhase,
        remaining: Duration,
    },
}

impl PomodoroTimerState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        PomodoroTimerState::Inactive { since: now }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PomodoroTimerState::Inactive { .. } => "inactive",
            PomodoroTimerState::Focus { .. } => "focus",
            PomodoroTimerState::ShortBreak { .. } => "short_break",
            PomodoroTimerState::LongBreak { .. } => "long_break",
            PomodoroTimerState::Paused { .. } => "paused",
        }
    }

    /// 実行中フェーズなら (開始時刻, フェーズ)
    pub fn active_phase(&self) -> Option<(DateTime<Utc>, PomodoroPhase)> {
        match *self {
            PomodoroTimerState::Focus {
                started_at,
                short_breaks_count,
            } => Some((started_at, PomodoroPhase::Focus { short_breaks_count })),
            PomodoroTimerState::ShortBreak {
                started_at,
                short_breaks_count,
            } => Some((started_at, PomodoroPhase::ShortBreak { short_breaks_count })),
            PomodoroTimerState::LongBreak { started_at } => {
                Some((started_at, PomodoroPhase::LongBreak))
            }
            PomodoroTimerState::Inactive { .. } | PomodoroTimerState::Paused { .. } => None,
        }
    }

    fn from_phase(phase: PomodoroPhase, started_at: DateTime<Utc>) -> Self {
        match phase {
            PomodoroPhase::Focus { short_breaks_count } => PomodoroTimerState::Focus {
                started_at,
                short_breaks_count,
            },
            PomodoroPhase::ShortBreak { short_breaks_count } => PomodoroTimerState::ShortBreak {
                started_at,
                short_breaks_count,
            },
            PomodoroPhase::LongBreak => PomodoroTimerState::LongBreak { started_at },
        }
    }

    /// 現在フェーズの経過時間（実行中のみ）
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.active_phase()
            .map(|(started_at, _)| (now - started_at).max(Duration::zero()))
    }

    /// 現在フェーズの残り時間。Inactive では None。
    pub fn remaining(
        &self,
        settings: &PomodoroTimerSettings,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        match self {
            PomodoroTimerState::Paused { remaining, .. } => Some(*remaining),
            PomodoroTimerState::Inactive { .. } => None,
            _ => self.active_phase().map(|(started_at, phase)| {
                let elapsed = (now - started_at).max(Duration::zero());
                (settings.duration_of(phase) - elapsed).max(Duration::zero())
            }),
        }
    }

    /// Inactive -> Focus(now, 0)
    pub fn start(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            PomodoroTimerState::Inactive { .. } => Ok(PomodoroTimerState::Focus {
                started_at: now,
                short_breaks_count: 0,
            }),
            _ => Err(self.reject("start")),
        }
    }

    /// 経過時間が閾値に達していれば次のフェーズへ 1 つだけ進める。
    pub fn evaluate(&self, settings: &PomodoroTimerSettings, now: DateTime<Utc>) -> Self {
        let Some((started_at, phase)) = self.active_phase() else {
            return self.clone();
        };
        if now - started_at < settings.duration_of(phase) {
            return self.clone();
        }
        Self::from_phase(settings.next_phase(phase), now)
    }

    /// 残り時間を待たずに次のフェーズへ進める。
    pub fn skip(
        &self,
        settings: &PomodoroTimerSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, InvalidTransition> {
        match self.active_phase() {
            Some((_, phase)) => Ok(Self::from_phase(settings.next_phase(phase), now)),
            None => Err(self.reject("skip")),
        }
    }

    /// 実行中フェーズ -> Paused。残り時間は `設定時間 - 経過時間`。
    pub fn pause(
        &self,
        settings: &PomodoroTimerSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, InvalidTransition> {
        let Some((started_at, phase)) = self.active_phase() else {
            return Err(self.reject("pause"));
        };
        let elapsed = (now - started_at).max(Duration::zero());
        Ok(PomodoroTimerState::Paused {
            paused_at: now,
            prior: phase,
            remaining: (settings.duration_of(phase) - elapsed).max(Duration::zero()),
        })
    }

    /// Paused -> 元のフェーズ。
    ///
    /// `now - started_at == 設定時間 - remaining` となるよう開始時刻をずらす。
    /// 一時停止していた実時間は残り時間に影響しない。
    pub fn resume(
        &self,
        settings: &PomodoroTimerSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, InvalidTransition> {
        match *self {
            PomodoroTimerState::Paused {
                prior, remaining, ..
            } => {
                let configured = settings.duration_of(prior);
                let already_elapsed = configured - remaining.min(configured);
                Ok(Self::from_phase(prior, now - already_elapsed))
            }
            _ => Err(self.reject("resume")),
        }
    }

    /// any (except Inactive) -> Inactive
    pub fn stop(&self, now: DateTime<Utc>) -> Result<Self, InvalidTransition> {
        match self {
            PomodoroTimerState::Inactive { .. } => Err(self.reject("stop")),
            _ => Ok(PomodoroTimerState::Inactive { since: now }),
        }
    }

    fn reject(&self, operation: &'static str) -> InvalidTransition {
        InvalidTransition::new(TimerKind::Pomodoro, operation, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn settings() -> PomodoroTimerSettings {
        PomodoroTimerSettings::default()
    }

    /// 現在フェーズの満了時刻で evaluate する
    fn complete_phase(
        state: &PomodoroTimerState,
        settings: &PomodoroTimerSettings,
    ) -> PomodoroTimerState {
        let (started_at, phase) = state.active_phase().unwrap();
        state.evaluate(settings, started_at + settings.duration_of(phase))
    }

    #[test]
    fn default_settings_match_classic_pomodoro() {
        let s = settings();
        assert_eq!(s.focus(), Duration::minutes(25));
        assert_eq!(s.long_break_per_short_breaks(), 4);
        assert!(
            PomodoroTimerSettings::new(
                s.focus(),
                s.short_break(),
                s.long_break(),
                s.long_break_per_short_breaks()
            )
            .is_ok()
        );
    }

    #[rstest]
    #[case::focus_too_short(Duration::minutes(9), Duration::minutes(5), Duration::minutes(15), 4)]
    #[case::focus_too_long(Duration::minutes(61), Duration::minutes(5), Duration::minutes(15), 4)]
    #[case::short_break_too_long(Duration::minutes(25), Duration::minutes(31), Duration::minutes(15), 4)]
    #[case::long_break_too_short(Duration::minutes(25), Duration::minutes(5), Duration::minutes(4), 4)]
    #[case::count_below_minimum(Duration::minutes(25), Duration::minutes(5), Duration::minutes(15), 1)]
    fn settings_reject_out_of_range(
        #[case] focus: Duration,
        #[case] short_break: Duration,
        #[case] long_break: Duration,
        #[case] count: u32,
    ) {
        assert!(matches!(
            PomodoroTimerSettings::new(focus, short_break, long_break, count),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn start_enters_focus_with_zero_counter() {
        let state = PomodoroTimerState::initial(t0()).start(t0()).unwrap();
        assert_eq!(
            state,
            PomodoroTimerState::Focus {
                started_at: t0(),
                short_breaks_count: 0
            }
        );
    }

    #[test]
    fn evaluate_before_threshold_is_noop() {
        let focus = PomodoroTimerState::initial(t0()).start(t0()).unwrap();
        let almost = t0() + Duration::minutes(25) - Duration::seconds(1);
        assert_eq!(focus.evaluate(&settings(), almost), focus);
        // now が開始時刻より前でも進まない
        assert_eq!(focus.evaluate(&settings(), t0() - Duration::hours(1)), focus);
    }

    #[test]
    fn evaluate_is_idempotent_for_fixed_now() {
        let focus = PomodoroTimerState::initial(t0()).start(t0()).unwrap();
        let now = t0() + Duration::minutes(25);
        let once = focus.evaluate(&settings(), now);
        let twice = once.evaluate(&settings(), now);
        let earlier = once.evaluate(&settings(), now - Duration::minutes(1));
        assert_eq!(
            once,
            PomodoroTimerState::ShortBreak {
                started_at: now,
                short_breaks_count: 1
            }
        );
        assert_eq!(twice, once);
        assert_eq!(earlier, once);
    }

    #[test]
    fn long_suspension_advances_exactly_one_phase() {
        let focus = PomodoroTimerState::initial(t0()).start(t0()).unwrap();
        let much_later = t0() + Duration::hours(6);
        let next = focus.evaluate(&settings(), much_later);
        assert_eq!(
            next,
            PomodoroTimerState::ShortBreak {
                started_at: much_later,
                short_breaks_count: 1
            }
        );
    }

    #[rstest]
    #[case::two(2)]
    #[case::four(4)]
    #[case::six(6)]
    fn long_break_follows_n_short_breaks(#[case] n: u32) {
        let settings = PomodoroTimerSettings::new(
            Duration::minutes(25),
            Duration::minutes(5),
            Duration::minutes(15),
            n,
        )
        .unwrap();
        let mut state = PomodoroTimerState::initial(t0()).start(t0()).unwrap();

        for cycle in 1..=n {
            state = complete_phase(&state, &settings);
            assert!(
                matches!(state, PomodoroTimerState::ShortBreak { short_breaks_count, .. } if short_breaks_count == cycle),
                "cycle {cycle}: expected short break, got {state:?}"
            );
            state = complete_phase(&state, &settings);
            assert!(matches!(
                state,
                PomodoroTimerState::Focus { short_breaks_count, .. } if short_breaks_count == cycle
            ));
        }

        state = complete_phase(&state, &settings);
        assert!(matches!(state, PomodoroTimerState::LongBreak { .. }));

        state = complete_phase(&state, &settings);
        assert!(matches!(
            state,
            PomodoroTimerState::Focus {
                short_breaks_count: 0,
                ..
            }
        ));
    }

    #[rstest]
    #[case::focus(PomodoroPhase::Focus { short_breaks_count: 2 }, 10)]
    #[case::short_break(PomodoroPhase::ShortBreak { short_breaks_count: 1 }, 3)]
    #[case::long_break(PomodoroPhase::LongBreak, 7)]
    fn pause_and_resume_preserve_remaining_time(
        #[case] phase: PomodoroPhase,
        #[case] elapsed_minutes: i64,
    ) {
        let settings = settings();
        let state = PomodoroTimerState::from_phase(phase, t0());
        let paused_at = t0() + Duration::minutes(elapsed_minutes);
        let expected_remaining = settings.duration_of(phase) - Duration::minutes(elapsed_minutes);

        let paused = state.pause(&settings, paused_at).unwrap();
        assert_eq!(paused.remaining(&settings, paused_at), Some(expected_remaining));

        // 一時停止中の実時間は残り時間を減らさない
        let resumed_at = paused_at + Duration::hours(3);
        assert_eq!(paused.remaining(&settings, resumed_at), Some(expected_remaining));

        let resumed = paused.resume(&settings, resumed_at).unwrap();
        assert_eq!(resumed.active_phase().map(|(_, p)| p), Some(phase));
        assert_eq!(resumed.remaining(&settings, resumed_at), Some(expected_remaining));
        assert_eq!(
            resumed.elapsed(resumed_at),
            Some(Duration::minutes(elapsed_minutes))
        );
    }

    #[test]
    fn skip_applies_counter_rules() {
        let settings = settings();
        let focus = PomodoroTimerState::Focus {
            started_at: t0(),
            short_breaks_count: 4,
        };
        let skipped = focus.skip(&settings, t0() + Duration::minutes(1)).unwrap();
        assert_eq!(
            skipped,
            PomodoroTimerState::LongBreak {
                started_at: t0() + Duration::minutes(1)
            }
        );
    }

    #[test]
    fn stop_returns_to_inactive_from_paused() {
        let paused = PomodoroTimerState::Paused {
            paused_at: t0(),
            prior: PomodoroPhase::LongBreak,
            remaining: Duration::minutes(3),
        };
        let now = t0() + Duration::minutes(1);
        assert_eq!(paused.stop(now).unwrap(), PomodoroTimerState::Inactive { since: now });
    }

    #[test]
    fn invalid_transitions_are_rejected_consistently() {
        let settings = settings();
        let inactive = PomodoroTimerState::initial(t0());
        let focus = inactive.start(t0()).unwrap();

        assert_eq!(inactive.pause(&settings, t0()).unwrap_err().operation, "pause");
        assert_eq!(inactive.resume(&settings, t0()).unwrap_err().operation, "resume");
        assert_eq!(inactive.stop(t0()).unwrap_err().operation, "stop");
        assert_eq!(inactive.skip(&settings, t0()).unwrap_err().operation, "skip");
        let err = focus.resume(&settings, t0()).unwrap_err();
        assert_eq!(err.kind, TimerKind::Pomodoro);
        assert_eq!(err.state, "focus");
        assert_eq!(focus.start(t0()).unwrap_err().operation, "start");
    }
}
