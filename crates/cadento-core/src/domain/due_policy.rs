//! TaskDuePolicy - 期限の近いタスクを分類するための時間範囲
//!
//! `calculate_date_ranges(now, tz)` は (now, タイムゾーン) だけの純粋関数です。
//! 境界はすべてローカル日付で計算してから、そのタイムゾーンで絶対時刻に戻します。
//!
//! # 範囲
//! - overdue: `due < now`
//! - today: `[now, 翌日 0:00 - 1ns]`
//! - next_day: 翌日まる 1 日
//! - later_in_week: 明後日 〜 今週の日曜日（ISO 週、日曜終わり）
//! - next_week: 来週の月曜日 〜 日曜日
//!
//! 各範囲は直前の範囲の終端 + 1ns 以降から始まるようにクランプする。
//! 土曜・日曜のように範囲が成立しない日は `end < start` の空範囲になる。

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// 両端を含む時間範囲（UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstantRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl InstantRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// 長さ（空範囲は 0）
    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start + Duration::nanoseconds(1)
        }
    }
}

/// どの範囲に入るか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueBucket {
    Overdue,
    Today,
    NextDay,
    LaterInWeek,
    NextWeek,
}

impl DueBucket {
    /// 近い順
    pub const ALL: [DueBucket; 5] = [
        DueBucket::Overdue,
        DueBucket::Today,
        DueBucket::NextDay,
        DueBucket::LaterInWeek,
        DueBucket::NextWeek,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DueBucket::Overdue => "overdue",
            DueBucket::Today => "today",
            DueBucket::NextDay => "next day",
            DueBucket::LaterInWeek => "later this week",
            DueBucket::NextWeek => "next week",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRanges {
    /// これより前が期限切れ（= 計算時の now）
    pub overdue_before: DateTime<Utc>,
    pub today: InstantRange,
    pub next_day: InstantRange,
    pub later_in_week: InstantRange,
    pub next_week: InstantRange,
}

impl DateRanges {
    /// 期限 `due` の分類。来週より先なら None。
    pub fn bucket_of(&self, due: DateTime<Utc>) -> Option<DueBucket> {
        if due < self.overdue_before {
            Some(DueBucket::Overdue)
        } else if self.today.contains(due) {
            Some(DueBucket::Today)
        } else if self.next_day.contains(due) {
            Some(DueBucket::NextDay)
        } else if self.later_in_week.contains(due) {
            Some(DueBucket::LaterInWeek)
        } else if self.next_week.contains(due) {
            Some(DueBucket::NextWeek)
        } else {
            None
        }
    }

    /// today, next_day, later_in_week, next_week の順
    pub fn upcoming(&self) -> [InstantRange; 4] {
        [self.today, self.next_day, self.later_in_week, self.next_week]
    }
}

pub fn calculate_date_ranges<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateRanges {
    let one_ns = Duration::nanoseconds(1);
    let date = now.with_timezone(tz).date_naive();
    let day_start = |offset_days: i64| start_of_day(date + Duration::days(offset_days), tz);

    let days_to_sunday = 6 - i64::from(date.weekday().num_days_from_monday());
    let next_monday = days_to_sunday + 1;

    let today = InstantRange::new(now, day_start(1) - one_ns);
    let next_day = following(&today, day_start(1), day_start(2) - one_ns);
    let later_in_week = following(&next_day, day_start(2), day_start(next_monday) - one_ns);
    let next_week = following(
        &later_in_week,
        day_start(next_monday),
        day_start(next_monday + 7) - one_ns,
    );

    DateRanges {
        overdue_before: now,
        today,
        next_day,
        later_in_week,
        next_week,
    }
}

/// `prev` の直後から始まる範囲。重なりは切り詰め、成立しなければ空範囲。
fn following(prev: &InstantRange, start: DateTime<Utc>, end: DateTime<Utc>) -> InstantRange {
    let one_ns = Duration::nanoseconds(1);
    let start = start.max(prev.end + one_ns);
    InstantRange::new(start, end.max(start - one_ns))
}

/// ローカル日付 `date` の 0:00 を絶対時刻に変換する。
///
/// - 曖昧（時刻が 2 回ある）: 早い方
/// - 存在しない（DST で飛ばされた）: 0:00 以降で最初に存在するローカル時刻
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(start) = tz.from_local_datetime(&midnight).earliest() {
        return start.with_timezone(&Utc);
    }
    (1..=24 * 60)
        .find_map(|minutes| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minutes)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
