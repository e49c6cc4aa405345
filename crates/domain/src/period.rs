//! Time buckets for activity trend reporting.
//!
//! Buckets are produced lazily by [`Periods`], oldest first. Each bucket ends
//! exactly where the next one starts, and the newest bucket ends one day after
//! `now` so same-day activity is always covered.

use std::iter::FusedIterator;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use stocklens_core::AppError;

use crate::analytics::shade_deltas;
use crate::audit::{AuditAction, AuditRecord};
use crate::parser::extract_stock_adjustments;
use crate::shade::Shade;

const RECENT_DAY_COUNT: u64 = 7;
const RECENT_WEEK_COUNT: u64 = 4;

/// Size of one reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// The seven most recent calendar days.
    Day,
    /// The four most recent calendar weeks.
    Week,
    /// Every calendar month since the anchor.
    Month,
    /// Every calendar year since the anchor.
    Year,
}

impl Granularity {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for Granularity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(AppError::Validation(format!(
                "unknown period granularity '{value}'"
            ))),
        }
    }
}

/// Calendar options for bucket generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodOptions {
    /// First day of a week-aligned bucket.
    pub week_start: Weekday,
}

impl Default for PeriodOptions {
    fn default() -> Self {
        Self {
            week_start: Weekday::Mon,
        }
    }
}

/// Aggregated activity for one time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    /// Display label.
    pub label: String,
    /// Inclusive start.
    pub period_start: DateTime<Utc>,
    /// Exclusive end.
    pub period_end_exclusive: DateTime<Utc>,
    /// Units added.
    pub stock_added: i64,
    /// Units removed.
    pub stock_reduced: i64,
    /// Number of shade-level additions.
    pub shades_added: u32,
    /// Number of shade-level reductions.
    pub shades_removed: u32,
    /// Number of audit records in the range.
    pub activity_count: u32,
}

impl PeriodBucket {
    fn empty(label: String, period_start: DateTime<Utc>, period_end_exclusive: DateTime<Utc>) -> Self {
        Self {
            label,
            period_start,
            period_end_exclusive,
            stock_added: 0,
            stock_reduced: 0,
            shades_added: 0,
            shades_removed: 0,
            activity_count: 0,
        }
    }

    /// Returns whether `at` falls in `[period_start, period_end_exclusive)`.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.period_start <= at && at < self.period_end_exclusive
    }

    /// Returns whether the bucket saw no activity and no deltas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activity_count == 0
            && self.stock_added == 0
            && self.stock_reduced == 0
            && self.shades_added == 0
            && self.shades_removed == 0
    }

    fn record_delta(&mut self, delta: i64, counts_as_shade: bool) {
        if delta > 0 {
            self.stock_added = self.stock_added.saturating_add(delta);
            if counts_as_shade {
                self.shades_added = self.shades_added.saturating_add(1);
            }
        } else if delta < 0 {
            self.stock_reduced = self.stock_reduced.saturating_add(delta.saturating_abs());
            if counts_as_shade {
                self.shades_removed = self.shades_removed.saturating_add(1);
            }
        }
    }
}

/// Lazy, double-ended sequence of empty period buckets, oldest first.
///
/// Buckets are computed by index, so `periods.rev().take(n)` only builds the
/// newest `n` even when the full range spans many years.
#[derive(Debug, Clone)]
pub struct Periods {
    granularity: Granularity,
    origin: NaiveDate,
    end: DateTime<Utc>,
    total: u64,
    front: u64,
    back: u64,
}

impl Periods {
    fn new(granularity: Granularity, origin: NaiveDate, count: u64, end: DateTime<Utc>) -> Self {
        let mut periods = Self {
            granularity,
            origin,
            end,
            total: 0,
            front: 0,
            back: 0,
        };
        let total = periods.representable_count(count);
        periods.total = total;
        periods.back = total;
        periods
    }

    /// Largest `n <= count` such that buckets `0..n` all have representable
    /// start dates. Every index below `total` therefore yields a bucket.
    fn representable_count(&self, count: u64) -> u64 {
        let representable =
            |index: u64| self.start_date(index).and_then(start_of_day).is_some();

        let (mut low, mut high) = (0_u64, count);
        while low < high {
            let candidate = low + (high - low).div_ceil(2);
            if representable(candidate - 1) {
                low = candidate;
            } else {
                high = candidate - 1;
            }
        }
        low
    }

    fn empty(granularity: Granularity, now: DateTime<Utc>) -> Self {
        Self::new(granularity, now.date_naive(), 0, now)
    }

    /// Returns the reporting granularity.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn start_date(&self, index: u64) -> Option<NaiveDate> {
        match self.granularity {
            Granularity::Day => self.origin.checked_add_days(Days::new(index)),
            Granularity::Week => self
                .origin
                .checked_add_days(Days::new(index.checked_mul(7)?)),
            Granularity::Month => {
                let months = i64::from(self.origin.year())
                    .checked_mul(12)?
                    .checked_add(i64::from(self.origin.month0()))?
                    .checked_add(i64::try_from(index).ok()?)?;
                let year = i32::try_from(months.div_euclid(12)).ok()?;
                let month = u32::try_from(months.rem_euclid(12)).ok()?.checked_add(1)?;
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Granularity::Year => {
                let year = self
                    .origin
                    .year()
                    .checked_add(i32::try_from(index).ok()?)?;
                NaiveDate::from_ymd_opt(year, 1, 1)
            }
        }
    }

    fn bucket(&self, index: u64) -> Option<PeriodBucket> {
        let start_date = self.start_date(index)?;
        let period_start = start_of_day(start_date)?;
        let next_index = index.checked_add(1)?;
        let period_end_exclusive = if next_index >= self.total {
            self.end
        } else {
            start_of_day(self.start_date(next_index)?)?
        };

        Some(PeriodBucket::empty(
            self.label(start_date),
            period_start,
            period_end_exclusive,
        ))
    }

    fn label(&self, start: NaiveDate) -> String {
        match self.granularity {
            Granularity::Day => start.format("%b %d").to_string(),
            Granularity::Week => format!("Week of {}", start.format("%b %d")),
            Granularity::Month => start.format("%b %Y").to_string(),
            Granularity::Year => start.format("%Y").to_string(),
        }
    }
}

impl Iterator for Periods {
    type Item = PeriodBucket;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        let bucket = self.bucket(self.front);
        if bucket.is_none() {
            self.front = self.back;
            return None;
        }
        self.front = self.front.saturating_add(1);
        bucket
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.back.saturating_sub(self.front)).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Periods {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        let index = self.back.saturating_sub(1);
        let bucket = self.bucket(index);
        if bucket.is_none() {
            self.back = self.front;
            return None;
        }
        self.back = index;
        bucket
    }
}

impl ExactSizeIterator for Periods {}

impl FusedIterator for Periods {}

/// Returns the lazy bucket sequence for `granularity`.
///
/// `anchor` is the entity's creation time; it only affects month and year
/// buckets and is clamped to `now` when it lies in the future.
#[must_use]
pub fn periods(
    anchor: DateTime<Utc>,
    granularity: Granularity,
    now: DateTime<Utc>,
    options: PeriodOptions,
) -> Periods {
    let Some(end) = now.checked_add_signed(Duration::days(1)) else {
        return Periods::empty(granularity, now);
    };
    let today = now.date_naive();
    let anchor = anchor.min(now).date_naive();

    let layout = match granularity {
        Granularity::Day => today
            .checked_sub_days(Days::new(RECENT_DAY_COUNT - 1))
            .map(|origin| (origin, RECENT_DAY_COUNT)),
        Granularity::Week => {
            let offset = (today.weekday().num_days_from_monday() + 7
                - options.week_start.num_days_from_monday())
                % 7;
            today
                .checked_sub_days(Days::new(u64::from(offset)))
                .and_then(|current| current.checked_sub_days(Days::new((RECENT_WEEK_COUNT - 1) * 7)))
                .map(|origin| (origin, RECENT_WEEK_COUNT))
        }
        Granularity::Month => {
            let count = i64::from(today.year() - anchor.year()) * 12
                + i64::from(today.month()) - i64::from(anchor.month())
                + 1;
            NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), 1)
                .zip(u64::try_from(count).ok())
        }
        Granularity::Year => {
            let count = i64::from(today.year() - anchor.year()) + 1;
            NaiveDate::from_ymd_opt(anchor.year(), 1, 1).zip(u64::try_from(count).ok())
        }
    };

    match layout {
        Some((origin, count)) => Periods::new(granularity, origin, count, end),
        None => Periods::empty(granularity, now),
    }
}

/// Collects the full, contiguous bucket set for `granularity`.
#[must_use]
pub fn build_periods(
    anchor: DateTime<Utc>,
    granularity: Granularity,
    now: DateTime<Utc>,
    options: PeriodOptions,
) -> Vec<PeriodBucket> {
    periods(anchor, granularity, now, options).collect()
}

/// Counts records into the bucket containing their `performed_at`.
///
/// `periods` must be ordered by start, as produced by [`build_periods`].
/// CREATE and UPDATE records contribute shade-level deltas, ADJUST records
/// contribute stock adjustments only, and every record in range increments
/// `activity_count`. Records outside all buckets are ignored.
#[must_use]
pub fn assign(
    records: &[AuditRecord],
    mut periods: Vec<PeriodBucket>,
    shades: &[Shade],
) -> Vec<PeriodBucket> {
    for record in records {
        let position = periods.partition_point(|bucket| bucket.period_start <= record.performed_at);
        let Some(bucket) = position
            .checked_sub(1)
            .and_then(|index| periods.get_mut(index))
            .filter(|bucket| bucket.contains(record.performed_at))
        else {
            continue;
        };

        bucket.activity_count = bucket.activity_count.saturating_add(1);
        match record.action {
            AuditAction::Create | AuditAction::Update => {
                for shade_delta in shade_deltas(record, shades) {
                    bucket.record_delta(shade_delta.delta, true);
                }
            }
            AuditAction::Adjust => {
                for adjustment in extract_stock_adjustments(record.description.as_str()) {
                    bucket.record_delta(adjustment.delta(), false);
                }
            }
            AuditAction::Delete | AuditAction::ImageUpload => {}
        }
    }

    periods
}

/// Drops buckets without activity or deltas.
#[must_use]
pub fn non_empty(periods: Vec<PeriodBucket>) -> Vec<PeriodBucket> {
    periods
        .into_iter()
        .filter(|bucket| !bucket.is_empty())
        .collect()
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|datetime| datetime.and_utc())
}
