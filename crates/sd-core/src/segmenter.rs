//! Activity segmentation algorithm.
//!
//! Turns a continuous stream of activity intervals (browser visits, calendar
//! entries, ...) into alternating awake and asleep records:
//! 1. Coalesce activities separated by less than a minute
//! 2. Split the result into days at the largest gap within a bounded window
//! 3. Emit an awake record per day and an asleep record between days

use chrono::{DateTime, Duration, Utc};

use crate::types::{Activity, Record, Status};

/// Default upper bound on the length of one day: 32 hours.
pub const DEFAULT_MAXIMUM_DAY_LENGTH_MS: i64 = 32 * 60 * 60 * 1000;

/// Configuration for activity segmentation.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Longest span a single day window may cover. Also the longest gap that
    /// is still reported as a night rather than a missing record.
    /// Default: 115,200,000 (32 h).
    pub maximum_day_length_ms: i64,

    /// Activities closer than this are merged. Default: 60,000 (1 min).
    pub merge_threshold_ms: i64,

    /// Gaps must exceed this to count as sleep. Default: 3,600,000 (1 h).
    pub minimum_sleep_ms: i64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            maximum_day_length_ms: DEFAULT_MAXIMUM_DAY_LENGTH_MS,
            merge_threshold_ms: 60_000,
            minimum_sleep_ms: 3_600_000,
        }
    }
}

impl SegmenterConfig {
    /// Default thresholds with a custom day length.
    #[must_use]
    pub fn with_maximum_day_length_ms(maximum_day_length_ms: i64) -> Self {
        Self {
            maximum_day_length_ms,
            ..Self::default()
        }
    }
}

/// Merges activities separated by less than `merge_threshold_ms`.
///
/// The comparison boundary is the end of the most recently *created* entry.
/// Extending an entry through a merge does not move the boundary, so two
/// activities a few seconds apart can still land in separate entries when an
/// earlier merge stretched the previous one.
#[must_use]
pub fn coalesce(activities: &[Activity], config: &SegmenterConfig) -> Vec<Activity> {
    let mut sorted = activities.to_vec();
    sorted.sort_by_key(|a| a.start);

    let mut merged: Vec<Activity> = Vec::with_capacity(sorted.len());
    let mut boundary: Option<DateTime<Utc>> = None;

    for activity in sorted {
        let close = boundary.is_some_and(|boundary| {
            (activity.start - boundary).num_milliseconds() < config.merge_threshold_ms
        });
        if let (true, Some(last)) = (close, merged.last_mut()) {
            last.end = last.end.max(activity.end);
            continue;
        }
        boundary = Some(activity.end);
        merged.push(activity);
    }

    merged
}

/// Segments activities into awake and asleep records.
///
/// # Algorithm
///
/// Starting at the first coalesced activity, a day window grows one activity
/// at a time, remembering the largest gap between neighbours (the first one
/// wins a tie). The window closes once the newest activity ends more than
/// `maximum_day_length_ms` after the window start. A largest gap above
/// `minimum_sleep_ms` is the day's sleep:
///
/// - an asleep record covers the previous sleep point to this day's wake
///   point, unless that gap is `maximum_day_length_ms` or longer (a missing
///   night);
/// - an awake record covers this day's wake point to the sleep gap.
///
/// The next day starts at the activity after the chosen gap, or one activity
/// later when the window held no gap. A window without a qualifying gap
/// produces nothing unless it reaches the end of input, where it becomes the
/// final awake record.
#[must_use]
pub fn segment(activities: &[Activity], config: &SegmenterConfig) -> Vec<Record> {
    let activities = coalesce(activities, config);
    let mut records = Vec::new();
    if activities.len() < 2 {
        return records;
    }

    let one_ms = Duration::milliseconds(1);
    let last = activities.len() - 1;
    let mut wake_index = 0;
    let mut previous_sleep: Option<DateTime<Utc>> = None;

    let emit_day = |wake: DateTime<Utc>,
                        sleep: DateTime<Utc>,
                        previous_sleep: Option<DateTime<Utc>>,
                        records: &mut Vec<Record>| {
        if let Some(fell_asleep) = previous_sleep {
            let night_ms = (wake - fell_asleep).num_milliseconds();
            if night_ms < config.maximum_day_length_ms {
                records.push(Record::new(Status::Asleep, fell_asleep + one_ms, wake - one_ms));
            } else {
                tracing::trace!(%fell_asleep, %wake, "dropping missing night");
            }
        }
        records.push(Record::new(Status::Awake, wake, sleep));
    };

    loop {
        let window_start = activities[wake_index].start;
        let mut index = wake_index;
        let mut best_gap: Option<(usize, i64)> = None;

        while index < last {
            let next = &activities[index + 1];
            let gap = (next.start - activities[index].end).num_milliseconds();
            if best_gap.is_none_or(|(_, best)| gap > best) {
                best_gap = Some((index, gap));
            }
            index += 1;
            if (next.end - window_start).num_milliseconds() > config.maximum_day_length_ms {
                break;
            }
        }

        let reached_end = index == last;
        match best_gap {
            Some((gap_index, gap)) if gap > config.minimum_sleep_ms => {
                let wake = activities[wake_index].start;
                let sleep = activities[gap_index].end;
                tracing::trace!(%wake, %sleep, gap_ms = gap, "segmented day");
                emit_day(wake, sleep, previous_sleep, &mut records);
                previous_sleep = Some(sleep);
                wake_index = gap_index + 1;
            }
            _ if reached_end => {
                emit_day(
                    activities[wake_index].start,
                    activities[last].end,
                    previous_sleep,
                    &mut records,
                );
                break;
            }
            best => {
                // No sleep inside the window: the night before cannot be
                // placed, so the next asleep record is not emitted.
                previous_sleep = None;
                wake_index = best.map_or(wake_index + 1, |(gap_index, _)| gap_index + 1);
            }
        }

        if wake_index > last {
            break;
        }
    }

    records
}
