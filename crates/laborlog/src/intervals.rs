//! Gaps between consecutive contractions.
//!
//! Intervals are never stored. They are derived from whatever list of
//! contractions the caller holds, every time they are asked for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{whole_minutes, Contraction};

/// The rest period between the end of one contraction and the start of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Whole minutes between `from` and `to`, floored. May be zero or negative.
    pub minutes: i64,
    /// End of the earlier contraction.
    pub from: DateTime<Utc>,
    /// Start of the later contraction.
    pub to: DateTime<Utc>,
}

/// Derive the chronological sequence of intervals.
///
/// Contractions are ordered by start time; a pair whose earlier member is
/// still in progress yields no interval.
#[must_use]
pub fn intervals(contractions: &[Contraction]) -> Vec<Interval> {
    let mut sorted: Vec<&Contraction> = contractions.iter().collect();
    sorted.sort_by_key(|c| c.start_time);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let from = pair[0].end_time?;
            let to = pair[1].start_time;
            Some(Interval {
                minutes: whole_minutes(from, to),
                from,
                to,
            })
        })
        .collect()
}

/// The most recent interval, if any.
#[must_use]
pub fn latest_interval(contractions: &[Contraction]) -> Option<Interval> {
    intervals(contractions).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn contraction(id: i64, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Contraction {
        Contraction {
            id,
            start_time: start,
            end_time: end,
            duration_seconds: end.map(|e| crate::model::whole_seconds(start, e)),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_empty_and_single() {
        assert!(intervals(&[]).is_empty());
        assert!(latest_interval(&[]).is_none());

        let one = [contraction(1, at(8, 0, 0), Some(at(8, 1, 0)))];
        assert!(intervals(&one).is_empty());
        assert!(latest_interval(&one).is_none());
    }

    #[test]
    fn test_interval_floors_minutes() {
        let list = [
            contraction(1, at(7, 59, 0), Some(at(8, 0, 0))),
            contraction(2, at(8, 5, 30), None),
        ];

        let result = intervals(&list);
        assert_eq!(
            result,
            vec![Interval {
                minutes: 5,
                from: at(8, 0, 0),
                to: at(8, 5, 30),
            }]
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        // Newest first, as the API lists them.
        let list = [
            contraction(3, at(8, 20, 0), None),
            contraction(2, at(8, 10, 0), Some(at(8, 11, 0))),
            contraction(1, at(8, 0, 0), Some(at(8, 1, 0))),
        ];

        let result = intervals(&list);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].minutes, 9);
        assert_eq!(result[0].from, at(8, 1, 0));
        assert_eq!(result[1].minutes, 9);
        assert_eq!(result[1].to, at(8, 20, 0));

        assert_eq!(latest_interval(&list), Some(result[1]));
    }

    #[test]
    fn test_skips_pairs_after_in_progress() {
        let list = [
            contraction(1, at(8, 0, 0), Some(at(8, 1, 0))),
            contraction(2, at(8, 10, 0), None),
            contraction(3, at(8, 20, 0), Some(at(8, 21, 0))),
            contraction(4, at(8, 30, 0), None),
        ];

        let result = intervals(&list);
        // Pairs: (1,2) emitted, (2,3) skipped, (3,4) emitted.
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].to, at(8, 10, 0));
        assert_eq!(result[1].from, at(8, 21, 0));
    }

    #[test]
    fn test_count_matches_finished_predecessors() {
        let ends = [true, false, false, true, true, false, true];
        let list: Vec<Contraction> = ends
            .iter()
            .enumerate()
            .map(|(i, finished)| {
                let minute = u32::try_from(i).unwrap() * 5;
                let start = at(9, minute, 0);
                contraction(
                    i64::try_from(i).unwrap(),
                    start,
                    finished.then(|| start + chrono::Duration::seconds(45)),
                )
            })
            .collect();

        let expected = ends[..ends.len() - 1].iter().filter(|f| **f).count();
        assert_eq!(intervals(&list).len(), expected);
    }

    #[test]
    fn test_overlap_is_not_clamped() {
        let list = [
            contraction(1, at(8, 0, 0), Some(at(8, 3, 0))),
            contraction(2, at(8, 2, 0), None),
        ];

        let result = intervals(&list);
        assert_eq!(result[0].minutes, -1);
    }
}
