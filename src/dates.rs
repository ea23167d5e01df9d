//! Sale-date selection.
//!
//! A sale's dates are always a contiguous ascending run of calendar days.
//! Taps on the calendar move between three shapes of selection: nothing
//! selected, a single anchored day, and a closed range.

use chrono::NaiveDate;

/// Shape of the current date selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    Empty,
    Anchored,
    Ranged,
}

/// Result of applying one calendar tap. `persist` is set only when the tap
/// produced a closed range, which is saved to the server immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapOutcome {
    pub dates: Vec<NaiveDate>,
    pub persist: bool,
}

/// Every day from `start` to `end` inclusive. An inverted pair yields an
/// empty list; `start == end` yields exactly one day.
#[must_use]
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        days.push(cursor);
        match cursor.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    days
}

#[must_use]
pub fn range_state(dates: &[NaiveDate]) -> RangeState {
    match dates.len() {
        0 => RangeState::Empty,
        1 => RangeState::Anchored,
        _ => RangeState::Ranged,
    }
}

/// The calendar tap state machine.
///
/// - Empty: the tapped day becomes the anchor.
/// - Anchored: a tap on or after the anchor closes the range and persists;
///   a tap before the anchor re-anchors on the tapped day.
/// - Ranged: a tap after the end extends the range from the existing start
///   and persists; any other tap collapses the selection to the tapped day
///   alone, which the user then grows again with a second tap.
#[must_use]
pub fn apply_day_tap(dates: &[NaiveDate], day: NaiveDate) -> TapOutcome {
    match range_state(dates) {
        RangeState::Empty => TapOutcome {
            dates: vec![day],
            persist: false,
        },
        RangeState::Anchored => {
            let anchor = dates[0];
            if day < anchor {
                TapOutcome {
                    dates: vec![day],
                    persist: false,
                }
            } else {
                TapOutcome {
                    dates: dates_in_range(anchor, day),
                    persist: true,
                }
            }
        }
        RangeState::Ranged => {
            let start = dates[0];
            let end = dates[dates.len() - 1];
            if day > end {
                TapOutcome {
                    dates: dates_in_range(start, day),
                    persist: true,
                }
            } else {
                TapOutcome {
                    dates: vec![day],
                    persist: false,
                }
            }
        }
    }
}
