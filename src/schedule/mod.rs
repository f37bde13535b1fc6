/// Contribution schedule
///
/// Maps payment indices ("Day 3", "Week 2", ...) to calendar dates and
/// works out which slot an agent may record next. Everything here is pure.

use crate::db::{customer::ContributionFrequency, payment::Payment};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Highest index searched for the next open slot
pub const INDEX_LIMIT: i64 = 100;

/// Days between two consecutive slots
pub fn interval_days(frequency: ContributionFrequency) -> i64 {
    match frequency {
        ContributionFrequency::Daily => 1,
        ContributionFrequency::Weekly => 7,
        ContributionFrequency::Monthly => 30,
        ContributionFrequency::Yearly => 365,
    }
}

/// Number of slots shown in one cycle
pub fn max_slots(frequency: ContributionFrequency) -> i64 {
    match frequency {
        ContributionFrequency::Daily => 31,
        ContributionFrequency::Weekly => 52,
        ContributionFrequency::Monthly => 12,
        ContributionFrequency::Yearly => 5,
    }
}

/// Indices already paid, ignoring payments recorded without one
pub fn paid_indices(payments: &[Payment]) -> BTreeSet<i64> {
    payments.iter().filter_map(|p| p.payment_index).collect()
}

/// Lowest unpaid index in `1..=100`, `None` once all are paid
pub fn next_available_index(paid: &BTreeSet<i64>) -> Option<i64> {
    if paid.is_empty() {
        return Some(1);
    }
    (1..=INDEX_LIMIT).find(|i| !paid.contains(i))
}

/// First day of the current cycle
///
/// Daily plans with history restart each month on the day-of-month of their
/// earliest payment. Every other plan starts today.
pub fn cycle_start(
    frequency: ContributionFrequency,
    payments: &[Payment],
    today: NaiveDate,
) -> NaiveDate {
    if frequency != ContributionFrequency::Daily {
        return today;
    }

    let Some(earliest) = payments.iter().map(|p| p.created_at).min() else {
        return today;
    };

    let day = earliest.day();
    // Clamp e.g. day 31 to the end of a shorter month
    (0..4)
        .find_map(|back| today.with_day(day - back))
        .unwrap_or(today)
}

/// Date of slot `index` (1-based) in a cycle starting at `start`
pub fn date_for_index(start: NaiveDate, frequency: ContributionFrequency, index: i64) -> NaiveDate {
    start + Duration::days((index - 1) * interval_days(frequency))
}

/// Whether a slot can be chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Paid,
    Available,
    Locked,
}

/// One cell of the schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub index: i64,
    /// "Day 1", "Week 2", ...
    pub label: String,
    pub date: NaiveDate,
    pub state: SlotState,
    pub selected: bool,
}

/// Schedule of one customer for the current cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub frequency: ContributionFrequency,
    pub cycle_start: NaiveDate,
    pub paid_count: usize,
    pub next_available_index: Option<i64>,
    pub slots: Vec<Slot>,
}

/// Build the schedule
///
/// With no payments yet every slot is open. After that only the next unpaid
/// index is. `selected` defaults to the next available index.
pub fn calendar(
    frequency: ContributionFrequency,
    payments: &[Payment],
    today: NaiveDate,
    selected: Option<i64>,
) -> Calendar {
    let paid = paid_indices(payments);
    let next = next_available_index(&paid);
    let start = cycle_start(frequency, payments, today);
    let selected = selected.or(next);

    let slots = (1..=max_slots(frequency))
        .map(|index| {
            let state = if paid.contains(&index) {
                SlotState::Paid
            } else if paid.is_empty() || Some(index) == next {
                SlotState::Available
            } else {
                SlotState::Locked
            };
            Slot {
                index,
                label: format!("{} {}", frequency.period_label(), index),
                date: date_for_index(start, frequency, index),
                state,
                selected: selected == Some(index),
            }
        })
        .collect();

    Calendar {
        frequency,
        cycle_start: start,
        paid_count: paid.len(),
        next_available_index: next,
        slots,
    }
}
