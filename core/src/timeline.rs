//! Wall-clock placement of meal slots around the wake, training and sleep anchors.
//!
//! All arithmetic happens in minutes relative to wake time, so a window that
//! crosses midnight (sleep earlier on the clock than wake) is just a longer
//! span. Results are folded back to minutes-since-midnight at the end.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};

use crate::models::{Anchors, MAX_TRAINING_DURATION, MealSlot, SlotConfig, clamp_meals_per_day};

pub const MINUTES_PER_DAY: i64 = 1440;
/// How long before training starts the pre-training meal lands.
pub const PRE_TRAINING_OFFSET: i64 = 60;
/// How long after training ends the post-training meal lands.
pub const POST_TRAINING_OFFSET: i64 = 30;

/// Parse "HH:MM" into minutes since midnight. `None` for anything malformed.
#[must_use]
pub fn parse_time_to_minutes(time: &str) -> Option<i64> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
    Some(i64::from(parsed.hour()) * 60 + i64::from(parsed.minute()))
}

/// Parse `time`, falling back to `default` (itself "HH:MM") when malformed.
#[must_use]
pub fn parse_time_or(time: &str, default: &str) -> i64 {
    parse_time_to_minutes(time)
        .or_else(|| parse_time_to_minutes(default))
        .unwrap_or(0)
}

#[must_use]
pub fn minutes_to_time_string(minutes: i64) -> String {
    let m = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Training as the caller describes it. Nothing here is validated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Training {
    pub start: i64,
    pub after_slot: i64,
    pub duration: i64,
}

impl Training {
    /// `None` unless both a parseable training time and an after-slot are set.
    #[must_use]
    pub fn from_anchors(anchors: &Anchors) -> Option<Self> {
        Some(Self {
            start: anchors.training_minutes()?,
            after_slot: anchors.training_after_slot?,
            duration: anchors.effective_training_duration(),
        })
    }
}

/// Which anchor a slot's time is placed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    AfterWake,
    BetweenMeals,
    PreTraining,
    PostTraining,
    BeforeSleep,
}

impl Placement {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::AfterWake => "after wake",
            Self::BetweenMeals => "between meals",
            Self::PreTraining => "pre-training",
            Self::PostTraining => "post-training",
            Self::BeforeSleep => "before sleep",
        }
    }
}

/// Minutes from wake to sleep. Equal times mean a full 24h window.
fn window_span(wake: i64, sleep: i64) -> i64 {
    match (sleep - wake).rem_euclid(MINUTES_PER_DAY) {
        0 => MINUTES_PER_DAY,
        span => span,
    }
}

/// Training that will actually bend the timeline, in wake-relative minutes.
///
/// Dropped when the after-slot leaves no slot after training
/// (`after_slot >= meals_per_day`), is negative, or when training starts
/// outside the waking window.
fn effective_training(
    meals_per_day: i64,
    wake: i64,
    span: i64,
    training: Option<Training>,
) -> Option<Training> {
    let training = training?;
    if training.after_slot < 0 || training.after_slot >= meals_per_day {
        return None;
    }
    let start = (training.start.rem_euclid(MINUTES_PER_DAY) - wake).rem_euclid(MINUTES_PER_DAY);
    if start >= span {
        return None;
    }
    Some(Training {
        start,
        after_slot: training.after_slot,
        duration: training.duration.clamp(0, MAX_TRAINING_DURATION),
    })
}

/// Spread `slots` evenly strictly inside `(start, end)`. The first slot of a
/// run that opens at wake is `AfterWake`, the last of a run that closes at
/// sleep is `BeforeSleep`.
#[allow(clippy::cast_possible_wrap)]
fn spread(
    out: &mut Vec<(i64, i64, Placement)>,
    slots: std::ops::RangeInclusive<i64>,
    (start, from_wake): (i64, bool),
    (end, to_sleep): (i64, bool),
) {
    let count = slots.clone().count() as i64;
    for (position, slot) in (1..).zip(slots) {
        let placement = if position == 1 && from_wake {
            Placement::AfterWake
        } else if position == count && to_sleep {
            Placement::BeforeSleep
        } else {
            Placement::BetweenMeals
        };
        out.push((slot, start + (end - start) * position / (count + 1), placement));
    }
}

/// Computed (slot, minutes-since-midnight, placement) for slots `1..=N`,
/// ignoring any user overrides.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn plan_slots(
    meals_per_day: i64,
    wake: i64,
    training: Option<Training>,
    sleep: i64,
) -> Vec<(i64, i64, Placement)> {
    let n = clamp_meals_per_day(meals_per_day);
    let wake = wake.rem_euclid(MINUTES_PER_DAY);
    let span = window_span(wake, sleep.rem_euclid(MINUTES_PER_DAY));
    let mut planned = Vec::with_capacity(n as usize);

    match effective_training(n, wake, span, training) {
        None => spread(&mut planned, 1..=n, (0, true), (span, true)),
        Some(t) => {
            let pre = (t.start - PRE_TRAINING_OFFSET).max(0);
            let post = (t.start + t.duration + POST_TRAINING_OFFSET).min(span);
            if t.after_slot >= 1 {
                spread(&mut planned, 1..=t.after_slot - 1, (0, true), (pre, false));
                planned.push((t.after_slot, pre, Placement::PreTraining));
            }
            planned.push((t.after_slot + 1, post, Placement::PostTraining));
            spread(&mut planned, t.after_slot + 2..=n, (post, false), (span, true));
        }
    }

    for entry in &mut planned {
        entry.1 = (wake + entry.1).rem_euclid(MINUTES_PER_DAY);
    }
    planned
}

/// Minutes since midnight for every meal slot `1..=meals_per_day`.
///
/// A slot with a well-formed absolute override keeps it verbatim; every
/// other slot is placed between its bounding anchors.
#[must_use]
pub fn all_slot_times(
    config: &SlotConfig,
    wake: i64,
    training: Option<Training>,
    sleep: i64,
) -> BTreeMap<i64, i64> {
    plan_slots(config.meals_per_day, wake, training, sleep)
        .into_iter()
        .map(|(slot, computed, _)| {
            let minutes = config
                .slot(slot)
                .and_then(MealSlot::override_minutes)
                .unwrap_or(computed);
            (slot, minutes)
        })
        .collect()
}

/// `all_slot_times` driven straight from the profile anchors.
#[must_use]
pub fn slot_times_for(config: &SlotConfig, anchors: &Anchors) -> BTreeMap<i64, i64> {
    all_slot_times(
        config,
        anchors.wake_minutes(),
        Training::from_anchors(anchors),
        anchors.sleep_minutes(),
    )
}

/// "HH:MM" per slot, ready for display or notification scheduling.
#[must_use]
pub fn slot_time_strings(config: &SlotConfig, anchors: &Anchors) -> BTreeMap<i64, String> {
    slot_times_for(config, anchors)
        .into_iter()
        .map(|(slot, m)| (slot, minutes_to_time_string(m)))
        .collect()
}

/// The training window that shapes the timeline, or `None` when the anchor
/// is ignored. Start and end are minutes since midnight.
#[must_use]
pub fn applied_training(meals_per_day: i64, anchors: &Anchors) -> Option<(i64, i64, Training)> {
    let wake = anchors.wake_minutes();
    let span = window_span(wake, anchors.sleep_minutes());
    let raw = Training::from_anchors(anchors)?;
    let t = effective_training(clamp_meals_per_day(meals_per_day), wake, span, Some(raw))?;
    Some((raw.start, (raw.start + t.duration).rem_euclid(MINUTES_PER_DAY), t))
}

/// Regenerate slots `1..=N` for new settings.
///
/// Mode and template choices for slot numbers that already existed are
/// carried over from `previous`; absolute overrides are not (see `merge`).
#[must_use]
pub fn fresh_slot_config(
    meals_per_day: i64,
    anchors: &Anchors,
    previous: Option<&SlotConfig>,
) -> SlotConfig {
    let n = clamp_meals_per_day(meals_per_day);
    let plan = plan_slots(
        n,
        anchors.wake_minutes(),
        Training::from_anchors(anchors),
        anchors.sleep_minutes(),
    );
    let slots = plan
        .into_iter()
        .map(|(slot_number, _, placement)| {
            let carried = previous.and_then(|p| p.slot(slot_number));
            MealSlot {
                slot_number,
                mode: carried.map(|s| s.mode).unwrap_or_default(),
                template_id: carried.and_then(|s| s.template_id.clone()),
                template_name: carried.and_then(|s| s.template_name.clone()),
                relative_time: Some(placement.describe().to_string()),
                absolute_time: None,
            }
        })
        .collect();
    SlotConfig {
        meals_per_day: n,
        slots,
    }
}
