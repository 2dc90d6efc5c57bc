use chrono::{DateTime, NaiveDate};

use crate::models::{NewRotationDay, RotationDay, RotationPattern};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Index of the rotation day governing `target_ms`, always in `[0, pattern_length)`.
///
/// Whole days are counted with floor division so instants before the pattern
/// was created wrap backwards onto the end of the rotation. A non-positive
/// length degenerates to a single repeating day.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn day_index(created_at_ms: i64, pattern_length: i64, target_ms: i64) -> usize {
    let length = pattern_length.max(1);
    let diff_days = target_ms.saturating_sub(created_at_ms).div_euclid(MS_PER_DAY);
    // rem_euclid is the ((d % n) + n) % n form: non-negative for negative d.
    diff_days.rem_euclid(length) as usize
}

/// Epoch milliseconds at UTC midnight of `date`.
#[must_use]
pub fn date_to_epoch_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |dt| dt.and_utc().timestamp_millis())
}

/// The UTC calendar day containing `epoch_ms`.
#[must_use]
pub fn epoch_ms_to_date(epoch_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(epoch_ms)
        .map_or(NaiveDate::MIN, |dt| dt.date_naive())
}

#[allow(clippy::cast_possible_wrap)]
impl RotationPattern {
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    #[must_use]
    pub fn day_for(&self, target_ms: i64) -> Option<&RotationDay> {
        let idx = day_index(self.created_at_ms, self.days.len() as i64, target_ms);
        self.days.get(idx)
    }

    /// Calendar-day lookup. The creation instant is truncated to its UTC day
    /// first so the hour the pattern was created at never shifts the cycle.
    #[must_use]
    pub fn day_for_date(&self, date: NaiveDate) -> Option<&RotationDay> {
        let created = date_to_epoch_ms(epoch_ms_to_date(self.created_at_ms));
        let idx = day_index(created, self.days.len() as i64, date_to_epoch_ms(date));
        self.days.get(idx)
    }

    #[must_use]
    pub fn find_day(&self, day_id: &str) -> Option<&RotationDay> {
        self.days.iter().find(|d| d.id == day_id)
    }
}

// --- Presets ---

pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub days: &'static [&'static str],
}

pub const PRESETS: &[Preset] = &[
    Preset {
        key: "ppl",
        name: "Push / Pull / Legs",
        days: &["push", "pull", "legs", "push", "pull", "legs", "rest"],
    },
    Preset {
        key: "upper-lower",
        name: "Upper / Lower",
        days: &["upper", "lower", "rest", "upper", "lower", "rest", "rest"],
    },
    Preset {
        key: "full-body",
        name: "Full body, alternate days",
        days: &["full body", "rest", "full body", "rest", "full body", "rest", "rest"],
    },
    Preset {
        key: "bro-split",
        name: "Body-part split",
        days: &["chest", "back", "legs", "shoulders", "arms", "rest", "rest"],
    },
    Preset {
        key: "rest",
        name: "Rest only",
        days: &["rest"],
    },
];

#[must_use]
pub fn find_preset(key: &str) -> Option<&'static Preset> {
    let key = key.trim().to_lowercase();
    PRESETS.iter().find(|p| p.key == key)
}

impl Preset {
    #[must_use]
    pub fn new_days(&self) -> Vec<NewRotationDay> {
        self.days.iter().map(|l| NewRotationDay::labelled(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(labels: &[&str], created_at_ms: i64) -> RotationPattern {
        RotationPattern {
            id: "p".to_string(),
            owner_id: "o".to_string(),
            days: labels
                .iter()
                .enumerate()
                .map(|(i, l)| RotationDay {
                    id: format!("d{}", i + 1),
                    day_number: i as i64 + 1,
                    split_label: (*l).to_string(),
                    is_rest_day: *l == "rest",
                })
                .collect(),
            created_at_ms,
            active: true,
        }
    }

    #[test]
    fn test_day_index_in_range_and_periodic() {
        for length in 1..=10_i64 {
            for diff in -30..=30_i64 {
                let idx = day_index(0, length, diff * MS_PER_DAY);
                assert!((idx as i64) < length);
                for k in -3..=3_i64 {
                    let shifted = (diff + k * length) * MS_PER_DAY;
                    assert_eq!(day_index(0, length, shifted), idx);
                }
            }
        }
    }

    #[test]
    fn test_day_before_creation_wraps_to_last_day() {
        assert_eq!(day_index(0, 7, -MS_PER_DAY), 6);
        // One millisecond before creation is still the previous day.
        assert_eq!(day_index(0, 7, -1), 6);
    }

    #[test]
    fn test_day_index_counts_whole_days() {
        let created = 1_700_000_000_000;
        assert_eq!(day_index(created, 7, created), 0);
        assert_eq!(day_index(created, 7, created + MS_PER_DAY - 1), 0);
        assert_eq!(day_index(created, 7, created + MS_PER_DAY), 1);
        assert_eq!(day_index(created, 7, created + 7 * MS_PER_DAY), 0);
    }

    #[test]
    fn test_non_positive_length_clamps_to_one() {
        assert_eq!(day_index(0, 0, 5 * MS_PER_DAY), 0);
        assert_eq!(day_index(0, -4, -5 * MS_PER_DAY), 0);
    }

    #[test]
    fn test_day_for_date_ignores_creation_hour() {
        // Created 2024-06-10 at 22:00 UTC.
        let created = date_to_epoch_ms(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            + 22 * 3_600_000;
        let p = pattern(&["push", "pull", "legs"], created);
        let next = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        assert_eq!(p.day_for_date(next).unwrap().split_label, "pull");
        let before = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        assert_eq!(p.day_for_date(before).unwrap().split_label, "legs");
    }

    #[test]
    fn test_day_for_empty_pattern_is_none() {
        let p = pattern(&[], 0);
        assert!(p.day_for(MS_PER_DAY).is_none());
    }

    #[test]
    fn test_presets_are_well_formed() {
        for preset in PRESETS {
            assert!(!preset.days.is_empty());
            assert!(preset.days.len() <= crate::models::MAX_ROTATION_DAYS);
        }
        assert_eq!(find_preset("PPL").unwrap().days.len(), 7);
        assert!(find_preset("nope").is_none());
    }

    #[test]
    fn test_epoch_round_trip() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(epoch_ms_to_date(date_to_epoch_ms(d) + 3_600_000), d);
    }
}
