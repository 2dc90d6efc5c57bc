//! The one place untyped stored documents become typed values.
//!
//! Documents may come from older app versions (camelCase keys, numbers stored
//! as strings, missing fields), so every accessor is lenient and every decode
//! is total: anything unusable falls back to the documented default.

use serde_json::Value;
use tracing::warn;

use crate::models::{
    Anchors, DEFAULT_MEALS_PER_DAY, DEFAULT_SLEEP_TIME, DEFAULT_TRAINING_DURATION,
    DEFAULT_WAKE_TIME, MAX_ROTATION_DAYS, MealSlot, ProfileSettings, RotationDay,
    RotationPattern, SlotConfig, SlotMode, TemplateBinding, clamp_meals_per_day,
};
use crate::timeline::{minutes_to_time_string, parse_time_to_minutes};

fn field<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| doc.get(*k))
        .filter(|v| !v.is_null())
}

fn str_field<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(doc, keys).and_then(Value::as_str)
}

fn int_field(doc: &Value, keys: &[&str]) -> Option<i64> {
    let v = field(doc, keys)?;
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn bool_field(doc: &Value, keys: &[&str]) -> Option<bool> {
    let v = field(doc, keys)?;
    v.as_bool().or_else(|| match v.as_str()? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    })
}

/// Normalised "HH:MM", or `None` when missing or malformed.
fn time_field(doc: &Value, keys: &[&str]) -> Option<String> {
    str_field(doc, keys)
        .and_then(parse_time_to_minutes)
        .map(minutes_to_time_string)
}

fn time_or_default(doc: &Value, keys: &[&str], default: &str) -> String {
    time_field(doc, keys).unwrap_or_else(|| {
        if field(doc, keys).is_some() {
            warn!(field = keys[0], default, "malformed time, using default");
        }
        default.to_string()
    })
}

#[must_use]
pub fn decode_anchors(doc: &Value) -> Anchors {
    let training_duration = match int_field(doc, &["training_duration", "trainingDuration"]) {
        Some(d) if d > 0 => d,
        _ => DEFAULT_TRAINING_DURATION,
    };
    Anchors {
        wake_time: time_or_default(doc, &["wake_time", "wakeTime"], DEFAULT_WAKE_TIME),
        sleep_time: time_or_default(doc, &["sleep_time", "sleepTime"], DEFAULT_SLEEP_TIME),
        training_time: time_field(doc, &["training_time", "trainingTime"]),
        training_after_slot: int_field(doc, &["training_after_slot", "trainingAfterSlot"])
            .filter(|s| *s >= 0),
        training_duration,
    }
}

fn decode_slot(doc: &Value, position: i64) -> MealSlot {
    MealSlot {
        slot_number: int_field(doc, &["slot_number", "slotNumber"]).unwrap_or(position),
        mode: str_field(doc, &["mode"])
            .and_then(SlotMode::from_name)
            .unwrap_or_default(),
        template_id: str_field(doc, &["template_id", "templateId"]).map(str::to_string),
        template_name: str_field(doc, &["template_name", "templateName"]).map(str::to_string),
        relative_time: str_field(doc, &["relative_time", "relativeTime"]).map(str::to_string),
        absolute_time: time_field(doc, &["absolute_time", "absoluteTime"]),
    }
}

/// Slots come back as exactly `1..=meals_per_day`, one each, in order.
#[must_use]
pub fn decode_slot_config(doc: &Value) -> SlotConfig {
    let meals_per_day = clamp_meals_per_day(
        int_field(doc, &["meals_per_day", "mealsPerDay"]).unwrap_or(DEFAULT_MEALS_PER_DAY),
    );
    let stored: Vec<MealSlot> = field(doc, &["slots", "mealSlots"])
        .and_then(Value::as_array)
        .map(|arr| {
            (1..)
                .zip(arr)
                .map(|(position, v)| decode_slot(v, position))
                .collect()
        })
        .unwrap_or_default();
    let slots = (1..=meals_per_day)
        .map(|n| {
            stored
                .iter()
                .rev()
                .find(|s| s.slot_number == n)
                .cloned()
                .unwrap_or_else(|| MealSlot::new(n))
        })
        .collect();
    SlotConfig {
        meals_per_day,
        slots,
    }
}

#[must_use]
pub fn decode_profile(doc: &Value) -> ProfileSettings {
    let anchors = field(doc, &["anchors"]).map_or_else(|| decode_anchors(doc), decode_anchors);
    let slot_config = field(doc, &["slot_config", "slotConfig"])
        .map_or_else(|| decode_slot_config(doc), decode_slot_config);
    ProfileSettings {
        anchors,
        slot_config,
    }
}

fn decode_day(doc: &Value, pattern_id: &str, day_number: i64) -> RotationDay {
    let split_label = str_field(doc, &["split_label", "splitLabel", "label"])
        .unwrap_or_default()
        .trim()
        .to_string();
    let is_rest_day = bool_field(doc, &["is_rest_day", "isRestDay"])
        .unwrap_or_else(|| split_label.eq_ignore_ascii_case("rest"));
    RotationDay {
        id: str_field(doc, &["id"])
            .map_or_else(|| format!("{pattern_id}-day-{day_number}"), str::to_string),
        day_number,
        split_label,
        is_rest_day,
    }
}

/// Days are renumbered by position and capped at the rotation maximum. A
/// pattern with no usable days becomes a single repeating rest day.
#[must_use]
pub fn decode_pattern(doc: &Value) -> RotationPattern {
    let id = str_field(doc, &["id"]).unwrap_or_default().to_string();
    let mut days: Vec<RotationDay> = field(doc, &["days"])
        .and_then(Value::as_array)
        .map(|arr| {
            (1..)
                .zip(arr.iter().take(MAX_ROTATION_DAYS))
                .map(|(n, d)| decode_day(d, &id, n))
                .collect()
        })
        .unwrap_or_default();
    if days.is_empty() {
        warn!(pattern = %id, "rotation pattern has no days, using a single rest day");
        days.push(RotationDay {
            id: format!("{id}-day-1"),
            day_number: 1,
            split_label: "rest".to_string(),
            is_rest_day: true,
        });
    }
    RotationPattern {
        owner_id: str_field(doc, &["owner_id", "ownerId", "userId"])
            .unwrap_or_default()
            .to_string(),
        created_at_ms: int_field(doc, &["created_at_ms", "createdAt"]).unwrap_or(0),
        active: bool_field(doc, &["active", "isActive"]).unwrap_or(false),
        days,
        id,
    }
}

/// Entries without a rotation day or template id cannot be bound and are skipped.
#[must_use]
pub fn decode_bindings(doc: &Value) -> Vec<TemplateBinding> {
    let Some(entries) = doc.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|b| {
            let rotation_day_id = str_field(b, &["rotation_day_id", "rotationDayId"])?;
            let template_id = str_field(b, &["template_id", "templateId"])?;
            let slot_number = int_field(b, &["slot_number", "slotNumber"])?;
            Some(TemplateBinding {
                rotation_day_id: rotation_day_id.to_string(),
                rotation_day_name: str_field(b, &["rotation_day_name", "rotationDayName"])
                    .unwrap_or_default()
                    .to_string(),
                slot_number,
                template_id: template_id.to_string(),
                template_name: str_field(b, &["template_name", "templateName"])
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anchor_defaults() {
        let a = decode_anchors(&json!({
            "wakeTime": "7am",
            "sleepTime": null,
            "trainingTime": "18:0",
            "trainingAfterSlot": "3",
            "trainingDuration": -5
        }));
        assert_eq!(a.wake_time, "07:00");
        assert_eq!(a.sleep_time, "23:00");
        assert_eq!(a.training_time.as_deref(), Some("18:00"));
        assert_eq!(a.training_after_slot, Some(3));
        assert_eq!(a.training_duration, DEFAULT_TRAINING_DURATION);
    }

    #[test]
    fn test_negative_after_slot_dropped() {
        let a = decode_anchors(&json!({ "training_after_slot": -1 }));
        assert_eq!(a.training_after_slot, None);
    }

    #[test]
    fn test_slot_config_normalised() {
        let cfg = decode_slot_config(&json!({
            "mealsPerDay": 3,
            "slots": [
                { "slotNumber": 2, "mode": "fixed_template", "absoluteTime": "8:30" },
                { "slotNumber": 7, "mode": "rotation_linked" },
                { "mode": "bogus", "absoluteTime": "whenever" }
            ]
        }));
        assert_eq!(cfg.meals_per_day, 3);
        let numbers: Vec<i64> = cfg.slots.iter().map(|s| s.slot_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let two = cfg.slot(2).unwrap();
        assert_eq!(two.mode, SlotMode::FixedTemplate);
        assert_eq!(two.absolute_time.as_deref(), Some("08:30"));
        // Third entry had no slot number, so it takes its position.
        let three = cfg.slot(3).unwrap();
        assert_eq!(three.mode, SlotMode::AiGenerated);
        assert_eq!(three.absolute_time, None);
    }

    #[test]
    fn test_meals_per_day_clamped() {
        assert_eq!(decode_slot_config(&json!({ "meals_per_day": 40 })).meals_per_day, 8);
        assert_eq!(decode_slot_config(&json!({})).meals_per_day, DEFAULT_MEALS_PER_DAY);
    }

    #[test]
    fn test_profile_round_trips_through_serde() {
        let mut settings = ProfileSettings::default();
        settings.anchors.training_time = Some("17:30".to_string());
        settings.anchors.training_after_slot = Some(2);
        settings.slot_config.slots[0].absolute_time = Some("06:15".to_string());
        let doc = serde_json::to_value(&settings).unwrap();
        assert_eq!(decode_profile(&doc), settings);
    }

    #[test]
    fn test_pattern_without_days_gets_rest_day() {
        let p = decode_pattern(&json!({ "id": "p1", "days": [] }));
        assert_eq!(p.days.len(), 1);
        assert!(p.days[0].is_rest_day);
        assert_eq!(p.days[0].id, "p1-day-1");
    }

    #[test]
    fn test_pattern_days_renumbered_and_capped() {
        let days: Vec<Value> = (0..12)
            .map(|i| json!({ "id": format!("d{i}"), "splitLabel": "legs", "dayNumber": 99 }))
            .collect();
        let p = decode_pattern(&json!({
            "id": "p1",
            "createdAt": 1_700_000_000_000_i64,
            "isActive": true,
            "days": days
        }));
        assert_eq!(p.days.len(), MAX_ROTATION_DAYS);
        assert_eq!(p.days[4].day_number, 5);
        assert!(p.active);
        assert_eq!(p.created_at_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_bindings_skip_incomplete_entries() {
        let list = decode_bindings(&json!([
            { "rotationDayId": "d1", "slotNumber": 0, "templateId": "w1", "templateName": "Legs" },
            { "rotationDayId": "d1", "templateId": "m1" },
            { "slotNumber": 1, "templateId": "m1" }
        ]));
        assert_eq!(list.len(), 1);
        assert!(list[0].is_workout());
        assert!(decode_bindings(&json!({ "not": "a list" })).is_empty());
    }
}
