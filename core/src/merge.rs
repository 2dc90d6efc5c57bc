use crate::models::SlotConfig;

/// Carry user-pinned times from `existing` onto a freshly generated config.
///
/// The result has exactly `fresh`'s slots. A slot present in both takes the
/// existing absolute override when one is set; everything else comes from
/// `fresh`. Slots that only exist in `existing` are dropped.
#[must_use]
pub fn merge(fresh: &SlotConfig, existing: &SlotConfig) -> SlotConfig {
    let mut merged = fresh.clone();
    for slot in &mut merged.slots {
        if let Some(pinned) = existing
            .slot(slot.slot_number)
            .and_then(|s| s.absolute_time.as_ref())
        {
            slot.absolute_time = Some(pinned.clone());
        }
    }
    merged
}

/// Slot numbers whose time the user pinned.
#[must_use]
pub fn pinned_slots(config: &SlotConfig) -> Vec<i64> {
    config
        .slots
        .iter()
        .filter(|s| s.absolute_time.is_some())
        .map(|s| s.slot_number)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Anchors, MealSlot, SlotMode};
    use crate::timeline::fresh_slot_config;

    fn config(meals_per_day: i64) -> SlotConfig {
        SlotConfig {
            meals_per_day,
            slots: (1..=meals_per_day).map(MealSlot::new).collect(),
        }
    }

    fn pinned(meals_per_day: i64, pins: &[(i64, &str)]) -> SlotConfig {
        let mut cfg = config(meals_per_day);
        for (slot, time) in pins {
            cfg.slot_mut(*slot).unwrap().absolute_time = Some((*time).to_string());
        }
        cfg
    }

    #[test]
    fn test_override_survives_regeneration() {
        let existing = pinned(4, &[(2, "08:30")]);
        let fresh = fresh_slot_config(6, &Anchors::default(), Some(&existing));
        let merged = merge(&fresh, &existing);
        assert_eq!(merged.meals_per_day, 6);
        assert_eq!(merged.slots.len(), 6);
        assert_eq!(merged.slot(2).unwrap().absolute_time.as_deref(), Some("08:30"));
        assert_eq!(pinned_slots(&merged), vec![2]);
    }

    #[test]
    fn test_slots_only_in_existing_are_dropped() {
        let existing = pinned(6, &[(1, "06:00"), (6, "22:15")]);
        let merged = merge(&config(3), &existing);
        assert_eq!(merged.slots.len(), 3);
        assert_eq!(merged.slot(1).unwrap().absolute_time.as_deref(), Some("06:00"));
        assert!(merged.slot(6).is_none());
    }

    #[test]
    fn test_fresh_values_kept_without_override() {
        let mut fresh = config(3);
        fresh.slot_mut(3).unwrap().mode = SlotMode::RotationLinked;
        fresh.slot_mut(3).unwrap().absolute_time = Some("21:00".to_string());
        let mut existing = config(3);
        existing.slot_mut(3).unwrap().mode = SlotMode::FixedTemplate;
        let merged = merge(&fresh, &existing);
        let slot = merged.slot(3).unwrap();
        assert_eq!(slot.mode, SlotMode::RotationLinked);
        assert_eq!(slot.absolute_time.as_deref(), Some("21:00"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = pinned(5, &[(2, "08:30"), (5, "21:45")]);
        for n in 2..=8 {
            let fresh = fresh_slot_config(n, &Anchors::default(), None);
            let once = merge(&fresh, &existing);
            assert_eq!(merge(&fresh, &once), once);
        }
    }
}
