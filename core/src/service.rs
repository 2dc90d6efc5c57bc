use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::binder::SlotTemplateBinder;
use crate::db::Database;
use crate::merge::{merge, pinned_slots};
use crate::models::{
    DaySchedule, MAX_MEALS_PER_DAY, MAX_ROTATION_DAYS, NewRotationDay, ProfileSettings,
    RotationDay, RotationPattern, ScheduledSlot, ScheduledWorkout, SettingsUpdate,
    SlotAssignment, SlotConfig, SlotMode, Template, TemplateBinding, TemplateKind, WORKOUT_SLOT,
    validate_meals_per_day, validate_slot_number, validate_time_string,
    validate_training_duration,
};
use crate::rotation::find_preset;
use crate::timeline::{
    applied_training, fresh_slot_config, minutes_to_time_string, slot_time_strings,
    slot_times_for,
};

pub struct CoachService {
    db: Database,
    owner_id: String,
}

impl CoachService {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::from_database(Database::open(Path::new(db_path))?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    pub fn from_database(db: Database) -> Result<Self> {
        let owner_id = db.get_or_create_device_id()?;
        Ok(Self { db, owner_id })
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    // --- Settings ---

    pub fn settings(&self) -> Result<ProfileSettings> {
        self.db.load_profile()
    }

    /// Apply new anchors / meal count, regenerate the slot timeline and carry
    /// pinned times across.
    pub fn save_settings(&self, update: &SettingsUpdate) -> Result<ProfileSettings> {
        let current = self.db.load_profile()?;
        let mut anchors = current.anchors.clone();

        let meals_per_day = update
            .meals_per_day
            .map(validate_meals_per_day)
            .transpose()?
            .unwrap_or(current.slot_config.meals_per_day);
        if let Some(wake) = &update.wake_time {
            anchors.wake_time = validate_time_string(wake)?;
        }
        if let Some(sleep) = &update.sleep_time {
            anchors.sleep_time = validate_time_string(sleep)?;
        }
        if let Some(training) = &update.training_time {
            anchors.training_time = training
                .as_deref()
                .map(validate_time_string)
                .transpose()?;
        }
        if let Some(after_slot) = update.training_after_slot {
            // A stored after-slot left out of range by a meal count change is
            // kept; the timeline ignores it until the user sets a new one.
            if let Some(after_slot) = after_slot {
                if !(0..=meals_per_day).contains(&after_slot) {
                    bail!("Training can only follow slot 0-{meals_per_day} (got {after_slot})");
                }
            }
            anchors.training_after_slot = after_slot;
        }
        if let Some(duration) = update.training_duration {
            anchors.training_duration = validate_training_duration(duration)?;
        }

        let fresh = fresh_slot_config(meals_per_day, &anchors, Some(&current.slot_config));
        let slot_config = merge(&fresh, &current.slot_config);
        let profile = ProfileSettings {
            anchors,
            slot_config,
        };
        self.db.save_profile(&profile)?;
        debug!(
            meals_per_day,
            pinned = ?pinned_slots(&profile.slot_config),
            training_applied = applied_training(meals_per_day, &profile.anchors).is_some(),
            "settings saved, timeline regenerated"
        );
        Ok(profile)
    }

    /// Pin (`Some`) or unpin (`None`) a slot's clock time.
    pub fn set_slot_override(&self, slot_number: i64, time: Option<&str>) -> Result<SlotConfig> {
        let mut profile = self.db.load_profile()?;
        validate_slot_number(slot_number, profile.slot_config.meals_per_day)?;
        let time = time.map(validate_time_string).transpose()?;
        if let Some(slot) = profile.slot_config.slot_mut(slot_number) {
            slot.absolute_time = time;
        }
        self.db.save_profile(&profile)?;
        Ok(profile.slot_config)
    }

    pub fn set_slot_mode(
        &self,
        slot_number: i64,
        mode: SlotMode,
        template_id: Option<&str>,
    ) -> Result<SlotConfig> {
        let mut profile = self.db.load_profile()?;
        validate_slot_number(slot_number, profile.slot_config.meals_per_day)?;

        let template = match (mode, template_id) {
            (SlotMode::FixedTemplate, Some(id)) => {
                Some(self.require_template(id, TemplateKind::Meal)?)
            }
            (SlotMode::FixedTemplate, None) => bail!("A fixed-template slot needs a template"),
            (_, Some(_)) => bail!("Only fixed-template slots take a template"),
            (_, None) => None,
        };
        if let Some(slot) = profile.slot_config.slot_mut(slot_number) {
            slot.mode = mode;
            slot.template_id = template.as_ref().map(|t| t.id.clone());
            slot.template_name = template.map(|t| t.name);
        }
        self.db.save_profile(&profile)?;
        Ok(profile.slot_config)
    }

    /// "HH:MM" for each slot under the current settings.
    pub fn slot_times(&self) -> Result<BTreeMap<i64, String>> {
        let profile = self.db.load_profile()?;
        Ok(slot_time_strings(&profile.slot_config, &profile.anchors))
    }

    // --- Rotation patterns ---

    /// Store a new pattern built from `days` and make it the active one.
    pub fn create_pattern(&self, days: &[NewRotationDay]) -> Result<RotationPattern> {
        if days.is_empty() {
            bail!("A rotation needs at least one day");
        }
        if days.len() > MAX_ROTATION_DAYS {
            bail!("A rotation can have at most {MAX_ROTATION_DAYS} days (got {})", days.len());
        }
        let pattern = RotationPattern {
            id: Uuid::new_v4().to_string(),
            owner_id: self.owner_id.clone(),
            days: (1..)
                .zip(days)
                .map(|(day_number, d)| RotationDay {
                    id: Uuid::new_v4().to_string(),
                    day_number,
                    split_label: d.split_label.trim().to_string(),
                    is_rest_day: d.resolved_rest_flag(),
                })
                .collect(),
            created_at_ms: Utc::now().timestamp_millis(),
            active: true,
        };
        self.db.insert_pattern(&pattern)?;
        Ok(pattern)
    }

    pub fn create_pattern_from_preset(&self, key: &str) -> Result<RotationPattern> {
        let Some(preset) = find_preset(key) else {
            bail!("Unknown preset '{key}'");
        };
        self.create_pattern(&preset.new_days())
    }

    pub fn list_patterns(&self) -> Result<Vec<RotationPattern>> {
        self.db.list_patterns(&self.owner_id)
    }

    pub fn active_pattern(&self) -> Result<Option<RotationPattern>> {
        self.db.active_pattern(&self.owner_id)
    }

    pub fn activate_pattern(&self, id: &str) -> Result<bool> {
        self.db.activate_pattern(&self.owner_id, id)
    }

    /// Delete a pattern together with the bindings of its days.
    pub fn delete_pattern(&self, id: &str) -> Result<bool> {
        let Some(pattern) = self.db.get_pattern(id)? else {
            return Ok(false);
        };
        let binder = pattern
            .days
            .iter()
            .fold(self.binder()?, |b, day| b.remove_day(&day.id));
        self.db.delete_pattern(id, binder.bindings())
    }

    /// The rotation day governing `date`, if a rotation is active.
    pub fn rotation_day_for(&self, date: NaiveDate) -> Result<Option<RotationDay>> {
        Ok(self
            .active_pattern()?
            .and_then(|p| p.day_for_date(date).cloned()))
    }

    /// Today's local date with the rotation day it falls on.
    pub fn today(&self) -> Result<(NaiveDate, Option<RotationDay>)> {
        let date = Local::now().date_naive();
        Ok((date, self.rotation_day_for(date)?))
    }

    /// Look a day of the active rotation up by id or by 1-based day number.
    pub fn resolve_day(&self, reference: &str) -> Result<RotationDay> {
        let pattern = self
            .active_pattern()?
            .context("No active rotation. Create one first")?;
        let reference = reference.trim();
        let by_number = reference
            .parse::<i64>()
            .ok()
            .and_then(|n| pattern.days.iter().find(|d| d.day_number == n));
        by_number
            .or_else(|| pattern.find_day(reference))
            .cloned()
            .with_context(|| format!("No day '{reference}' in the active rotation"))
    }

    // --- Schedule ---

    pub fn schedule_for(&self, date: NaiveDate) -> Result<DaySchedule> {
        let profile = self.db.load_profile()?;
        let rotation_day = self.rotation_day_for(date)?;
        let binder = self.binder()?;
        let catalogue: HashMap<String, String> = self
            .db
            .list_templates(None)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        let current_name = |id: &str| catalogue.get(id).cloned();
        let bound = |slot_number: i64| match &rotation_day {
            Some(day) => binder.resolve(&day.id, slot_number, current_name),
            None => SlotAssignment::Unassigned,
        };

        let config = &profile.slot_config;
        let slots = slot_times_for(config, &profile.anchors)
            .into_iter()
            .map(|(slot_number, minutes)| {
                let slot = config.slot(slot_number);
                let mode = slot.map(|s| s.mode).unwrap_or_default();
                let template = match mode {
                    SlotMode::AiGenerated => SlotAssignment::Unassigned,
                    SlotMode::FixedTemplate => slot
                        .and_then(|s| s.template_id.as_deref())
                        .and_then(|id| {
                            current_name(id).map(|template_name| SlotAssignment::Assigned {
                                template_id: id.to_string(),
                                template_name,
                            })
                        })
                        .unwrap_or(SlotAssignment::Unassigned),
                    SlotMode::RotationLinked => bound(slot_number),
                };
                ScheduledSlot {
                    slot_number,
                    time: minutes_to_time_string(minutes),
                    mode,
                    pinned: slot.and_then(|s| s.override_minutes()).is_some(),
                    relative_time: slot.and_then(|s| s.relative_time.clone()),
                    template,
                }
            })
            .collect();

        let rest_day = rotation_day.as_ref().is_some_and(|d| d.is_rest_day);
        let workout = applied_training(config.meals_per_day, &profile.anchors)
            .filter(|_| !rest_day)
            .map(|(start, end, training)| ScheduledWorkout {
                start: minutes_to_time_string(start),
                end: minutes_to_time_string(end),
                duration_minutes: training.duration,
                after_slot: training.after_slot,
                template: bound(WORKOUT_SLOT),
            });

        Ok(DaySchedule {
            date: date.format("%Y-%m-%d").to_string(),
            rotation_day,
            slots,
            workout,
        })
    }

    // --- Templates ---

    pub fn add_template(&self, kind: TemplateKind, name: &str) -> Result<Template> {
        if name.trim().is_empty() {
            bail!("Template name must not be empty");
        }
        self.db.insert_template(kind, name)
    }

    pub fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>> {
        self.db.list_templates(kind)
    }

    pub fn delete_template(&self, id: &str) -> Result<bool> {
        self.db.delete_template(id)
    }

    fn require_template(&self, id: &str, kind: TemplateKind) -> Result<Template> {
        let template = self
            .db
            .get_template(id)?
            .with_context(|| format!("Template '{id}' not found"))?;
        if template.kind != kind {
            bail!(
                "Template '{}' is a {} template, expected {}",
                template.name,
                template.kind.as_str(),
                kind.as_str()
            );
        }
        Ok(template)
    }

    // --- Bindings ---

    fn binder(&self) -> Result<SlotTemplateBinder> {
        Ok(SlotTemplateBinder::new(self.db.load_bindings()?))
    }

    fn commit(&self, binder: &SlotTemplateBinder) -> Result<()> {
        self.db.save_bindings(binder.bindings())
    }

    /// Bind a template to a slot of a rotation day. `WORKOUT_SLOT` takes a
    /// workout template; meal slots take meal templates.
    pub fn set_binding(
        &self,
        day_reference: &str,
        slot_number: i64,
        template_id: &str,
    ) -> Result<Vec<TemplateBinding>> {
        let day = self.resolve_day(day_reference)?;
        let kind = if slot_number == WORKOUT_SLOT {
            TemplateKind::Workout
        } else {
            validate_slot_number(slot_number, MAX_MEALS_PER_DAY)?;
            TemplateKind::Meal
        };
        let template = self.require_template(template_id, kind)?;
        let binder = self.binder()?.set_mapping(
            &day.id,
            &day.display_name(),
            slot_number,
            &template.id,
            &template.name,
        );
        self.commit(&binder)?;
        Ok(binder.mappings_for(&day.id).into_iter().cloned().collect())
    }

    pub fn remove_binding(&self, day_reference: &str, slot_number: i64) -> Result<Vec<TemplateBinding>> {
        let day = self.resolve_day(day_reference)?;
        let before = self.binder()?;
        let binder = before.remove_mapping(&day.id, slot_number);
        if binder != before {
            self.commit(&binder)?;
        }
        Ok(binder.mappings_for(&day.id).into_iter().cloned().collect())
    }

    pub fn bindings_for_day(&self, day_reference: &str) -> Result<Vec<TemplateBinding>> {
        let day = self.resolve_day(day_reference)?;
        Ok(self
            .binder()?
            .mappings_for(&day.id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Overwrite `target`'s bindings with `source`'s. Returns the target's
    /// bindings afterwards.
    pub fn copy_day_bindings(&self, source: &str, target: &str) -> Result<Vec<TemplateBinding>> {
        let source = self.resolve_day(source)?;
        let target = self.resolve_day(target)?;
        let before = self.binder()?;
        let binder = before.copy_day(&source.id, &target.id, &target.display_name());
        if binder != before {
            self.commit(&binder)?;
            debug!(source = %source.id, target = %target.id, "bindings copied");
        }
        Ok(binder.mappings_for(&target.id).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::epoch_ms_to_date;

    fn svc_with_rotation(labels: &[&str]) -> CoachService {
        let svc = CoachService::new_in_memory().unwrap();
        let days: Vec<NewRotationDay> = labels.iter().map(|l| NewRotationDay::labelled(l)).collect();
        svc.create_pattern(&days).unwrap();
        svc
    }

    fn training_update() -> SettingsUpdate {
        SettingsUpdate {
            meals_per_day: Some(5),
            wake_time: Some("07:00".to_string()),
            sleep_time: Some("23:00".to_string()),
            training_time: Some(Some("18:00".to_string())),
            training_after_slot: Some(Some(3)),
            training_duration: Some(90),
        }
    }

    #[test]
    fn test_save_settings_regenerates_slots() {
        let svc = CoachService::new_in_memory().unwrap();
        let profile = svc.save_settings(&training_update()).unwrap();
        assert_eq!(profile.slot_config.meals_per_day, 5);
        assert_eq!(profile.slot_config.slots.len(), 5);

        let times = svc.slot_times().unwrap();
        assert_eq!(times[&3], "17:00");
        assert_eq!(times[&4], "20:00");
    }

    #[test]
    fn test_pinned_time_survives_settings_change() {
        let svc = CoachService::new_in_memory().unwrap();
        svc.save_settings(&training_update()).unwrap();
        svc.set_slot_override(2, Some("8:30")).unwrap();

        let update = SettingsUpdate {
            meals_per_day: Some(6),
            wake_time: Some("06:00".to_string()),
            ..SettingsUpdate::default()
        };
        let profile = svc.save_settings(&update).unwrap();
        assert_eq!(
            profile.slot_config.slot(2).unwrap().absolute_time.as_deref(),
            Some("08:30")
        );
        assert_eq!(svc.slot_times().unwrap()[&2], "08:30");

        svc.set_slot_override(2, None).unwrap();
        assert!(svc.settings().unwrap().slot_config.slot(2).unwrap().absolute_time.is_none());
    }

    #[test]
    fn test_save_settings_rejects_bad_input() {
        let svc = CoachService::new_in_memory().unwrap();
        let bad_time = SettingsUpdate {
            wake_time: Some("7am".to_string()),
            ..SettingsUpdate::default()
        };
        assert!(svc.save_settings(&bad_time).is_err());
        let bad_slot = SettingsUpdate {
            meals_per_day: Some(4),
            training_after_slot: Some(Some(5)),
            ..SettingsUpdate::default()
        };
        assert!(svc.save_settings(&bad_slot).is_err());
        assert!(svc.set_slot_override(9, Some("10:00")).is_err());
        // Nothing was written.
        assert_eq!(svc.settings().unwrap(), ProfileSettings::default());
    }

    #[test]
    fn test_fewer_meals_keeps_stale_after_slot() {
        let svc = CoachService::new_in_memory().unwrap();
        let update = SettingsUpdate {
            meals_per_day: Some(6),
            training_time: Some(Some("18:00".to_string())),
            training_after_slot: Some(Some(5)),
            ..SettingsUpdate::default()
        };
        svc.save_settings(&update).unwrap();

        let fewer = SettingsUpdate {
            meals_per_day: Some(4),
            ..SettingsUpdate::default()
        };
        let profile = svc.save_settings(&fewer).unwrap();
        assert_eq!(profile.slot_config.meals_per_day, 4);
        assert_eq!(profile.anchors.training_after_slot, Some(5));

        let schedule = svc.schedule_for(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()).unwrap();
        assert!(schedule.workout.is_none());
        assert_eq!(schedule.slots.len(), 4);
        assert!(profile.slot_config.slots.iter().all(|s| {
            s.relative_time.as_deref() != Some("pre-training")
        }));
    }

    #[test]
    fn test_today_reports_local_date() {
        let svc = svc_with_rotation(&["Push", "Pull", "Legs"]);
        let (date, day) = svc.today().unwrap();
        assert_eq!(date, Local::now().date_naive());
        assert!(day.is_some());

        let empty = CoachService::new_in_memory().unwrap();
        assert!(empty.today().unwrap().1.is_none());
    }

    #[test]
    fn test_training_after_last_meal_has_no_workout_entry() {
        let svc = CoachService::new_in_memory().unwrap();
        let update = SettingsUpdate {
            meals_per_day: Some(4),
            training_time: Some(Some("19:00".to_string())),
            training_after_slot: Some(Some(4)),
            ..SettingsUpdate::default()
        };
        svc.save_settings(&update).unwrap();
        let schedule = svc.schedule_for(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()).unwrap();
        assert!(schedule.workout.is_none());
        assert_eq!(schedule.slots.len(), 4);
    }

    #[test]
    fn test_create_pattern_activates_and_validates() {
        let svc = svc_with_rotation(&["push", "pull"]);
        let second = svc.create_pattern_from_preset("ppl").unwrap();
        assert_eq!(second.days.len(), 7);
        assert!(second.days[6].is_rest_day);
        assert_eq!(svc.active_pattern().unwrap().unwrap().id, second.id);
        assert_eq!(svc.list_patterns().unwrap().len(), 2);

        assert!(svc.create_pattern(&[]).is_err());
        let eleven: Vec<NewRotationDay> = (0..11).map(|_| NewRotationDay::labelled("legs")).collect();
        assert!(svc.create_pattern(&eleven).is_err());
        assert!(svc.create_pattern_from_preset("nope").is_err());
    }

    #[test]
    fn test_rotation_day_cycles_by_date() {
        let svc = svc_with_rotation(&["a", "b", "c"]);
        let pattern = svc.active_pattern().unwrap().unwrap();
        let created = epoch_ms_to_date(pattern.created_at_ms);
        let label = |offset: i64| {
            svc.rotation_day_for(created + chrono::Duration::days(offset))
                .unwrap()
                .unwrap()
                .split_label
        };
        assert_eq!(label(0), "a");
        assert_eq!(label(1), "b");
        assert_eq!(label(3), "a");
        assert_eq!(label(-1), "c");
    }

    #[test]
    fn test_resolve_day_by_number_or_id() {
        let svc = svc_with_rotation(&["chest", "back"]);
        let back = svc.resolve_day("2").unwrap();
        assert_eq!(back.split_label, "back");
        assert_eq!(svc.resolve_day(&back.id).unwrap(), back);
        assert!(svc.resolve_day("3").is_err());

        let empty = CoachService::new_in_memory().unwrap();
        assert!(empty.resolve_day("1").is_err());
    }

    #[test]
    fn test_bindings_copy_and_remove() {
        let svc = svc_with_rotation(&["chest", "back"]);
        let oats = svc.add_template(TemplateKind::Meal, "Oats").unwrap();
        let rice = svc.add_template(TemplateKind::Meal, "Rice bowl").unwrap();
        let shake = svc.add_template(TemplateKind::Meal, "Shake").unwrap();
        let bench = svc.add_template(TemplateKind::Workout, "Bench").unwrap();

        svc.set_binding("1", 1, &oats.id).unwrap();
        svc.set_binding("1", 2, &rice.id).unwrap();
        svc.set_binding("1", WORKOUT_SLOT, &bench.id).unwrap();
        svc.set_binding("2", 1, &shake.id).unwrap();
        svc.set_binding("2", 3, &shake.id).unwrap();

        let back = svc.copy_day_bindings("1", "2").unwrap();
        assert_eq!(back.len(), 3);
        assert!(back.iter().all(|b| b.rotation_day_name == "back"));
        assert_eq!(svc.bindings_for_day("1").unwrap().len(), 3);

        let after = svc.remove_binding("2", 2).unwrap();
        assert_eq!(after.len(), 2);
        // Removing again is a no-op.
        assert_eq!(svc.remove_binding("2", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_binding_template_kind_checked() {
        let svc = svc_with_rotation(&["legs"]);
        let oats = svc.add_template(TemplateKind::Meal, "Oats").unwrap();
        let squat = svc.add_template(TemplateKind::Workout, "Squat").unwrap();
        assert!(svc.set_binding("1", WORKOUT_SLOT, &oats.id).is_err());
        assert!(svc.set_binding("1", 1, &squat.id).is_err());
        assert!(svc.set_binding("1", 1, "missing").is_err());
        assert!(svc.set_binding("1", 9, &oats.id).is_err());
    }

    #[test]
    fn test_schedule_resolves_templates() {
        let svc = svc_with_rotation(&["legs"]);
        svc.save_settings(&training_update()).unwrap();
        let oats = svc.add_template(TemplateKind::Meal, "Oats").unwrap();
        let rice = svc.add_template(TemplateKind::Meal, "Rice").unwrap();
        let squat = svc.add_template(TemplateKind::Workout, "Squat").unwrap();

        svc.set_slot_mode(1, SlotMode::FixedTemplate, Some(&oats.id)).unwrap();
        svc.set_slot_mode(4, SlotMode::RotationLinked, None).unwrap();
        svc.set_binding("1", 4, &rice.id).unwrap();
        svc.set_binding("1", WORKOUT_SLOT, &squat.id).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let schedule = svc.schedule_for(date).unwrap();
        assert_eq!(schedule.date, "2025-05-20");
        assert_eq!(schedule.rotation_day.as_ref().unwrap().split_label, "legs");
        assert_eq!(schedule.slots[0].template.template_name(), Some("Oats"));
        assert_eq!(schedule.slots[3].template.template_name(), Some("Rice"));
        assert_eq!(schedule.slots[1].template, SlotAssignment::Unassigned);
        let workout = schedule.workout.unwrap();
        assert_eq!(workout.start, "18:00");
        assert_eq!(workout.end, "19:30");
        assert_eq!(workout.template.template_name(), Some("Squat"));

        // Deleted template resolves to unassigned rather than failing.
        svc.delete_template(&rice.id).unwrap();
        let schedule = svc.schedule_for(date).unwrap();
        assert_eq!(schedule.slots[3].template, SlotAssignment::Unassigned);
    }

    #[test]
    fn test_rest_day_has_no_workout() {
        let svc = svc_with_rotation(&["rest"]);
        svc.save_settings(&training_update()).unwrap();
        let schedule = svc.schedule_for(NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()).unwrap();
        assert!(schedule.workout.is_none());
        assert_eq!(schedule.slots.len(), 5);
    }

    #[test]
    fn test_schedule_without_rotation() {
        let svc = CoachService::new_in_memory().unwrap();
        let schedule = svc.schedule_for(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap();
        assert!(schedule.rotation_day.is_none());
        assert_eq!(schedule.slots.len(), 4);
        assert!(schedule.slots.iter().all(|s| s.template == SlotAssignment::Unassigned));
    }

    #[test]
    fn test_set_slot_mode_rules() {
        let svc = CoachService::new_in_memory().unwrap();
        let squat = svc.add_template(TemplateKind::Workout, "Squat").unwrap();
        assert!(svc.set_slot_mode(1, SlotMode::FixedTemplate, None).is_err());
        assert!(svc.set_slot_mode(1, SlotMode::FixedTemplate, Some(&squat.id)).is_err());
        assert!(svc.set_slot_mode(1, SlotMode::AiGenerated, Some(&squat.id)).is_err());
        let cfg = svc.set_slot_mode(2, SlotMode::RotationLinked, None).unwrap();
        assert_eq!(cfg.slot(2).unwrap().mode, SlotMode::RotationLinked);
    }

    #[test]
    fn test_delete_pattern_drops_its_bindings() {
        let svc = svc_with_rotation(&["a"]);
        let first = svc.active_pattern().unwrap().unwrap();
        let oats = svc.add_template(TemplateKind::Meal, "Oats").unwrap();
        svc.set_binding("1", 1, &oats.id).unwrap();

        let second = svc.create_pattern(&[NewRotationDay::labelled("b")]).unwrap();
        svc.set_binding("1", 2, &oats.id).unwrap();

        assert!(svc.delete_pattern(&first.id).unwrap());
        assert!(!svc.delete_pattern(&first.id).unwrap());
        let remaining = svc.db.load_bindings().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].rotation_day_id, second.days[0].id);
    }
}
