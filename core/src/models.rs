use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::timeline::{minutes_to_time_string, parse_time_or, parse_time_to_minutes};

pub const MIN_MEALS_PER_DAY: i64 = 2;
pub const MAX_MEALS_PER_DAY: i64 = 8;
pub const DEFAULT_MEALS_PER_DAY: i64 = 4;
pub const MAX_ROTATION_DAYS: usize = 10;
pub const DEFAULT_WAKE_TIME: &str = "07:00";
pub const DEFAULT_SLEEP_TIME: &str = "23:00";
pub const DEFAULT_TRAINING_DURATION: i64 = 120;
pub const MAX_TRAINING_DURATION: i64 = 600;

/// Slot number reserved for the day's single workout. Meal slots are 1-based.
pub const WORKOUT_SLOT: i64 = 0;

// --- Rotation types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPattern {
    pub id: String,
    pub owner_id: String,
    pub days: Vec<RotationDay>,
    pub created_at_ms: i64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationDay {
    pub id: String,
    pub day_number: i64,
    pub split_label: String,
    pub is_rest_day: bool,
}

impl RotationDay {
    /// Label shown next to bindings: the split label, or `Day N` when blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let label = self.split_label.trim();
        if label.is_empty() {
            format!("Day {}", self.day_number)
        } else {
            label.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRotationDay {
    pub split_label: String,
    pub is_rest_day: Option<bool>,
}

impl NewRotationDay {
    #[must_use]
    pub fn labelled(label: &str) -> Self {
        Self {
            split_label: label.to_string(),
            is_rest_day: None,
        }
    }

    /// Explicit flag wins; otherwise a day labelled "rest" is a rest day.
    #[must_use]
    pub fn resolved_rest_flag(&self) -> bool {
        self.is_rest_day
            .unwrap_or_else(|| self.split_label.trim().eq_ignore_ascii_case("rest"))
    }
}

// --- Slot types ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotMode {
    #[default]
    AiGenerated,
    FixedTemplate,
    RotationLinked,
}

pub const SLOT_MODES: &[&str] = &["ai_generated", "fixed_template", "rotation_linked"];

impl SlotMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiGenerated => "ai_generated",
            Self::FixedTemplate => "fixed_template",
            Self::RotationLinked => "rotation_linked",
        }
    }

    /// Lenient lookup used when decoding stored documents.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "ai_generated" | "ai" => Some(Self::AiGenerated),
            "fixed_template" | "fixed" => Some(Self::FixedTemplate),
            "rotation_linked" | "rotation" => Some(Self::RotationLinked),
            _ => None,
        }
    }
}

pub fn validate_slot_mode(mode: &str) -> Result<SlotMode> {
    match SlotMode::from_name(mode) {
        Some(m) => Ok(m),
        None => bail!(
            "Invalid slot mode '{mode}'. Must be one of: {}",
            SLOT_MODES.join(", ")
        ),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    pub slot_number: i64,
    #[serde(default)]
    pub mode: SlotMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<String>,
    /// User-pinned "HH:MM". Always wins over the computed placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_time: Option<String>,
}

impl MealSlot {
    #[must_use]
    pub fn new(slot_number: i64) -> Self {
        Self {
            slot_number,
            ..Self::default()
        }
    }

    /// The override in minutes, if present and well-formed.
    #[must_use]
    pub fn override_minutes(&self) -> Option<i64> {
        self.absolute_time.as_deref().and_then(parse_time_to_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub meals_per_day: i64,
    pub slots: Vec<MealSlot>,
}

impl SlotConfig {
    #[must_use]
    pub fn slot(&self, slot_number: i64) -> Option<&MealSlot> {
        self.slots.iter().find(|s| s.slot_number == slot_number)
    }

    pub fn slot_mut(&mut self, slot_number: i64) -> Option<&mut MealSlot> {
        self.slots.iter_mut().find(|s| s.slot_number == slot_number)
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            meals_per_day: DEFAULT_MEALS_PER_DAY,
            slots: (1..=DEFAULT_MEALS_PER_DAY).map(MealSlot::new).collect(),
        }
    }
}

#[must_use]
pub fn clamp_meals_per_day(meals_per_day: i64) -> i64 {
    meals_per_day.clamp(MIN_MEALS_PER_DAY, MAX_MEALS_PER_DAY)
}

pub fn validate_meals_per_day(meals_per_day: i64) -> Result<i64> {
    if !(MIN_MEALS_PER_DAY..=MAX_MEALS_PER_DAY).contains(&meals_per_day) {
        bail!("Meals per day must be between {MIN_MEALS_PER_DAY} and {MAX_MEALS_PER_DAY}");
    }
    Ok(meals_per_day)
}

pub fn validate_slot_number(slot_number: i64, meals_per_day: i64) -> Result<i64> {
    if slot_number < 1 || slot_number > meals_per_day {
        bail!("Slot {slot_number} does not exist. Meal slots are 1-{meals_per_day}");
    }
    Ok(slot_number)
}

// --- Bindings & templates ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBinding {
    pub rotation_day_id: String,
    pub rotation_day_name: String,
    pub slot_number: i64,
    pub template_id: String,
    pub template_name: String,
}

impl TemplateBinding {
    #[must_use]
    pub fn is_workout(&self) -> bool {
        self.slot_number == WORKOUT_SLOT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Meal,
    Workout,
}

impl TemplateKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Workout => "workout",
        }
    }
}

pub fn validate_template_kind(kind: &str) -> Result<TemplateKind> {
    match kind.trim().to_lowercase().as_str() {
        "meal" => Ok(TemplateKind::Meal),
        "workout" => Ok(TemplateKind::Workout),
        _ => bail!("Invalid template kind '{kind}'. Must be one of: meal, workout"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub kind: TemplateKind,
    pub name: String,
    pub created_at: String,
}

/// What a (rotation-day, slot) pair resolves to at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotAssignment {
    Assigned {
        template_id: String,
        template_name: String,
    },
    Unassigned,
}

impl SlotAssignment {
    #[must_use]
    pub fn template_name(&self) -> Option<&str> {
        match self {
            Self::Assigned { template_name, .. } => Some(template_name),
            Self::Unassigned => None,
        }
    }
}

// --- Anchors & profile ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchors {
    pub wake_time: String,
    pub sleep_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_after_slot: Option<i64>,
    pub training_duration: i64,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            wake_time: DEFAULT_WAKE_TIME.to_string(),
            sleep_time: DEFAULT_SLEEP_TIME.to_string(),
            training_time: None,
            training_after_slot: None,
            training_duration: DEFAULT_TRAINING_DURATION,
        }
    }
}

impl Anchors {
    #[must_use]
    pub fn wake_minutes(&self) -> i64 {
        parse_time_or(&self.wake_time, DEFAULT_WAKE_TIME)
    }

    #[must_use]
    pub fn sleep_minutes(&self) -> i64 {
        parse_time_or(&self.sleep_time, DEFAULT_SLEEP_TIME)
    }

    #[must_use]
    pub fn training_minutes(&self) -> Option<i64> {
        self.training_time.as_deref().and_then(parse_time_to_minutes)
    }

    /// Duration with non-positive values replaced by the default.
    #[must_use]
    pub fn effective_training_duration(&self) -> i64 {
        if self.training_duration > 0 {
            self.training_duration.min(MAX_TRAINING_DURATION)
        } else {
            DEFAULT_TRAINING_DURATION
        }
    }
}

/// Normalise a user-entered clock time to zero-padded "HH:MM".
pub fn validate_time_string(time: &str) -> Result<String> {
    match parse_time_to_minutes(time) {
        Some(m) => Ok(minutes_to_time_string(m)),
        None => bail!("Invalid time '{time}'. Use HH:MM (00:00-23:59)"),
    }
}

pub fn validate_training_duration(minutes: i64) -> Result<i64> {
    if minutes <= 0 || minutes > MAX_TRAINING_DURATION {
        bail!("Training duration must be between 1 and {MAX_TRAINING_DURATION} minutes");
    }
    Ok(minutes)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub anchors: Anchors,
    pub slot_config: SlotConfig,
}

#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct SettingsUpdate {
    pub meals_per_day: Option<i64>,
    pub wake_time: Option<String>,
    pub sleep_time: Option<String>,
    pub training_time: Option<Option<String>>,
    pub training_after_slot: Option<Option<i64>>,
    pub training_duration: Option<i64>,
}

// --- Schedule output ---

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSlot {
    pub slot_number: i64,
    pub time: String,
    pub mode: SlotMode,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<String>,
    pub template: SlotAssignment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledWorkout {
    pub start: String,
    pub end: String,
    pub duration_minutes: i64,
    pub after_slot: i64,
    pub template: SlotAssignment,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_day: Option<RotationDay>,
    pub slots: Vec<ScheduledSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout: Option<ScheduledWorkout>,
}
