use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use cadence_core::models::{ProfileSettings, SettingsUpdate, validate_slot_mode};
use cadence_core::service::CoachService;

use super::helpers::truncate;
use super::template::resolve_template;

fn print_settings(coach: &CoachService, profile: &ProfileSettings, json: bool) -> Result<()> {
    let times = coach.slot_times()?;

    if json {
        let value = serde_json::json!({
            "anchors": profile.anchors,
            "slot_config": profile.slot_config,
            "slot_times": times,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let a = &profile.anchors;
    println!("Wake {}  Sleep {}", a.wake_time, a.sleep_time);
    match (&a.training_time, a.training_after_slot) {
        (Some(t), Some(after)) => println!(
            "Training {t} for {} min, after slot {after}",
            a.training_duration
        ),
        (Some(t), None) => println!("Training {t} (no slot set, not applied)"),
        _ => println!("No training anchor"),
    }

    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "Slot")]
        slot: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Pinned")]
        pinned: String,
        #[tabled(rename = "Mode")]
        mode: &'static str,
        #[tabled(rename = "Template")]
        template: String,
    }
    let rows: Vec<SlotRow> = profile
        .slot_config
        .slots
        .iter()
        .map(|s| SlotRow {
            slot: s.slot_number,
            time: times.get(&s.slot_number).cloned().unwrap_or_default(),
            pinned: s.absolute_time.clone().unwrap_or_default(),
            mode: s.mode.as_str(),
            template: s
                .template_name
                .as_deref()
                .map(|n| truncate(n, 30))
                .unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_settings_show(coach: &CoachService, json: bool) -> Result<()> {
    let profile = coach.settings()?;
    print_settings(coach, &profile, json)
}

pub(crate) fn cmd_settings_set(
    coach: &CoachService,
    update: &SettingsUpdate,
    json: bool,
) -> Result<()> {
    if update.meals_per_day.is_none()
        && update.wake_time.is_none()
        && update.sleep_time.is_none()
        && update.training_time.is_none()
        && update.training_after_slot.is_none()
        && update.training_duration.is_none()
    {
        bail!(
            "Nothing to update. Provide at least one of --meals, --wake, --sleep, --training, --after-slot, --duration or --no-training"
        );
    }
    let profile = coach.save_settings(update)?;
    print_settings(coach, &profile, json)
}

pub(crate) fn cmd_settings_pin(
    coach: &CoachService,
    slot: i64,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = coach.set_slot_override(slot, time)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else if let Some(t) = config.slot(slot).and_then(|s| s.absolute_time.as_deref()) {
        println!("Slot {slot} pinned to {t}");
    } else {
        println!("Slot {slot} follows the computed timeline again");
    }
    Ok(())
}

pub(crate) fn cmd_settings_mode(
    coach: &CoachService,
    slot: i64,
    mode: &str,
    template: Option<&str>,
    json: bool,
) -> Result<()> {
    let mode = validate_slot_mode(mode)?;
    let template = template.map(|t| resolve_template(coach, t)).transpose()?;
    let config = coach.set_slot_mode(slot, mode, template.as_ref().map(|t| t.id.as_str()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        match template {
            Some(t) => println!("Slot {slot} is now {} ({})", mode.as_str(), t.name),
            None => println!("Slot {slot} is now {}", mode.as_str()),
        }
    }
    Ok(())
}
