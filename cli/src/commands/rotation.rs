use anyhow::Result;
use chrono::Local;
use tabled::{Table, Tabled, settings::Style};

use cadence_core::models::{NewRotationDay, RotationPattern};
use cadence_core::rotation::{PRESETS, epoch_ms_to_date};
use cadence_core::service::CoachService;

use super::helpers::{exit_not_found, truncate};

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    day: i64,
    #[tabled(rename = "Split")]
    split: String,
    #[tabled(rename = "Rest")]
    rest: &'static str,
    #[tabled(rename = "Today")]
    today: &'static str,
    #[tabled(rename = "ID")]
    id: String,
}

fn print_pattern(pattern: &RotationPattern) {
    let today = pattern.day_for_date(Local::now().date_naive()).map(|d| d.id.clone());
    println!(
        "Rotation {} ({} days, started {}){}",
        pattern.id,
        pattern.len(),
        epoch_ms_to_date(pattern.created_at_ms),
        if pattern.active { " [active]" } else { "" }
    );
    let rows: Vec<DayRow> = pattern
        .days
        .iter()
        .map(|d| DayRow {
            day: d.day_number,
            split: truncate(&d.display_name(), 20),
            rest: if d.is_rest_day { "yes" } else { "" },
            today: if pattern.active && today.as_deref() == Some(d.id.as_str()) {
                "<"
            } else {
                ""
            },
            id: d.id.clone(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

fn print_created(pattern: &RotationPattern, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(pattern)?);
    } else {
        print_pattern(pattern);
    }
    Ok(())
}

pub(crate) fn cmd_rotation_presets(json: bool) -> Result<()> {
    if json {
        let presets: Vec<serde_json::Value> = PRESETS
            .iter()
            .map(|p| serde_json::json!({ "key": p.key, "name": p.name, "days": p.days }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct PresetRow {
        #[tabled(rename = "Key")]
        key: &'static str,
        #[tabled(rename = "Name")]
        name: &'static str,
        #[tabled(rename = "Days")]
        days: String,
    }
    let rows: Vec<PresetRow> = PRESETS
        .iter()
        .map(|p| PresetRow {
            key: p.key,
            name: p.name,
            days: p.days.join(", "),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_rotation_preset(coach: &CoachService, key: &str, json: bool) -> Result<()> {
    let pattern = coach.create_pattern_from_preset(key)?;
    print_created(&pattern, json)
}

pub(crate) fn cmd_rotation_create(
    coach: &CoachService,
    labels: &[String],
    json: bool,
) -> Result<()> {
    let days: Vec<NewRotationDay> = labels.iter().map(|l| NewRotationDay::labelled(l)).collect();
    let pattern = coach.create_pattern(&days)?;
    print_created(&pattern, json)
}

pub(crate) fn cmd_rotation_list(coach: &CoachService, json: bool) -> Result<()> {
    let patterns = coach.list_patterns()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
    } else if patterns.is_empty() {
        eprintln!("No rotations yet. Use `cadence rotation preset <key>` to start one.");
    } else {
        #[derive(Tabled)]
        struct PatternRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Days")]
            days: String,
            #[tabled(rename = "Started")]
            started: String,
            #[tabled(rename = "Active")]
            active: &'static str,
        }
        let rows: Vec<PatternRow> = patterns
            .iter()
            .map(|p| PatternRow {
                id: p.id.clone(),
                days: truncate(
                    &p.days
                        .iter()
                        .map(cadence_core::models::RotationDay::display_name)
                        .collect::<Vec<_>>()
                        .join(" / "),
                    50,
                ),
                started: epoch_ms_to_date(p.created_at_ms).to_string(),
                active: if p.active { "yes" } else { "" },
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }
    Ok(())
}

pub(crate) fn cmd_rotation_show(coach: &CoachService, json: bool) -> Result<()> {
    let Some(pattern) = coach.active_pattern()? else {
        exit_not_found("No active rotation", json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&pattern)?);
    } else {
        print_pattern(&pattern);
    }
    Ok(())
}

pub(crate) fn cmd_rotation_activate(coach: &CoachService, id: &str, json: bool) -> Result<()> {
    if !coach.activate_pattern(id)? {
        exit_not_found(&format!("Rotation {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "activated": id }));
    } else {
        println!("Activated rotation {id}");
    }
    Ok(())
}

pub(crate) fn cmd_rotation_delete(coach: &CoachService, id: &str, json: bool) -> Result<()> {
    if !coach.delete_pattern(id)? {
        exit_not_found(&format!("Rotation {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted rotation {id} and its bindings");
    }
    Ok(())
}
