use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use cadence_core::service::CoachService;

use super::helpers::{assignment_label, parse_date};

pub(crate) fn cmd_today(coach: &CoachService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let schedule = coach.schedule_for(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "Slot")]
        slot: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Mode")]
        mode: &'static str,
        #[tabled(rename = "Template")]
        template: String,
        #[tabled(rename = "Placement")]
        placement: String,
    }

    match &schedule.rotation_day {
        Some(day) if day.is_rest_day => {
            println!("{}  Day {}: {} (rest)", schedule.date, day.day_number, day.display_name());
        }
        Some(day) => println!("{}  Day {}: {}", schedule.date, day.day_number, day.display_name()),
        None => println!("{}  (no active rotation)", schedule.date),
    }

    let rows: Vec<SlotRow> = schedule
        .slots
        .iter()
        .map(|s| SlotRow {
            slot: s.slot_number,
            time: s.time.clone(),
            mode: s.mode.as_str(),
            template: assignment_label(&s.template),
            placement: if s.pinned {
                "pinned".to_string()
            } else {
                s.relative_time.clone().unwrap_or_default()
            },
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));

    if let Some(w) = &schedule.workout {
        println!(
            "Workout {}-{} ({} min, after slot {}): {}",
            w.start,
            w.end,
            w.duration_minutes,
            w.after_slot,
            assignment_label(&w.template)
        );
    }
    Ok(())
}
