use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;

use cadence_core::models::{SlotAssignment, WORKOUT_SLOT};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// "workout" (or "w") is the workout slot; anything else must be a meal
/// slot number starting at 1.
pub(crate) fn parse_slot(s: &str) -> Result<i64> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("workout") || s.eq_ignore_ascii_case("w") {
        return Ok(WORKOUT_SLOT);
    }
    let n: i64 = s
        .parse()
        .with_context(|| format!("Invalid slot '{s}'. Use a slot number or 'workout'"))?;
    if n < 1 {
        bail!("Meal slots start at 1. Use 'workout' for the workout slot");
    }
    Ok(n)
}

pub(crate) fn slot_label(slot_number: i64) -> String {
    if slot_number == WORKOUT_SLOT {
        "workout".to_string()
    } else {
        slot_number.to_string()
    }
}

pub(crate) fn assignment_label(assignment: &SlotAssignment) -> String {
    assignment
        .template_name()
        .map_or_else(|| "-".to_string(), |name| truncate(name, 30))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
