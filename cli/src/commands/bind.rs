use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use cadence_core::models::TemplateBinding;
use cadence_core::service::CoachService;

use super::helpers::{parse_slot, slot_label, truncate};
use super::template::resolve_template;

fn print_bindings(day: &str, bindings: &[TemplateBinding], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(bindings)?);
        return Ok(());
    }
    if bindings.is_empty() {
        eprintln!("No bindings for {day}");
        return Ok(());
    }

    #[derive(Tabled)]
    struct BindingRow {
        #[tabled(rename = "Slot")]
        slot: String,
        #[tabled(rename = "Template")]
        template: String,
        #[tabled(rename = "Template ID")]
        template_id: String,
    }
    let rows: Vec<BindingRow> = bindings
        .iter()
        .map(|b| BindingRow {
            slot: slot_label(b.slot_number),
            template: truncate(&b.template_name, 30),
            template_id: b.template_id.clone(),
        })
        .collect();
    println!("{day}");
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_bind_set(
    coach: &CoachService,
    day: &str,
    slot: &str,
    template: &str,
    json: bool,
) -> Result<()> {
    let day = coach.resolve_day(day)?;
    let slot = parse_slot(slot)?;
    let template = resolve_template(coach, template)?;
    let bindings = coach.set_binding(&day.id, slot, &template.id)?;
    print_bindings(&day.display_name(), &bindings, json)
}

pub(crate) fn cmd_bind_remove(coach: &CoachService, day: &str, slot: &str, json: bool) -> Result<()> {
    let day = coach.resolve_day(day)?;
    let bindings = coach.remove_binding(&day.id, parse_slot(slot)?)?;
    print_bindings(&day.display_name(), &bindings, json)
}

pub(crate) fn cmd_bind_list(coach: &CoachService, day: &str, json: bool) -> Result<()> {
    let day = coach.resolve_day(day)?;
    let bindings = coach.bindings_for_day(&day.id)?;
    print_bindings(&day.display_name(), &bindings, json)
}

pub(crate) fn cmd_bind_copy(coach: &CoachService, from: &str, to: &str, json: bool) -> Result<()> {
    let source = coach.resolve_day(from)?;
    let target = coach.resolve_day(to)?;
    let bindings = coach.copy_day_bindings(&source.id, &target.id)?;
    if !json && bindings.is_empty() {
        eprintln!("{} has no bindings; nothing copied", source.display_name());
        return Ok(());
    }
    print_bindings(&target.display_name(), &bindings, json)
}
