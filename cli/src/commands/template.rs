use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use cadence_core::models::{Template, validate_template_kind};
use cadence_core::service::CoachService;

use super::helpers::{exit_not_found, truncate};

/// Find a template by id, or by name when exactly one matches (case-insensitive).
pub(crate) fn resolve_template(coach: &CoachService, reference: &str) -> Result<Template> {
    let templates = coach.list_templates(None)?;
    if let Some(t) = templates.iter().find(|t| t.id == reference) {
        return Ok(t.clone());
    }
    let mut by_name = templates
        .into_iter()
        .filter(|t| t.name.eq_ignore_ascii_case(reference.trim()));
    match (by_name.next(), by_name.next()) {
        (Some(t), None) => Ok(t),
        (Some(_), Some(_)) => bail!("More than one template is named '{reference}'. Use its ID"),
        (None, _) => bail!("No template '{reference}'. See `cadence template list`"),
    }
}

pub(crate) fn cmd_template_add(
    coach: &CoachService,
    kind: &str,
    name: &str,
    json: bool,
) -> Result<()> {
    let kind = validate_template_kind(kind)?;
    let template = coach.add_template(kind, name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
    } else {
        println!(
            "Added {} template '{}' ({})",
            template.kind.as_str(),
            template.name,
            template.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_template_list(coach: &CoachService, kind: Option<&str>, json: bool) -> Result<()> {
    let kind = kind.map(validate_template_kind).transpose()?;
    let templates = coach.list_templates(kind)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
    } else if templates.is_empty() {
        eprintln!("No templates. Use `cadence template add <meal|workout> <name>` to add one.");
    } else {
        #[derive(Tabled)]
        struct TemplateRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Kind")]
            kind: &'static str,
            #[tabled(rename = "Name")]
            name: String,
        }
        let rows: Vec<TemplateRow> = templates
            .iter()
            .map(|t| TemplateRow {
                id: t.id.clone(),
                kind: t.kind.as_str(),
                name: truncate(&t.name, 40),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }
    Ok(())
}

pub(crate) fn cmd_template_delete(coach: &CoachService, id: &str, json: bool) -> Result<()> {
    if !coach.delete_template(id)? {
        exit_not_found(&format!("Template {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted template {id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::models::TemplateKind;

    #[test]
    fn test_resolve_template_by_id_or_name() {
        let coach = CoachService::new_in_memory().unwrap();
        let oats = coach.add_template(TemplateKind::Meal, "Oats").unwrap();
        coach.add_template(TemplateKind::Meal, "Rice").unwrap();
        coach.add_template(TemplateKind::Workout, "Rice").unwrap();

        assert_eq!(resolve_template(&coach, &oats.id).unwrap(), oats);
        assert_eq!(resolve_template(&coach, "oats").unwrap(), oats);
        assert!(resolve_template(&coach, "Rice").is_err());
        assert!(resolve_template(&coach, "Toast").is_err());
    }
}
